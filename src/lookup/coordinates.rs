use tracing::{debug, info, warn};

use crate::record::{AddressedRecord, Coordinates, GeoRecord};

use super::{Geocoder, Lookup, Pacer};

/// Attaches coordinates to each addressed record via geocoding.
pub struct CoordinateResolver<'a, G: Geocoder + ?Sized> {
    client: &'a G,
    pacer: Pacer,
}

impl<'a, G: Geocoder + ?Sized> CoordinateResolver<'a, G> {
    pub fn new(client: &'a G, pacer: Pacer) -> Self {
        Self { client, pacer }
    }

    /// First match's location. No request is made for a missing address.
    pub async fn resolve(&self, address: Option<&str>) -> Lookup<Coordinates> {
        let Some(address) = address.filter(|a| !a.trim().is_empty()) else {
            debug!("No address, skipping geocode");
            return Lookup::Absent;
        };

        match self.pacer.call(|| self.client.geocode(address)).await {
            Ok(results) => results
                .into_iter()
                .next()
                .map(|result| Coordinates {
                    latitude: result.geometry.location.lat,
                    longitude: result.geometry.location.lng,
                })
                .into(),
            Err(e) => {
                warn!("  ✗ Error fetching coordinates for {}: {}", address, e);
                Lookup::Absent
            }
        }
    }

    /// Resolve every record in order; output index `i` belongs to input index `i`.
    pub async fn resolve_all(&self, records: Vec<AddressedRecord>) -> Vec<GeoRecord> {
        let total = records.len();
        let mut resolved = Vec::with_capacity(total);

        for (i, record) in records.into_iter().enumerate() {
            info!(
                "  [{}/{}] Fetching coordinates for: {}",
                i + 1,
                total,
                record.record.name
            );
            let coordinates = self.resolve(record.address.as_deref()).await.into_option();
            resolved.push(GeoRecord::new(record, coordinates));
        }

        let found = resolved.iter().filter(|r| r.coordinates.is_some()).count();
        info!("✓ Fetched {}/{} coordinates successfully", found, total);
        resolved
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::LookupError;
    use crate::lookup::{GeocodeResult, Geometry, LatLng};
    use crate::record::NormalizedRecord;

    struct CountingGeocoder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match address {
                "205 E Houston St" => Ok(vec![GeocodeResult {
                    geometry: Geometry {
                        location: LatLng {
                            lat: 40.7223,
                            lng: -73.9874,
                        },
                    },
                }]),
                "nowhere" => Ok(Vec::new()),
                _ => Err(LookupError::Service {
                    status: "OVER_QUERY_LIMIT".into(),
                    message: "You have exceeded your daily request quota".into(),
                }),
            }
        }
    }

    fn geocoder() -> CountingGeocoder {
        CountingGeocoder {
            calls: AtomicUsize::new(0),
        }
    }

    fn pacer() -> Pacer {
        Pacer::new(Duration::ZERO, 0, Duration::ZERO)
    }

    fn addressed(name: &str, address: Option<&str>) -> AddressedRecord {
        AddressedRecord {
            record: NormalizedRecord {
                name: name.into(),
                category: "Deli".into(),
                area: "Lower East Side, New York, NY".into(),
            },
            address: address.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_absent_address_makes_no_call() {
        let geo = geocoder();
        let resolver = CoordinateResolver::new(&geo, pacer());

        assert_eq!(resolver.resolve(None).await, Lookup::Absent);
        assert_eq!(resolver.resolve(Some("  ")).await, Lookup::Absent);
        assert_eq!(geo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_first_location_is_used() {
        let geo = geocoder();
        let resolver = CoordinateResolver::new(&geo, pacer());

        let found = resolver.resolve(Some("205 E Houston St")).await;

        assert_eq!(
            found,
            Lookup::Found(Coordinates {
                latitude: 40.7223,
                longitude: -73.9874
            })
        );
    }

    #[tokio::test]
    async fn test_resolve_all_keeps_pairing_and_order() {
        let geo = geocoder();
        let resolver = CoordinateResolver::new(&geo, pacer());
        let input = vec![
            addressed("Katz's", Some("205 E Houston St")),
            addressed("Joe's Diner", None),
            addressed("Lost", Some("nowhere")),
            addressed("Quota", Some("1 Main St")),
        ];

        let out = resolver.resolve_all(input).await;

        let names: Vec<&str> = out.iter().map(|r| r.record.name.as_str()).collect();
        assert_eq!(names, vec!["Katz's", "Joe's Diner", "Lost", "Quota"]);
        assert!(out[0].coordinates.is_some());
        assert!(out[1..].iter().all(|r| r.coordinates.is_none()));
        assert_eq!(out[2].address.as_deref(), Some("nowhere"));
        assert_eq!(geo.calls.load(Ordering::SeqCst), 3);
    }
}
