use tracing::{info, warn};

use crate::record::{AddressedRecord, NormalizedRecord};

use super::{Lookup, Pacer, PlaceSearch};

/// Attaches a formatted address to each record via free-text place search.
pub struct AddressResolver<'a, P: PlaceSearch + ?Sized> {
    client: &'a P,
    pacer: Pacer,
}

impl<'a, P: PlaceSearch + ?Sized> AddressResolver<'a, P> {
    pub fn new(client: &'a P, pacer: Pacer) -> Self {
        Self { client, pacer }
    }

    /// First match's formatted address for `"<name>, <area>"`.
    pub async fn resolve(&self, name: &str, area: &str) -> Lookup<String> {
        let query = format!("{}, {}", name, area);
        match self.pacer.call(|| self.client.search_text(&query)).await {
            Ok(results) => results
                .into_iter()
                .next()
                .and_then(|place| place.formatted_address)
                .filter(|address| !address.trim().is_empty())
                .into(),
            Err(e) => {
                warn!("  ✗ Error fetching address for {}: {}", name, e);
                Lookup::Absent
            }
        }
    }

    /// Resolve every record in order; output index `i` belongs to input index `i`.
    pub async fn resolve_all(&self, records: Vec<NormalizedRecord>) -> Vec<AddressedRecord> {
        let total = records.len();
        let mut resolved = Vec::with_capacity(total);

        for (i, record) in records.into_iter().enumerate() {
            info!("  [{}/{}] Fetching address for: {}", i + 1, total, record.name);
            let address = self.resolve(&record.name, &record.area).await.into_option();
            resolved.push(AddressedRecord { record, address });
        }

        let found = resolved.iter().filter(|r| r.address.is_some()).count();
        info!("✓ Fetched {}/{} addresses successfully", found, total);
        resolved
    }
}
