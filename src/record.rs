//! Record shapes flowing between stages.
//!
//! Field names on disk follow the column headers of the stage artifacts, so the
//! same serde renames serve both the CSV files and the final JSON dataset.

use serde::{Deserialize, Deserializer, Serialize};

/// Stand-in written for an area that is missing altogether (not merely empty).
pub const MISSING_AREA: &str = "unknown";

/// A listing as harvested from the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(rename = "Restaurant")]
    pub name: String,
    #[serde(rename = "Cuisine", default)]
    pub category: String,
    /// `None` only when the reviewed artifact dropped the cell entirely; an
    /// empty cell stays `Some("")`.
    #[serde(rename = "Neighborhood", default, deserialize_with = "present_string")]
    pub area: Option<String>,
}

fn present_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Some)
}

impl ListingRecord {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        area: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            area: Some(area.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    #[serde(rename = "Restaurant")]
    pub name: String,
    #[serde(rename = "Cuisine", default)]
    pub category: String,
    #[serde(rename = "Neighborhood", default)]
    pub area: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressedRecord {
    pub record: NormalizedRecord,
    pub address: Option<String>,
}

impl AddressedRecord {
    pub fn into_row(self) -> AddressedRow {
        AddressedRow {
            name: self.record.name,
            category: self.record.category,
            area: self.record.area,
            address: self.address,
        }
    }
}

/// Flat on-disk form of an [`AddressedRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressedRow {
    #[serde(rename = "Restaurant")]
    pub name: String,
    #[serde(rename = "Cuisine", default)]
    pub category: String,
    #[serde(rename = "Neighborhood", default)]
    pub area: String,
    #[serde(rename = "Address", default)]
    pub address: Option<String>,
}

impl AddressedRow {
    pub fn into_record(self) -> AddressedRecord {
        AddressedRecord {
            record: NormalizedRecord {
                name: self.name,
                category: self.category,
                area: self.area,
            },
            address: self.address,
        }
    }
}

/// A latitude/longitude pair. Held as one value so the two halves can never
/// be present independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoRecord {
    pub record: NormalizedRecord,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl GeoRecord {
    pub fn new(addressed: AddressedRecord, coordinates: Option<Coordinates>) -> Self {
        Self {
            record: addressed.record,
            address: addressed.address,
            coordinates,
        }
    }

    pub fn into_row(self) -> GeoRow {
        GeoRow {
            name: self.record.name,
            category: self.record.category,
            area: self.record.area,
            address: self.address,
            latitude: self.coordinates.map(|c| c.latitude),
            longitude: self.coordinates.map(|c| c.longitude),
        }
    }
}

/// Flat on-disk form of a [`GeoRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRow {
    #[serde(rename = "Restaurant")]
    pub name: String,
    #[serde(rename = "Cuisine", default)]
    pub category: String,
    #[serde(rename = "Neighborhood", default)]
    pub area: String,
    #[serde(rename = "Address", default)]
    pub address: Option<String>,
    #[serde(rename = "Latitude", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude", default)]
    pub longitude: Option<f64>,
}

impl GeoRow {
    /// A row with only one coordinate (hand-edited artifact) counts as having none.
    pub fn into_record(self) -> GeoRecord {
        let coordinates = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };
        GeoRecord {
            record: NormalizedRecord {
                name: self.name,
                category: self.category,
                area: self.area,
            },
            address: self.address,
            coordinates,
        }
    }
}

/// A record that made it into the final dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalRecord {
    #[serde(rename = "Restaurant")]
    pub name: String,
    #[serde(rename = "Cuisine")]
    pub category: String,
    #[serde(rename = "Neighborhood")]
    pub area: String,
    #[serde(rename = "Address")]
    pub address: Option<String>,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
}

impl FinalRecord {
    /// `None` unless both coordinates are present.
    pub fn from_geo(geo: GeoRecord) -> Option<Self> {
        let coordinates = geo.coordinates?;
        Some(Self {
            name: geo.record.name,
            category: geo.record.category,
            area: geo.record.area,
            address: geo.address,
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
        })
    }
}
