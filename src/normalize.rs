//! Locality suffix for the area field.

use tracing::info;

use crate::record::{ListingRecord, NormalizedRecord, MISSING_AREA};

/// Append `", <locality>"` to every record's area. Not idempotent: the type
/// change from [`ListingRecord`] to [`NormalizedRecord`] is what keeps it to
/// one application per record.
pub fn normalize(records: Vec<ListingRecord>, locality: &str) -> Vec<NormalizedRecord> {
    let normalized: Vec<NormalizedRecord> = records
        .into_iter()
        .map(|record| normalize_one(record, locality))
        .collect();
    info!("Appended ', {}' to {} areas", locality, normalized.len());
    normalized
}

pub fn normalize_one(record: ListingRecord, locality: &str) -> NormalizedRecord {
    let area = record.area.as_deref().unwrap_or(MISSING_AREA);
    NormalizedRecord {
        area: format!("{}, {}", area, locality),
        name: record.name,
        category: record.category,
    }
}
