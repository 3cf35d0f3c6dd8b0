//! Final dataset for the map front end.

use std::path::Path;

use tracing::info;

use crate::artifact;
use crate::error::PipelineError;
use crate::record::{FinalRecord, GeoRecord, NormalizedRecord};

/// Keep the records with both coordinates, in their original order.
pub fn complete_records(records: Vec<GeoRecord>) -> Vec<FinalRecord> {
    records.into_iter().filter_map(FinalRecord::from_geo).collect()
}

/// Filter and write the geocoded dataset. Returns the number written.
pub fn finalize(records: Vec<GeoRecord>, path: &Path) -> Result<usize, PipelineError> {
    let total = records.len();
    let complete = complete_records(records);
    info!(
        "Dropped {} records without coordinates",
        total - complete.len()
    );
    artifact::write_json(path, &complete)?;
    info!("✓ Converted {} records to JSON", complete.len());
    Ok(complete.len())
}

/// Dataset for a run without lookups: every normalized record, unfiltered,
/// with no address or coordinate fields.
pub fn finalize_unenriched(
    records: Vec<NormalizedRecord>,
    path: &Path,
) -> Result<usize, PipelineError> {
    artifact::write_json(path, &records)?;
    info!("✓ Converted {} records to JSON (no coordinates)", records.len());
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Coordinates;

    fn geo(name: &str, coordinates: Option<(f64, f64)>) -> GeoRecord {
        GeoRecord {
            record: NormalizedRecord {
                name: name.into(),
                category: "Cafe".into(),
                area: "Chelsea, New York, NY".into(),
            },
            address: coordinates.map(|_| format!("{} address", name)),
            coordinates: coordinates.map(|(latitude, longitude)| Coordinates {
                latitude,
                longitude,
            }),
        }
    }

    #[test]
    fn test_filter_keeps_complete_records_in_order() {
        let input = vec![
            geo("A", Some((40.1, -73.1))),
            geo("B", None),
            geo("C", Some((40.3, -73.3))),
            geo("D", None),
            geo("E", Some((40.5, -73.5))),
        ];

        let out = complete_records(input.clone());

        let names: Vec<&str> = out.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "E"]);
        assert!(out.len() <= input.len());
        assert_eq!(out[1].latitude, 40.3);
        assert_eq!(out[1].longitude, -73.3);
    }

    #[test]
    fn test_finalize_writes_flat_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restaurants.json");

        let written = finalize(vec![geo("Café Sabarsky", Some((40.78, -73.96))), geo("B", None)], &path)
            .unwrap();

        assert_eq!(written, 1);
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert_eq!(first["Restaurant"], "Café Sabarsky");
        assert_eq!(first["Neighborhood"], "Chelsea, New York, NY");
        assert_eq!(first["Latitude"], 40.78);
        assert_eq!(first["Longitude"], -73.96);
    }

    #[test]
    fn test_unenriched_dataset_has_no_coordinate_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restaurants.json");
        let records = vec![NormalizedRecord {
            name: "Joe's Diner".into(),
            category: "American".into(),
            area: "SoHo, New York, NY".into(),
        }];

        assert_eq!(finalize_unenriched(records, &path).unwrap(), 1);

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let first = value[0].as_object().unwrap();
        assert_eq!(first.len(), 3);
        assert!(first.get("Latitude").is_none());
    }
}
