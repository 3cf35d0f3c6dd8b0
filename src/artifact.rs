//! Stage artifacts on disk.
//!
//! Every file is written to a sibling temp file and renamed into place, so an
//! interrupted run never leaves a half-written artifact behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::PipelineError;
use crate::record::{AddressedRow, GeoRow, ListingRecord, NormalizedRecord};

/// A record shape with a fixed CSV header row.
pub trait CsvRow: Serialize + DeserializeOwned {
    const HEADERS: &'static [&'static str];
}

impl CsvRow for ListingRecord {
    const HEADERS: &'static [&'static str] = &["Restaurant", "Cuisine", "Neighborhood"];
}

impl CsvRow for NormalizedRecord {
    const HEADERS: &'static [&'static str] = &["Restaurant", "Cuisine", "Neighborhood"];
}

impl CsvRow for AddressedRow {
    const HEADERS: &'static [&'static str] = &["Restaurant", "Cuisine", "Neighborhood", "Address"];
}

impl CsvRow for GeoRow {
    const HEADERS: &'static [&'static str] = &[
        "Restaurant",
        "Cuisine",
        "Neighborhood",
        "Address",
        "Latitude",
        "Longitude",
    ];
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let write_err = |source| PipelineError::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(write_err)?;
    }
    let tmp = temp_path(path);
    fs::write(&tmp, bytes).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)
}

/// Write `rows` under the shape's header row. An empty input still gets the header.
pub fn write_csv<T: CsvRow>(path: &Path, rows: &[T]) -> Result<(), PipelineError> {
    let csv_err = |source| PipelineError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(T::HEADERS).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::ArtifactWrite {
            path: path.to_path_buf(),
            source: e.into_error(),
        })?;

    write_atomically(path, &bytes)?;
    info!("✓ Saved {} rows to: {}", rows.len(), path.display());
    Ok(())
}

/// Read every row of a stage artifact. Short rows are allowed: each row is
/// matched against only as many headers as it has cells, so trailing cells
/// that were trimmed away take the field's default.
pub fn read_csv<T: CsvRow>(path: &Path) -> Result<Vec<T>, PipelineError> {
    let file = fs::File::open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            PipelineError::MissingArtifact {
                path: path.to_path_buf(),
            }
        } else {
            PipelineError::ArtifactRead {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let csv_err = |source| PipelineError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader.headers().map_err(csv_err)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let present: csv::StringRecord = headers.iter().take(record.len()).collect();
        rows.push(record.deserialize(Some(&present)).map_err(csv_err)?);
    }
    info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Pretty-printed JSON array; non-ASCII text is written as-is.
pub fn write_json<T: Serialize>(path: &Path, records: &[T]) -> Result<(), PipelineError> {
    let mut json = serde_json::to_string_pretty(records)?;
    json.push('\n');
    write_atomically(path, json.as_bytes())?;
    info!("✓ Saved {} records to: {}", records.len(), path.display());
    Ok(())
}

/// Write a text file atomically.
pub fn write_text(path: &Path, text: &str) -> Result<(), PipelineError> {
    write_atomically(path, text.as_bytes())
}
