//! Stage runner
//!
//! Runs the stages in order, each one reading the artifact the previous stage
//! wrote. Any stage can be the starting point as long as the artifact it reads
//! is already on disk.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use futures::future::poll_fn;
use tower::Service;
use tracing::{info, warn};

use crate::artifact;
use crate::config::PipelineConfig;
use crate::display;
use crate::error::{PipelineError, ScraperError};
use crate::extract::ExtractionReport;
use crate::finalize;
use crate::gate::{HumanGate, ResumeSignal};
use crate::lookup::{AddressResolver, CoordinateResolver, Geocoder, Pacer, PlaceSearch};
use crate::normalize::normalize;
use crate::record::{AddressedRow, GeoRow, ListingRecord, NormalizedRecord};
use crate::service::ExtractionRequest;

fn banner(title: &str) {
    info!("{}", "=".repeat(80));
    info!("{}", title);
    info!("{}", "=".repeat(80));
}

/// Stage boundaries, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Extract,
    Review,
    Normalize,
    Addresses,
    Coordinates,
    Finalize,
    Display,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Extract,
        Stage::Review,
        Stage::Normalize,
        Stage::Addresses,
        Stage::Coordinates,
        Stage::Finalize,
        Stage::Display,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Review => "review",
            Stage::Normalize => "normalize",
            Stage::Addresses => "addresses",
            Stage::Coordinates => "coordinates",
            Stage::Finalize => "finalize",
            Stage::Display => "display",
        }
    }

    /// Whether this stage calls the external lookup services.
    pub fn needs_lookups(&self) -> bool {
        matches!(self, Stage::Addresses | Stage::Coordinates)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Stage::ALL.iter().map(|s| s.name()).collect();
                format!("unknown stage '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// The two lookup clients. Absent when no credential is configured.
#[derive(Clone, Copy)]
pub struct Lookups<'a> {
    pub places: &'a dyn PlaceSearch,
    pub geocoder: &'a dyn Geocoder,
}

impl<'a> Lookups<'a> {
    /// Both lookups served by one client.
    pub fn from_client<C: PlaceSearch + Geocoder>(client: &'a C) -> Self {
        Self {
            places: client,
            geocoder: client,
        }
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Present when the extraction stage ran in this invocation.
    pub extraction: Option<ExtractionReport>,
    pub records: usize,
    pub lookups_skipped: bool,
    pub dataset: PathBuf,
    pub display_page: PathBuf,
}

/// Runs the stages against one [`PipelineConfig`].
///
/// The extraction stage goes through `S`, normally
/// [`ExtractionService`](crate::service::ExtractionService).
pub struct Pipeline<'a, S> {
    config: &'a PipelineConfig,
    extraction: S,
    lookups: Option<Lookups<'a>>,
    gate: HumanGate,
}

impl<'a, S> Pipeline<'a, S>
where
    S: Service<ExtractionRequest, Response = ExtractionReport, Error = ScraperError>,
{
    pub fn new(config: &'a PipelineConfig, extraction: S) -> Self {
        Self {
            config,
            extraction,
            lookups: None,
            gate: HumanGate::new(),
        }
    }

    pub fn with_lookups(mut self, lookups: Lookups<'a>) -> Self {
        self.lookups = Some(lookups);
        self
    }

    /// Run every stage from `from` onward. The review gate is only held when
    /// the run starts at or before it. Starting at a lookup stage without
    /// lookup clients is an error.
    pub async fn run<R>(&mut self, from: Stage, signal: &mut R) -> Result<RunSummary, PipelineError>
    where
        R: ResumeSignal + ?Sized,
    {
        banner("RESTAURANT LISTING PIPELINE");
        info!("Starting at stage: {}", from);
        if from.needs_lookups() && self.lookups.is_none() {
            return Err(PipelineError::LookupsUnavailable { stage: from });
        }
        // A restart at the finalize boundary always reads the geocoded artifact.
        let enriched = self.lookups.is_some() || from >= Stage::Finalize;

        let mut extraction = None;
        if from <= Stage::Extract {
            extraction = Some(self.extract().await?);
        }
        if from <= Stage::Review {
            self.gate
                .hold(signal, &self.config.artifacts.extracted())
                .await?;
        }
        if from <= Stage::Normalize {
            self.normalize_stage()?;
        }

        match self.lookups {
            Some(lookups) => {
                if from <= Stage::Addresses {
                    self.address_stage(lookups.places).await?;
                }
                if from <= Stage::Coordinates {
                    self.coordinate_stage(lookups.geocoder).await?;
                }
            }
            None if from <= Stage::Coordinates => {
                warn!("⚠ Skipping API steps (no API key provided)");
            }
            None => {}
        }

        let records = if from > Stage::Finalize {
            0
        } else if enriched {
            self.finalize_stage()?
        } else {
            self.finalize_unenriched_stage()?
        };

        let paths = &self.config.artifacts;
        banner("STEP 6: GENERATING MAP PAGE");
        display::write_map_page(&paths.display_page())?;

        let summary = RunSummary {
            extraction,
            records,
            lookups_skipped: !enriched,
            dataset: paths.dataset(),
            display_page: paths.display_page(),
        };

        banner("✓ PIPELINE COMPLETED SUCCESSFULLY!");
        info!("Final outputs:");
        info!("  - Data file: {}", summary.dataset.display());
        info!("  - Interactive map: {}", summary.display_page.display());
        info!(
            "Open '{}' in a browser with '{}' in the same directory",
            summary.display_page.display(),
            summary.dataset.display()
        );
        Ok(summary)
    }

    async fn extract(&mut self) -> Result<ExtractionReport, PipelineError> {
        banner("STEP 1: WEB SCRAPING");

        let request = ExtractionRequest::new(self.config.extractor.clone());
        poll_fn(|cx| self.extraction.poll_ready(cx)).await?;
        let report = self.extraction.call(request).await?;

        if !report.stop.is_clean() {
            warn!("Extraction stopped early ({}); keeping what was collected", report.stop);
        }
        if report.skipped > 0 {
            warn!("{} listings could not be read and were skipped", report.skipped);
        }
        artifact::write_csv(&self.config.artifacts.extracted(), &report.records)?;
        Ok(report)
    }

    fn normalize_stage(&self) -> Result<(), PipelineError> {
        banner(&format!("STEP 2: APPENDING '{}' TO AREAS", self.config.locality));
        let paths = &self.config.artifacts;

        let listings: Vec<ListingRecord> = artifact::read_csv(&paths.extracted())?;
        let normalized = normalize(listings, &self.config.locality);
        artifact::write_csv(&paths.normalized(), &normalized)
    }

    async fn address_stage(&self, places: &dyn PlaceSearch) -> Result<(), PipelineError> {
        banner("STEP 3: FETCHING ADDRESSES VIA GOOGLE PLACES API");
        let paths = &self.config.artifacts;

        let records: Vec<NormalizedRecord> = artifact::read_csv(&paths.normalized())?;
        let resolver = AddressResolver::new(places, Pacer::from_config(&self.config.lookup));
        let rows: Vec<AddressedRow> = resolver
            .resolve_all(records)
            .await
            .into_iter()
            .map(|r| r.into_row())
            .collect();
        artifact::write_csv(&paths.addressed(), &rows)
    }

    async fn coordinate_stage(&self, geocoder: &dyn Geocoder) -> Result<(), PipelineError> {
        banner("STEP 4: FETCHING COORDINATES VIA GOOGLE GEOCODING API");
        let paths = &self.config.artifacts;

        let rows: Vec<AddressedRow> = artifact::read_csv(&paths.addressed())?;
        let records = rows.into_iter().map(AddressedRow::into_record).collect();
        let resolver = CoordinateResolver::new(geocoder, Pacer::from_config(&self.config.lookup));
        let rows: Vec<GeoRow> = resolver
            .resolve_all(records)
            .await
            .into_iter()
            .map(|r| r.into_row())
            .collect();
        artifact::write_csv(&paths.geocoded(), &rows)
    }

    fn finalize_stage(&self) -> Result<usize, PipelineError> {
        banner("STEP 5: CONVERTING CSV TO JSON");
        let paths = &self.config.artifacts;

        let rows: Vec<GeoRow> = artifact::read_csv(&paths.geocoded())?;
        let records = rows.into_iter().map(GeoRow::into_record).collect();
        finalize::finalize(records, &paths.dataset())
    }

    fn finalize_unenriched_stage(&self) -> Result<usize, PipelineError> {
        banner("STEP 5: CONVERTING CSV TO JSON");
        let paths = &self.config.artifacts;

        let records: Vec<NormalizedRecord> = artifact::read_csv(&paths.normalized())?;
        finalize::finalize_unenriched(records, &paths.dataset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_parse() {
        assert_eq!("normalize".parse::<Stage>().unwrap(), Stage::Normalize);
        assert_eq!(" Finalize ".parse::<Stage>().unwrap(), Stage::Finalize);

        let err = "geocode".parse::<Stage>().unwrap_err();
        assert!(err.contains("addresses, coordinates"));
    }

    #[test]
    fn test_stage_order_follows_run_order() {
        let mut sorted = Stage::ALL;
        sorted.sort();
        assert_eq!(sorted, Stage::ALL);
        assert!(Stage::Review < Stage::Normalize);
        assert!(Stage::Addresses.needs_lookups());
        assert!(!Stage::Finalize.needs_lookups());
    }

    #[test]
    fn test_stage_display_round_trips() {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string().parse::<Stage>().unwrap(), stage);
        }
    }
}
