//! Listing pipeline library
//!
//! - Harvests restaurant listings from a paginated, script-rendered page
//! - Holds for a manual review of the extracted CSV
//! - Resolves addresses and coordinates through Google Places / Geocoding
//! - Writes the JSON dataset and a static map page
//!
//! # Extraction only
//!
//! ```rust,ignore
//! use listing_pipeline::{ExtractionRequest, ExtractionService, ExtractorConfig};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ExtractionService::new();
//!
//!     let request = ExtractionRequest::new(ExtractorConfig::default())
//!         .with_max_pages(2)
//!         .with_headless(false);
//!
//!     let report = service.call(request).await.unwrap();
//!     println!("Listings: {} ({})", report.records.len(), report.stop);
//! }
//! ```
//!
//! # Full pipeline
//!
//! ```rust,ignore
//! use listing_pipeline::{AutoResume, ExtractionService, Pipeline, PipelineConfig, Stage};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PipelineConfig::new()
//!         .with_out_dir("./out")
//!         .with_api_key(std::env::var("GOOGLE_API_KEY").ok());
//!
//!     let mut pipeline = Pipeline::new(&config, ExtractionService::new());
//!     let summary = pipeline.run(Stage::Extract, &mut AutoResume).await.unwrap();
//!     println!("Dataset: {}", summary.dataset.display());
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod display;
pub mod error;
pub mod extract;
pub mod finalize;
pub mod gate;
pub mod lookup;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod service;
pub mod traits;

pub use config::{ApiKey, ExtractorConfig, LookupConfig, PipelineConfig};
pub use error::{LookupError, PipelineError, ScraperError};
pub use extract::{ChromeDriver, ExtractionReport, Extractor, StopReason};
pub use gate::{AutoResume, HumanGate, ResumeSignal, StdinSignal};
pub use lookup::{GoogleMapsClient, Lookup};
pub use pipeline::{Lookups, Pipeline, RunSummary, Stage};
pub use record::{FinalRecord, ListingRecord, NormalizedRecord};
pub use service::{ExtractionRequest, ExtractionService};
pub use traits::PageDriver;
