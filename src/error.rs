use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

/// Browser-side failures raised by a [`PageDriver`](crate::traits::PageDriver).
#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("browser init failed: {0}")]
    BrowserInit(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("page script failed: {0}")]
    JavaScript(String),

    #[error("click failed: {0}")]
    Click(String),
}

/// Failure of a single external lookup. Never escapes the resolvers; it is
/// logged and collapsed into [`Lookup::Absent`](crate::lookup::Lookup::Absent).
#[derive(Error, Debug)]
pub enum LookupError {
    /// Transport failure. The request URL (which carries the API key) is
    /// stripped before the error is stored.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("service returned HTTP {status}")]
    Status { status: u16 },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("service status {status}: {message}")]
    Service { status: String, message: String },
}

impl LookupError {
    pub(crate) fn http(err: reqwest::Error) -> Self {
        LookupError::Http(err.without_url())
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LookupError::Http(e) => e.is_timeout() || e.is_connect(),
            LookupError::Status { status } => *status == 429 || *status >= 500,
            LookupError::Decode(_) => false,
            LookupError::Service { status, .. } => {
                status == "OVER_QUERY_LIMIT" || status == "UNKNOWN_ERROR"
            }
        }
    }
}

/// Pipeline-level failures: artifact handling and operator interruption.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("scraper failed: {0}")]
    Scraper(#[from] ScraperError),

    #[error("cannot read artifact {path}: {source}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write artifact {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact {path} is missing; run the earlier stages first")]
    MissingArtifact { path: PathBuf },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stage '{stage}' needs the lookup services, but no API key is configured")]
    LookupsUnavailable { stage: Stage },

    #[error("cannot read operator input: {0}")]
    OperatorInput(#[source] std::io::Error),

    #[error("pipeline interrupted by operator")]
    Interrupted,
}
