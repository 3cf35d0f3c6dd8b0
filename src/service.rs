use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::info;

use crate::config::ExtractorConfig;
use crate::error::ScraperError;
use crate::extract::{ChromeDriver, ExtractionReport, Extractor};

/// Extraction request: where to start and how far to page.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub config: ExtractorConfig,
}

impl ExtractionRequest {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.config.start_url = url.into();
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }
}

impl From<ExtractorConfig> for ExtractionRequest {
    fn from(config: ExtractorConfig) -> Self {
        Self::new(config)
    }
}

/// `tower::Service` that runs one extraction in a fresh Chrome session.
///
/// Only a failed browser launch is an error; everything after that ends up in
/// the returned [`ExtractionReport`]. The session is closed before the future
/// resolves.
#[derive(Debug, Clone, Default)]
pub struct ExtractionService {}

impl ExtractionService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<ExtractionRequest> for ExtractionService {
    type Response = ExtractionReport;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ExtractionRequest) -> Self::Future {
        info!(
            "Extraction request: url={}, max_pages={}",
            req.config.start_url, req.config.max_pages
        );

        Box::pin(async move {
            let driver = ChromeDriver::launch(&req.config).await?;
            let report = Extractor::new(&req.config).run_scoped(driver).await;

            info!(
                "Extraction complete: {} listings, {} pages, stop={}",
                report.records.len(),
                report.pages_visited,
                report.stop
            );
            Ok(report)
        })
    }
}
