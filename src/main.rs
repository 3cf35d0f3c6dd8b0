//! listing-pipeline CLI
//!
//! ```text
//! GOOGLE_API_KEY=... listing-pipeline --out-dir ./out
//! listing-pipeline --from normalize --yes
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use listing_pipeline::config::{DEFAULT_LOCALITY, DEFAULT_MAX_PAGES, DEFAULT_START_URL};
use listing_pipeline::{
    AutoResume, ExtractionService, GoogleMapsClient, Lookups, Pipeline, PipelineConfig,
    PipelineError, RunSummary, Stage, StdinSignal,
};

#[derive(Parser, Debug)]
#[command(name = "listing-pipeline")]
#[command(about = "Scrape restaurant listings, geocode them and build a map dataset")]
#[command(version)]
struct Cli {
    /// Google Maps Platform key; without one the lookup stages are skipped
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// First results page
    #[arg(long, env = "START_URL", default_value = DEFAULT_START_URL)]
    start_url: String,

    /// Stop after this many pages
    #[arg(long, env = "MAX_PAGES", default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: u32,

    /// Appended to every area before lookup
    #[arg(long, env = "LOCALITY", default_value = DEFAULT_LOCALITY)]
    locality: String,

    /// Directory for every artifact
    #[arg(long, env = "OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Chrome/Chromium executable
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// Restart at this stage using the artifacts already on disk
    #[arg(long, default_value = "extract")]
    from: Stage,

    /// Continue past the review checkpoint without waiting
    #[arg(short, long)]
    yes: bool,

    /// Pause after every lookup request, in milliseconds
    #[arg(long, env = "LOOKUP_DELAY_MS", default_value_t = 100)]
    lookup_delay_ms: u64,

    /// Extra attempts for rate-limited or failed lookups
    #[arg(
        long,
        env = "LOOKUP_RETRIES",
        default_value_t = 0,
        value_parser = clap::value_parser!(u32).range(0..=10)
    )]
    lookup_retries: u32,

    /// Log a base64 screenshot when a page fails to load
    #[arg(long)]
    debug_screenshots: bool,
}

impl Cli {
    fn into_config(self) -> PipelineConfig {
        PipelineConfig::new()
            .with_api_key(self.api_key)
            .with_start_url(self.start_url)
            .with_max_pages(self.max_pages)
            .with_locality(self.locality)
            .with_out_dir(self.out_dir)
            .with_headless(!self.headed)
            .with_chrome_executable(self.chrome_path)
            .with_debug_screenshots(self.debug_screenshots)
            .with_lookup_delay(Duration::from_millis(self.lookup_delay_ms))
            .with_lookup_retries(self.lookup_retries)
            .with_auto_confirm(self.yes)
    }
}

async fn run(config: &PipelineConfig, from: Stage) -> Result<RunSummary> {
    let client = match &config.lookup.api_key {
        Some(key) => Some(
            GoogleMapsClient::new(key.clone(), config.lookup.request_timeout)
                .context("Failed to build HTTP client")?,
        ),
        None => {
            warn!("Set GOOGLE_API_KEY or pass --api-key to enable address and coordinate lookups");
            None
        }
    };

    let mut pipeline = Pipeline::new(config, ExtractionService::new());
    if let Some(client) = &client {
        pipeline = pipeline.with_lookups(Lookups::from_client(client));
    }

    let summary = if config.auto_confirm {
        pipeline.run(from, &mut AutoResume).await?
    } else {
        pipeline.run(from, &mut StdinSignal).await?
    };
    Ok(summary)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let from = cli.from;
    let config = cli.into_config();
    info!(
        "Output directory: {}, lookups {}",
        config.artifacts.dir.display(),
        if config.lookups_enabled() { "enabled" } else { "disabled" }
    );

    tokio::select! {
        result = run(&config, from) => match result {
            Ok(summary) => {
                info!("{} records in {}", summary.records, summary.dataset.display());
                ExitCode::SUCCESS
            }
            Err(e) if matches!(e.downcast_ref::<PipelineError>(), Some(PipelineError::Interrupted)) => {
                error!("✗ Pipeline interrupted by user");
                ExitCode::from(130)
            }
            Err(e) => {
                error!("✗ Pipeline failed: {:#}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            error!("✗ Pipeline interrupted by user");
            ExitCode::from(130)
        }
    }
}
