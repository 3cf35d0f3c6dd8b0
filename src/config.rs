use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_START_URL: &str = "https://www.nyctourism.com/restaurant-week/";
pub const DEFAULT_MAX_PAGES: u32 = 55;
pub const DEFAULT_LOCALITY: &str = "New York, NY";
/// Placeholder shipped in sample configs; treated the same as no key.
pub const API_KEY_PLACEHOLDER: &str = "YOUR_GOOGLE_API_KEY_HERE";

/// Google API credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for an empty or placeholder value.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == API_KEY_PLACEHOLDER {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// CSS selectors for the listing grid and its pagination control.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub heading: String,
    pub tag_container: String,
    pub tag: String,
    pub next_control: String,
    /// Class on the next control's parent marking the last page.
    pub disabled_class: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            heading: "h3.CardHeading_headline__qu1q3".to_string(),
            tag_container: "div.PromotionCardGrid_taglines__qTyHJ".to_string(),
            tag: "div.Tag_tag__cc4nK".to_string(),
            next_control: "li.next a".to_string(),
            disabled_class: "disabled".to_string(),
        }
    }
}

/// Settle delays and timeouts used while driving the page.
#[derive(Debug, Clone)]
pub struct Pacing {
    pub initial_load: Duration,
    pub scroll_steps: u32,
    pub scroll_step_px: u32,
    pub scroll_step_delay: Duration,
    pub scroll_edge_delay: Duration,
    pub heading_timeout: Duration,
    pub next_settle: Duration,
    pub after_click: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            initial_load: Duration::from_secs(3),
            scroll_steps: 5,
            scroll_step_px: 500,
            scroll_step_delay: Duration::from_millis(300),
            scroll_edge_delay: Duration::from_secs(1),
            heading_timeout: Duration::from_secs(10),
            next_settle: Duration::from_millis(500),
            after_click: Duration::from_secs(3),
        }
    }
}

impl Pacing {
    /// No delays at all; for fake drivers.
    pub fn immediate() -> Self {
        Self {
            initial_load: Duration::ZERO,
            scroll_step_delay: Duration::ZERO,
            scroll_edge_delay: Duration::ZERO,
            heading_timeout: Duration::ZERO,
            next_settle: Duration::ZERO,
            after_click: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub start_url: String,
    pub max_pages: u32,
    pub selectors: Selectors,
    pub pacing: Pacing,
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    /// Log a base64 screenshot when a page fails to load.
    pub debug_screenshots: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            selectors: Selectors::default(),
            pacing: Pacing::default(),
            headless: true,
            chrome_executable: None,
            debug_screenshots: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub api_key: Option<ApiKey>,
    /// Fixed pause after every request.
    pub delay: Duration,
    /// Extra attempts for retryable failures; 0 means a single request.
    pub retries: u32,
    pub backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            delay: Duration::from_millis(100),
            retries: 0,
            backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// File names of every stage artifact, rooted at the output directory.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn extracted(&self) -> PathBuf {
        self.dir.join("nyc_restaurant_week.csv")
    }

    pub fn normalized(&self) -> PathBuf {
        self.dir.join("nyc_restaurants_nyc.csv")
    }

    pub fn addressed(&self) -> PathBuf {
        self.dir.join("restaurants_with_addresses.csv")
    }

    pub fn geocoded(&self) -> PathBuf {
        self.dir.join("restaurants_with_coordinates.csv")
    }

    pub fn dataset(&self) -> PathBuf {
        self.dir.join("restaurants.json")
    }

    pub fn display_page(&self) -> PathBuf {
        self.dir.join("restaurant_map.html")
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new(Path::new("."))
    }
}

/// Whole-run configuration. Built once at startup and only read afterwards.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub extractor: ExtractorConfig,
    pub lookup: LookupConfig,
    pub locality: String,
    pub artifacts: ArtifactPaths,
    /// Resume past the review gate without waiting for the operator.
    pub auto_confirm: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorConfig::default(),
            lookup: LookupConfig::default(),
            locality: DEFAULT_LOCALITY.to_string(),
            artifacts: ArtifactPaths::default(),
            auto_confirm: false,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, raw: Option<String>) -> Self {
        self.lookup.api_key = raw.and_then(ApiKey::parse);
        self
    }

    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.extractor.start_url = url.into();
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.extractor.max_pages = max_pages;
        self
    }

    pub fn with_locality(mut self, locality: impl Into<String>) -> Self {
        self.locality = locality.into();
        self
    }

    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts = ArtifactPaths::new(dir);
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.extractor.headless = headless;
        self
    }

    pub fn with_chrome_executable(mut self, path: Option<PathBuf>) -> Self {
        self.extractor.chrome_executable = path;
        self
    }

    pub fn with_debug_screenshots(mut self, enabled: bool) -> Self {
        self.extractor.debug_screenshots = enabled;
        self
    }

    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup.delay = delay;
        self
    }

    pub fn with_lookup_retries(mut self, retries: u32) -> Self {
        self.lookup.retries = retries;
        self
    }

    pub fn with_auto_confirm(mut self, auto_confirm: bool) -> Self {
        self.auto_confirm = auto_confirm;
        self
    }

    /// Lookup stages run only with a usable credential.
    pub fn lookups_enabled(&self) -> bool {
        self.lookup.api_key.is_some()
    }
}
