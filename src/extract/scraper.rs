//! Page loop: scroll, wait, harvest, advance.

use base64::Engine;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;
use crate::error::ScraperError;
use crate::record::ListingRecord;
use crate::traits::{PageDriver, ScrollTarget};

use super::types::{ClickMethod, ExtractionReport, StopReason};

enum Harvest {
    Loaded {
        listings: Vec<ListingRecord>,
        skipped: usize,
    },
    TimedOut,
}

enum Advance {
    Clicked(ClickMethod),
    LastPage,
    NoControl,
}

/// Harvests listings page by page until the data runs out or the page cap is hit.
pub struct Extractor<'a> {
    config: &'a ExtractorConfig,
}

impl<'a> Extractor<'a> {
    pub fn new(config: &'a ExtractorConfig) -> Self {
        Self { config }
    }

    /// Run the page loop, then close the driver whatever the outcome.
    pub async fn run_scoped<D: PageDriver>(&self, mut driver: D) -> ExtractionReport {
        let report = self.run(&mut driver).await;
        if let Err(e) = driver.close().await {
            warn!("Failed to close browser session: {}", e);
        }
        report
    }

    /// Run the page loop. Failures end the loop early; they are reported in
    /// [`ExtractionReport::stop`] and never returned as errors.
    pub async fn run<D: PageDriver>(&self, driver: &mut D) -> ExtractionReport {
        let max_pages = self.config.max_pages;
        let mut records = Vec::new();
        let mut skipped = 0;
        let mut pages_visited = 0;

        info!("Navigating to {}", self.config.start_url);
        if let Err(e) = driver.navigate(&self.config.start_url).await {
            warn!("Could not load start page: {}", e);
            return ExtractionReport {
                records,
                pages_visited,
                skipped,
                stop: StopReason::NavigationFailed(e.to_string()),
            };
        }
        sleep(self.config.pacing.initial_load).await;

        let stop = loop {
            if pages_visited >= max_pages {
                break StopReason::PageCap;
            }
            pages_visited += 1;
            let page = pages_visited;
            info!("Page {}/{}", page, max_pages);

            match self.harvest_page(driver).await {
                Ok(Harvest::Loaded {
                    listings,
                    skipped: bad,
                }) => {
                    info!("Found {} listings on page {}", listings.len(), page);
                    skipped += bad;
                    let empty = listings.is_empty() && bad == 0;
                    records.extend(listings);
                    if empty {
                        break StopReason::EmptyPage;
                    }
                }
                Ok(Harvest::TimedOut) => {
                    warn!("Timed out waiting for listings on page {}", page);
                    self.capture_screenshot(driver).await;
                    break StopReason::LoadTimeout { page };
                }
                Err(e) => {
                    warn!("Failed to read page {}: {}", page, e);
                    break StopReason::PageFailed {
                        page,
                        message: e.to_string(),
                    };
                }
            }

            if pages_visited >= max_pages {
                break StopReason::PageCap;
            }

            match self.advance(driver).await {
                Ok(Advance::Clicked(method)) => {
                    debug!("Advanced past page {} ({:?} click)", page, method);
                }
                Ok(Advance::LastPage) => {
                    info!("Reached the last page");
                    break StopReason::LastPage;
                }
                Ok(Advance::NoControl) => {
                    info!("No next-page control; reached the end");
                    break StopReason::NoNextControl;
                }
                Err(e) => {
                    info!("Could not advance past page {}, treating as end: {}", page, e);
                    break StopReason::PageFailed {
                        page,
                        message: e.to_string(),
                    };
                }
            }
        };

        info!(
            "Extraction finished: {} listings from {} pages ({})",
            records.len(),
            pages_visited,
            stop
        );

        ExtractionReport {
            records,
            pages_visited,
            skipped,
            stop,
        }
    }

    /// Scroll step by step so the grid renders every row, then return to the top.
    async fn force_lazy_load<D: PageDriver>(&self, driver: &D) -> Result<(), ScraperError> {
        let pacing = &self.config.pacing;
        for step in 1..=pacing.scroll_steps {
            driver
                .scroll(ScrollTarget::Offset(step * pacing.scroll_step_px))
                .await?;
            sleep(pacing.scroll_step_delay).await;
        }
        driver.scroll(ScrollTarget::Bottom).await?;
        sleep(pacing.scroll_edge_delay).await;
        driver.scroll(ScrollTarget::Top).await?;
        sleep(pacing.scroll_edge_delay).await;
        Ok(())
    }

    async fn harvest_page<D: PageDriver>(&self, driver: &D) -> Result<Harvest, ScraperError> {
        let selectors = &self.config.selectors;

        self.force_lazy_load(driver).await?;

        let loaded = driver
            .wait_for_selector(&selectors.heading, self.config.pacing.heading_timeout)
            .await?;
        if !loaded {
            return Ok(Harvest::TimedOut);
        }

        let headings = driver.find_all(&selectors.heading).await?;
        let containers = match driver.find_all(&selectors.tag_container).await {
            Ok(containers) => containers,
            Err(e) => {
                warn!("Tag containers unavailable, listings get no tags: {}", e);
                Vec::new()
            }
        };
        if containers.len() != headings.len() {
            debug!(
                "{} headings but {} tag containers; pairing by index",
                headings.len(),
                containers.len()
            );
        }

        let mut listings = Vec::with_capacity(headings.len());
        let mut skipped = 0;
        for (i, heading) in headings.iter().enumerate() {
            match self.read_listing(driver, heading, containers.get(i)).await {
                Ok(listing) => {
                    debug!(
                        "  {}. {} | {} | {}",
                        i + 1,
                        listing.name,
                        listing.category,
                        listing.area.as_deref().unwrap_or_default()
                    );
                    listings.push(listing);
                }
                Err(e) => {
                    warn!("Skipping listing {}: {}", i + 1, e);
                    skipped += 1;
                }
            }
        }

        Ok(Harvest::Loaded { listings, skipped })
    }

    /// Category is the first tag in the container, area the second.
    async fn read_listing<D: PageDriver>(
        &self,
        driver: &D,
        heading: &D::Element,
        container: Option<&D::Element>,
    ) -> Result<ListingRecord, ScraperError> {
        let name = driver.text(heading).await?;

        let tags = match container {
            Some(container) => driver.find_within(container, &self.config.selectors.tag).await?,
            None => Vec::new(),
        };

        let category = match tags.first() {
            Some(tag) => driver.text(tag).await?,
            None => String::new(),
        };
        let area = match tags.get(1) {
            Some(tag) => driver.text(tag).await?,
            None => String::new(),
        };

        Ok(ListingRecord::new(name, category, area))
    }

    async fn advance<D: PageDriver>(&self, driver: &D) -> Result<Advance, ScraperError> {
        let selectors = &self.config.selectors;
        let pacing = &self.config.pacing;

        driver.scroll(ScrollTarget::Bottom).await?;
        sleep(pacing.scroll_edge_delay).await;

        let Some(next) = driver
            .find_all(&selectors.next_control)
            .await?
            .into_iter()
            .next()
        else {
            return Ok(Advance::NoControl);
        };

        let parent_class = driver.parent_class(&next).await?.unwrap_or_default();
        if parent_class
            .split_whitespace()
            .any(|class| class == selectors.disabled_class)
        {
            return Ok(Advance::LastPage);
        }

        driver.scroll_into_view(&next).await?;
        sleep(pacing.next_settle).await;

        let method = match driver.click(&next).await {
            Ok(()) => ClickMethod::Native,
            Err(e) => {
                debug!("Native click failed, falling back to script click: {}", e);
                driver.script_click(&next).await?;
                ClickMethod::Script
            }
        };

        sleep(pacing.after_click).await;
        Ok(Advance::Clicked(method))
    }

    async fn capture_screenshot<D: PageDriver>(&self, driver: &D) {
        if !self.config.debug_screenshots {
            return;
        }
        match driver.screenshot().await {
            Ok(png) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
                debug!("Page screenshot: data:image/png;base64,{}", encoded);
            }
            Err(e) => debug!("Screenshot failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::config::Pacing;

    #[derive(Clone, Copy, PartialEq)]
    enum Next {
        Enabled,
        Disabled,
        Missing,
    }

    struct FakePage {
        headings: Vec<String>,
        tags: Vec<Vec<String>>,
        next: Next,
        /// Heading whose text cannot be read.
        broken_heading: Option<usize>,
        /// Native click on the next control is intercepted.
        intercepted: bool,
    }

    impl FakePage {
        fn new(headings: &[&str], tags: &[&[&str]]) -> Self {
            Self {
                headings: headings.iter().map(|s| s.to_string()).collect(),
                tags: tags
                    .iter()
                    .map(|group| group.iter().map(|s| s.to_string()).collect())
                    .collect(),
                next: Next::Enabled,
                broken_heading: None,
                intercepted: false,
            }
        }

        fn last(mut self) -> Self {
            self.next = Next::Disabled;
            self
        }
    }

    #[derive(Debug)]
    enum FakeElement {
        Heading(usize),
        Container(usize),
        Tag(usize, usize),
        Next,
    }

    /// In-memory site; a successful click on the next control turns the page.
    struct FakeSite {
        pages: Vec<FakePage>,
        current: Mutex<usize>,
        fail_navigation: bool,
        script_clicks: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    impl FakeSite {
        fn new(pages: Vec<FakePage>) -> Self {
            Self {
                pages,
                current: Mutex::new(0),
                fail_navigation: false,
                script_clicks: Arc::new(AtomicUsize::new(0)),
                closes: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn page(&self) -> Option<&FakePage> {
            let current = *self.current.lock().unwrap();
            self.pages.get(current)
        }

        fn turn(&self) {
            *self.current.lock().unwrap() += 1;
        }
    }

    #[async_trait]
    impl PageDriver for FakeSite {
        type Element = FakeElement;

        async fn navigate(&mut self, _url: &str) -> Result<(), ScraperError> {
            if self.fail_navigation {
                return Err(ScraperError::Navigation("net::ERR_NAME_NOT_RESOLVED".into()));
            }
            Ok(())
        }

        async fn scroll(&self, _target: ScrollTarget) -> Result<(), ScraperError> {
            Ok(())
        }

        async fn wait_for_selector(
            &self,
            _selector: &str,
            _timeout: Duration,
        ) -> Result<bool, ScraperError> {
            Ok(self.page().map(|p| !p.headings.is_empty()).unwrap_or(false))
        }

        async fn find_all(&self, selector: &str) -> Result<Vec<FakeElement>, ScraperError> {
            let Some(page) = self.page() else {
                return Ok(Vec::new());
            };
            let found = if selector.starts_with("h3") {
                (0..page.headings.len()).map(FakeElement::Heading).collect()
            } else if selector.contains("taglines") {
                (0..page.tags.len()).map(FakeElement::Container).collect()
            } else if selector.contains("next") && page.next != Next::Missing {
                vec![FakeElement::Next]
            } else {
                Vec::new()
            };
            Ok(found)
        }

        async fn find_within(
            &self,
            parent: &FakeElement,
            _selector: &str,
        ) -> Result<Vec<FakeElement>, ScraperError> {
            match (parent, self.page()) {
                (FakeElement::Container(c), Some(page)) => Ok((0..page.tags[*c].len())
                    .map(|t| FakeElement::Tag(*c, t))
                    .collect()),
                _ => Ok(Vec::new()),
            }
        }

        async fn text(&self, element: &FakeElement) -> Result<String, ScraperError> {
            let page = self
                .page()
                .ok_or_else(|| ScraperError::ElementNotFound("no page".into()))?;
            match element {
                FakeElement::Heading(i) if page.broken_heading == Some(*i) => {
                    Err(ScraperError::ElementNotFound("stale element".into()))
                }
                FakeElement::Heading(i) => Ok(page.headings[*i].clone()),
                FakeElement::Tag(c, t) => Ok(page.tags[*c][*t].clone()),
                other => Err(ScraperError::ElementNotFound(format!("{:?}", other))),
            }
        }

        async fn parent_class(&self, _element: &FakeElement) -> Result<Option<String>, ScraperError> {
            let disabled = self.page().map(|p| p.next == Next::Disabled).unwrap_or(false);
            Ok(Some(if disabled { "next disabled" } else { "next" }.to_string()))
        }

        async fn scroll_into_view(&self, _element: &FakeElement) -> Result<(), ScraperError> {
            Ok(())
        }

        async fn click(&self, _element: &FakeElement) -> Result<(), ScraperError> {
            if self.page().map(|p| p.intercepted).unwrap_or(false) {
                return Err(ScraperError::Click("element click intercepted".into()));
            }
            self.turn();
            Ok(())
        }

        async fn script_click(&self, _element: &FakeElement) -> Result<(), ScraperError> {
            self.script_clicks.fetch_add(1, Ordering::SeqCst);
            self.turn();
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ScraperError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config(max_pages: u32) -> ExtractorConfig {
        ExtractorConfig {
            max_pages,
            pacing: Pacing::immediate(),
            ..ExtractorConfig::default()
        }
    }

    fn names(report: &ExtractionReport) -> Vec<&str> {
        report.records.iter().map(|r| r.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_stops_at_first_empty_page() {
        let mut site = FakeSite::new(vec![
            FakePage::new(&["A", "B"], &[&["Thai", "Astoria"], &["Pizza", "SoHo"]]),
            FakePage::new(&["C"], &[&["Deli", "LES"]]),
            FakePage::new(&[], &[]),
            FakePage::new(&["never"], &[&["x", "y"]]),
        ]);
        let config = config(55);

        let report = Extractor::new(&config).run(&mut site).await;

        assert_eq!(names(&report), vec!["A", "B", "C"]);
        assert_eq!(report.pages_visited, 3);
        assert_eq!(report.stop, StopReason::LoadTimeout { page: 3 });
    }

    #[tokio::test]
    async fn test_stops_at_disabled_next_control() {
        let mut site = FakeSite::new(vec![
            FakePage::new(&["A"], &[&["Thai", "Astoria"]]),
            FakePage::new(&["B"], &[&["Pizza", "SoHo"]]).last(),
            FakePage::new(&["never"], &[&["x", "y"]]),
        ]);
        let config = config(55);

        let report = Extractor::new(&config).run(&mut site).await;

        assert_eq!(names(&report), vec!["A", "B"]);
        assert_eq!(report.stop, StopReason::LastPage);
        assert!(report.stop.is_clean());
    }

    #[tokio::test]
    async fn test_missing_next_control_ends_extraction() {
        let mut page = FakePage::new(&["A"], &[&["Thai", "Astoria"]]);
        page.next = Next::Missing;
        let mut site = FakeSite::new(vec![page]);
        let config = config(55);

        let report = Extractor::new(&config).run(&mut site).await;

        assert_eq!(names(&report), vec!["A"]);
        assert_eq!(report.stop, StopReason::NoNextControl);
    }

    #[tokio::test]
    async fn test_page_cap_is_a_normal_stop() {
        let names_owned: Vec<String> = (0..5).map(|i| format!("R{}", i)).collect();
        let pages = names_owned
            .iter()
            .map(|name| FakePage::new(&[name.as_str()], &[&["Cafe", "Chelsea"]]))
            .collect();
        let mut site = FakeSite::new(pages);
        let config = config(2);

        let report = Extractor::new(&config).run(&mut site).await;

        assert_eq!(names(&report), vec!["R0", "R1"]);
        assert_eq!(report.pages_visited, 2);
        assert_eq!(report.stop, StopReason::PageCap);
    }

    #[tokio::test]
    async fn test_fewer_tag_containers_than_headings() {
        let headings: Vec<String> = (1..=12).map(|i| format!("Listing {}", i)).collect();
        let heading_refs: Vec<&str> = headings.iter().map(String::as_str).collect();
        let tags: Vec<&[&str]> = vec![&["Italian", "Tribeca"]; 10];
        let mut site = FakeSite::new(vec![FakePage::new(&heading_refs, &tags).last()]);
        let config = config(55);

        let report = Extractor::new(&config).run(&mut site).await;

        assert_eq!(report.records.len(), 12);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.records[9].category, "Italian");
        for record in &report.records[10..] {
            assert_eq!(record.category, "");
            assert_eq!(record.area.as_deref(), Some(""));
        }
    }

    #[tokio::test]
    async fn test_single_tag_gives_category_only() {
        let mut site = FakeSite::new(vec![FakePage::new(&["Solo"], &[&["Ramen"]]).last()]);
        let config = config(55);

        let report = Extractor::new(&config).run(&mut site).await;

        assert_eq!(report.records[0].category, "Ramen");
        assert_eq!(report.records[0].area.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_unreadable_listing_is_skipped() {
        let mut page = FakePage::new(
            &["A", "B", "C"],
            &[&["Thai", "Astoria"], &["Pizza", "SoHo"], &["Deli", "LES"]],
        )
        .last();
        page.broken_heading = Some(1);
        let mut site = FakeSite::new(vec![page]);
        let config = config(55);

        let report = Extractor::new(&config).run(&mut site).await;

        assert_eq!(names(&report), vec!["A", "C"]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.records[1].area.as_deref(), Some("LES"));
    }

    #[tokio::test]
    async fn test_intercepted_click_falls_back_to_script() {
        let mut first = FakePage::new(&["A"], &[&["Thai", "Astoria"]]);
        first.intercepted = true;
        let mut site = FakeSite::new(vec![
            first,
            FakePage::new(&["B"], &[&["Pizza", "SoHo"]]).last(),
        ]);
        let script_clicks = Arc::clone(&site.script_clicks);
        let config = config(55);

        let report = Extractor::new(&config).run(&mut site).await;

        assert_eq!(names(&report), vec!["A", "B"]);
        assert_eq!(script_clicks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_navigation_failure_still_closes_session() {
        let mut site = FakeSite::new(vec![FakePage::new(&["A"], &[&["Thai", "Astoria"]])]);
        site.fail_navigation = true;
        let closes = Arc::clone(&site.closes);
        let config = config(55);

        let report = Extractor::new(&config).run_scoped(site).await;

        assert!(report.records.is_empty());
        assert!(matches!(report.stop, StopReason::NavigationFailed(_)));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scoped_run_closes_session() {
        let site = FakeSite::new(vec![FakePage::new(&["A"], &[&["Thai", "Astoria"]]).last()]);
        let closes = Arc::clone(&site.closes);
        let config = config(55);

        let report = Extractor::new(&config).run_scoped(site).await;

        assert_eq!(report.records.len(), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
