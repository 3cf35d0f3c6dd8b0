use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;

/// Where to scroll the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget {
    /// Absolute vertical offset in pixels.
    Offset(u32),
    Bottom,
    Top,
}

/// The browser capabilities the extractor needs.
///
/// The chromiumoxide implementation lives in [`crate::extract::ChromeDriver`];
/// tests drive the extractor with in-memory fakes.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Handle to a DOM element on the current page.
    type Element: Send + Sync;

    /// Load a URL in the session's page.
    async fn navigate(&mut self, url: &str) -> Result<(), ScraperError>;

    async fn scroll(&self, target: ScrollTarget) -> Result<(), ScraperError>;

    /// Poll until `selector` matches at least one element. `Ok(false)` on timeout.
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, ScraperError>;

    /// All elements matching `selector`, in document order.
    async fn find_all(&self, selector: &str) -> Result<Vec<Self::Element>, ScraperError>;

    /// Descendants of `parent` matching `selector`.
    async fn find_within(
        &self,
        parent: &Self::Element,
        selector: &str,
    ) -> Result<Vec<Self::Element>, ScraperError>;

    /// Rendered text of an element, whitespace-trimmed.
    async fn text(&self, element: &Self::Element) -> Result<String, ScraperError>;

    /// `class` attribute of the element's parent, if any.
    async fn parent_class(&self, element: &Self::Element) -> Result<Option<String>, ScraperError>;

    async fn scroll_into_view(&self, element: &Self::Element) -> Result<(), ScraperError>;

    /// Native (input-event) click.
    async fn click(&self, element: &Self::Element) -> Result<(), ScraperError>;

    /// `element.click()` run as page script; works when the native click is
    /// intercepted by an overlay.
    async fn script_click(&self, element: &Self::Element) -> Result<(), ScraperError>;

    /// Optional PNG capture used for load-failure diagnostics.
    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        Err(ScraperError::JavaScript("screenshots not supported".into()))
    }

    /// Release the session. Must be safe to call more than once.
    async fn close(&mut self) -> Result<(), ScraperError>;
}
