//! Extraction result types

use std::fmt;

use crate::record::ListingRecord;

/// Why the page loop ended. None of these fail the pipeline; the records
/// collected so far are the stage's output either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `max_pages` pages were harvested.
    PageCap,
    /// A page rendered zero listings.
    EmptyPage,
    /// The next control's parent carries the disabled class.
    LastPage,
    /// No next control on the page.
    NoNextControl,
    /// No listing heading appeared within the wait timeout.
    LoadTimeout { page: u32 },
    /// The start URL could not be loaded.
    NavigationFailed(String),
    /// Reading the page or clicking through to the next one failed.
    PageFailed { page: u32, message: String },
}

impl StopReason {
    /// Normal end of data, as opposed to an early stop.
    pub fn is_clean(&self) -> bool {
        matches!(
            self,
            StopReason::PageCap
                | StopReason::EmptyPage
                | StopReason::LastPage
                | StopReason::NoNextControl
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::PageCap => write!(f, "page cap reached"),
            StopReason::EmptyPage => write!(f, "page had no listings"),
            StopReason::LastPage => write!(f, "reached the last page"),
            StopReason::NoNextControl => write!(f, "no next-page control"),
            StopReason::LoadTimeout { page } => write!(f, "page {} did not load", page),
            StopReason::NavigationFailed(e) => write!(f, "navigation failed: {}", e),
            StopReason::PageFailed { page, message } => {
                write!(f, "page {} failed: {}", page, message)
            }
        }
    }
}

/// How the next control was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMethod {
    Native,
    Script,
}

/// Output of one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// Listings in page-then-on-page order.
    pub records: Vec<ListingRecord>,
    pub pages_visited: u32,
    /// Listings that could not be read and were skipped.
    pub skipped: usize,
    pub stop: StopReason,
}
