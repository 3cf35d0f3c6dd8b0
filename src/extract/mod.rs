//! Paginated listing extraction
//!
//! Drives a [`PageDriver`](crate::traits::PageDriver) across an unknown number
//! of result pages and harvests one [`ListingRecord`](crate::record::ListingRecord)
//! per listing card.

mod chrome;
mod scraper;
mod types;

pub use chrome::ChromeDriver;
pub use scraper::Extractor;
pub use types::{ClickMethod, ExtractionReport, StopReason};
