//! Best-effort external lookups
//!
//! Address and coordinate resolution against the place search and geocode
//! services. Each lookup either finds a value or degrades to
//! [`Lookup::Absent`]; errors are logged here and never returned to callers.

mod address;
mod coordinates;
mod google;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::warn;

use crate::config::LookupConfig;
use crate::error::LookupError;

pub use address::AddressResolver;
pub use coordinates::CoordinateResolver;
pub use google::{GeocodeResult, Geometry, GoogleMapsClient, LatLng, PlaceResult};

/// Outcome of one best-effort lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Found(value),
            None => Lookup::Absent,
        }
    }
}

/// Free-text place search.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Matches for `query`, best first.
    async fn search_text(&self, query: &str) -> Result<Vec<PlaceResult>, LookupError>;
}

/// Address to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Matches for `address`, best first.
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, LookupError>;
}

/// Fixed delay after every request, plus optional retries with exponential
/// backoff for retryable failures.
#[derive(Debug, Clone)]
pub struct Pacer {
    delay: Duration,
    retries: u32,
    backoff: Duration,
}

impl Pacer {
    pub fn new(delay: Duration, retries: u32, backoff: Duration) -> Self {
        Self {
            delay,
            retries,
            backoff,
        }
    }

    pub fn from_config(config: &LookupConfig) -> Self {
        Self::new(config.delay, config.retries, config.backoff)
    }

    /// Wait before retry number `attempt + 1`. Saturates instead of overflowing.
    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `request`, sleeping the fixed delay after each attempt.
    pub async fn call<T, F, Fut>(&self, mut request: F) -> Result<T, LookupError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LookupError>>,
    {
        let mut attempt = 0;
        loop {
            let result = request().await;
            sleep(self.delay).await;

            match result {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    let backoff = self.backoff_for(attempt);
                    warn!(
                        "Lookup attempt {} failed, retrying in {:?}: {}",
                        attempt + 1,
                        backoff,
                        e
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
