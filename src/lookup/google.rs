//! Google Places Text Search and Geocoding clients.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::ApiKey;
use crate::error::LookupError;

use super::{Geocoder, PlaceSearch};

const PLACES_TEXT_SEARCH_URL: &str = "https://maps.googleapis.com/maps/api/place/textsearch/json";
const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// One Text Search match.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaceResult {
    #[serde(default)]
    pub formatted_address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

/// One Geocoding match.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GeocodeResult {
    pub geometry: Geometry,
}

/// Envelope shared by both APIs.
#[derive(Debug, Deserialize)]
struct ApiResponse<R> {
    #[serde(default)]
    status: Option<String>,
    #[serde(default = "Vec::new")]
    results: Vec<R>,
    #[serde(default)]
    error_message: Option<String>,
}

impl<R> ApiResponse<R> {
    /// `ZERO_RESULTS` is an empty success; other non-OK statuses are errors.
    fn into_results(self) -> Result<Vec<R>, LookupError> {
        match self.status.as_deref() {
            None | Some("OK") | Some("ZERO_RESULTS") => Ok(self.results),
            Some(status) => Err(LookupError::Service {
                status: status.to_string(),
                message: self.error_message.unwrap_or_default(),
            }),
        }
    }
}

fn parse_response<R: DeserializeOwned>(body: &str) -> Result<Vec<R>, LookupError> {
    let response: ApiResponse<R> =
        serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;
    response.into_results()
}

/// HTTP client for both Google endpoints. The key travels as a query
/// parameter and is stripped from every error before it is logged.
pub struct GoogleMapsClient {
    http: reqwest::Client,
    api_key: ApiKey,
    places_url: String,
    geocode_url: String,
}

impl GoogleMapsClient {
    pub fn new(api_key: ApiKey, timeout: Duration) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LookupError::http)?;
        Ok(Self {
            http,
            api_key,
            places_url: PLACES_TEXT_SEARCH_URL.to_string(),
            geocode_url: GEOCODE_URL.to_string(),
        })
    }

    /// Point both endpoints somewhere else (a proxy or a local stub).
    pub fn with_base_urls(
        mut self,
        places_url: impl Into<String>,
        geocode_url: impl Into<String>,
    ) -> Self {
        self.places_url = places_url.into();
        self.geocode_url = geocode_url.into();
        self
    }

    async fn get_results<R: DeserializeOwned>(
        &self,
        url: &str,
        param: (&str, &str),
    ) -> Result<Vec<R>, LookupError> {
        let resp = self
            .http
            .get(url)
            .query(&[param, ("key", self.api_key.expose())])
            .send()
            .await
            .map_err(LookupError::http)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(LookupError::http)?;
        let results = parse_response(&body)?;
        debug!("{} -> {} results", url, results.len());
        Ok(results)
    }
}

#[async_trait]
impl PlaceSearch for GoogleMapsClient {
    async fn search_text(&self, query: &str) -> Result<Vec<PlaceResult>, LookupError> {
        self.get_results(&self.places_url, ("query", query)).await
    }
}

#[async_trait]
impl Geocoder for GoogleMapsClient {
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, LookupError> {
        self.get_results(&self.geocode_url, ("address", address)).await
    }
}
