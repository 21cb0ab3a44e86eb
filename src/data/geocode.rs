//! Reverse geocoding and IP geolocation clients
//!
//! Reverse lookups use Nominatim (OpenStreetMap) and IP lookups use
//! ip-api.com. Both are free and need no API key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const IP_API_BASE_URL: &str = "http://ip-api.com";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("skycast/", env!("CARGO_PKG_VERSION"));

/// Errors from the geocoding and IP lookup services
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with an error status
    #[error("Unexpected HTTP status: {0}")]
    HttpStatus(u16),

    /// Failed to parse the response body
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// The service had no answer for this input
    #[error("No result: {0}")]
    NotFound(String),
}

/// A named place returned by a reverse lookup
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
}

/// A coordinate derived from the caller's public IP address
#[derive(Debug, Clone, PartialEq)]
pub struct IpPosition {
    pub lat: f64,
    pub lon: f64,
    pub city: String,
    pub region: Option<String>,
    pub country: String,
}

/// Turns a coordinate into the nearest named place
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Place, GeocodeError>;
}

/// Locates the caller from their IP address
#[async_trait]
pub trait IpLocator: Send + Sync {
    async fn locate(&self) -> Result<IpPosition, GeocodeError>;
}

fn build_http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country_code: Option<String>,
    country: Option<String>,
}

impl NominatimAddress {
    /// Prefers city > town > village > municipality > county for the name
    fn into_place(self) -> Option<Place> {
        let name = self
            .city
            .or(self.town)
            .or(self.village)
            .or(self.municipality)
            .or(self.county)
            .or_else(|| self.state.clone())?;

        let country = self
            .country_code
            .map(|c| c.to_uppercase())
            .or(self.country)
            .unwrap_or_default();

        let state = self.state.filter(|s| !s.is_empty() && *s != name);

        Some(Place {
            name,
            country,
            state,
        })
    }
}

/// Nominatim reverse geocoding client
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: String,
}

impl Default for NominatimClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NominatimClient {
    pub fn new() -> Self {
        Self {
            client: build_http_client(),
            base_url: NOMINATIM_BASE_URL.to_string(),
        }
    }

    /// Override the service base URL (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    #[instrument(level = "debug", skip(self))]
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Place, GeocodeError> {
        let response = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("zoom", "10".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::HttpStatus(response.status().as_u16()));
        }

        let text = response.text().await?;
        let body: NominatimResponse = serde_json::from_str(&text)?;
        if let Some(error) = body.error {
            return Err(GeocodeError::NotFound(error));
        }

        let place = body
            .address
            .and_then(NominatimAddress::into_place)
            .ok_or_else(|| GeocodeError::NotFound(format!("{lat:.4}, {lon:.4}")))?;

        info!(place = %place.name, "Reverse geocoded position");
        Ok(place)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    city: String,
    region_name: Option<String>,
    #[serde(default)]
    country_code: String,
}

/// ip-api.com IP geolocation client
#[derive(Debug, Clone)]
pub struct IpApiClient {
    client: Client,
    base_url: String,
}

impl Default for IpApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl IpApiClient {
    pub fn new() -> Self {
        Self {
            client: build_http_client(),
            base_url: IP_API_BASE_URL.to_string(),
        }
    }

    /// Override the service base URL (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl IpLocator for IpApiClient {
    #[instrument(level = "debug", skip(self))]
    async fn locate(&self) -> Result<IpPosition, GeocodeError> {
        let response = self
            .client
            .get(format!("{}/json", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::HttpStatus(response.status().as_u16()));
        }

        let text = response.text().await?;
        let body: IpApiResponse = serde_json::from_str(&text)?;

        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(lat), Some(lon)) => {
                debug!(lat, lon, city = %body.city, "IP geolocation succeeded");
                Ok(IpPosition {
                    lat,
                    lon,
                    city: body.city,
                    region: body.region_name,
                    country: body.country_code,
                })
            }
            _ => Err(GeocodeError::NotFound(
                body.message
                    .unwrap_or_else(|| "IP lookup returned no position".to_string()),
            )),
        }
    }
}
