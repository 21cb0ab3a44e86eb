//! OpenWeatherMap API client
//!
//! This module provides functionality to fetch current conditions, the
//! 5-day/3-hour forecast and city search results from the OpenWeatherMap API
//! and parse them into our data structures.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{
    validate_coordinates, CitySearchResult, CoordinateError, CurrentWeather, ForecastInterval,
    Location, WeatherCondition,
};

/// Base URL for the OpenWeatherMap API
pub const OPEN_WEATHER_BASE_URL: &str = "https://api.openweathermap.org";

/// Maximum number of city candidates requested from the geocoder
pub const SEARCH_RESULT_LIMIT: usize = 5;

/// Visibility reported when the provider omits it (the API's own cap)
const DEFAULT_VISIBILITY_METERS: u32 = 10_000;

/// Errors that can occur when talking to the weather provider
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The API key was rejected (HTTP 401)
    #[error("Invalid API key")]
    InvalidKey,

    /// Too many requests (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The request could not be completed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider answered with an unexpected status
    #[error("Unexpected HTTP status: {0}")]
    HttpStatus(u16),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),

    /// Coordinates were rejected before any request was made
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(#[from] CoordinateError),
}

impl WeatherError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::InvalidKey => {
                "Invalid API key. Please check your OpenWeatherMap API key.".to_string()
            }
            WeatherError::RateLimited => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            WeatherError::Network(_) => {
                "Network error. Please check your internet connection.".to_string()
            }
            WeatherError::HttpStatus(code) => {
                format!("The weather service returned an error (HTTP {}).", code)
            }
            WeatherError::ParseError(_) | WeatherError::MissingField(_) => {
                "The weather service returned data we could not read.".to_string()
            }
            WeatherError::InvalidCoordinates(e) => format!("{}.", e),
        }
    }
}

/// Source of current conditions, forecasts and city search
///
/// Implemented by [`WeatherClient`] and by test fakes.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions at a coordinate
    async fn current_weather(&self, lat: f64, lon: f64) -> Result<CurrentWeather, WeatherError>;

    /// Raw 3-hour forecast intervals covering the next five days
    async fn five_day_forecast(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<ForecastInterval>, WeatherError>;

    /// Geocodes a city name and fetches current conditions for each hit
    async fn search_cities(&self, query: &str) -> Result<Vec<CitySearchResult>, WeatherError>;
}

/// Client for fetching weather data from the OpenWeatherMap API
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl WeatherClient {
    /// Create a new WeatherClient for the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self::with_client(client, api_key)
    }

    /// Create a new WeatherClient with a custom HTTP client
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: OPEN_WEATHER_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (for testing or a proxy)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch current weather for the given coordinates
    ///
    /// # Arguments
    /// * `lat` - Latitude coordinate
    /// * `lon` - Longitude coordinate
    ///
    /// # Returns
    /// * `Ok(CurrentWeather)` - Current conditions for the location
    /// * `Err(WeatherError)` - If the request or parsing fails
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_current(&self, lat: f64, lon: f64) -> Result<CurrentWeather, WeatherError> {
        validate_coordinates(lat, lon)?;

        let url = format!("{}/data/2.5/weather", self.base_url);
        let text = self
            .get_text(&url, &[("lat", lat.to_string()), ("lon", lon.to_string())])
            .await?;
        let response: CurrentResponse = serde_json::from_str(&text)?;

        parse_current(response)
    }

    /// Fetch the 5-day/3-hour forecast for the given coordinates
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_forecast(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<ForecastInterval>, WeatherError> {
        validate_coordinates(lat, lon)?;

        let url = format!("{}/data/2.5/forecast", self.base_url);
        let text = self
            .get_text(&url, &[("lat", lat.to_string()), ("lon", lon.to_string())])
            .await?;
        let response: ForecastResponse = serde_json::from_str(&text)?;

        let intervals = parse_forecast(response)?;
        debug!(count = intervals.len(), "Fetched forecast intervals");
        Ok(intervals)
    }

    /// Search for cities by name and fetch current weather for each match
    ///
    /// Candidates whose weather fetch fails are skipped. If every candidate
    /// fails, the first error is returned.
    #[instrument(level = "debug", skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<CitySearchResult>, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/geo/1.0/direct", self.base_url);
        let text = self
            .get_text(
                &url,
                &[
                    ("q", query.to_string()),
                    ("limit", SEARCH_RESULT_LIMIT.to_string()),
                ],
            )
            .await?;
        let candidates: Vec<GeocodingEntry> = serde_json::from_str(&text)?;

        let locations: Vec<Location> = candidates
            .into_iter()
            .take(SEARCH_RESULT_LIMIT)
            .map(GeocodingEntry::into_location)
            .collect();

        let weather_results =
            join_all(locations.iter().map(|l| self.fetch_current(l.lat, l.lon))).await;

        let mut results = Vec::with_capacity(locations.len());
        let mut first_error = None;
        for (location, weather) in locations.into_iter().zip(weather_results) {
            match weather {
                Ok(weather) => results.push(CitySearchResult { location, weather }),
                Err(e) => {
                    warn!(city = %location.name, error = %e, "Skipping search result");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if results.is_empty() => Err(e),
            _ => Ok(results),
        }
    }

    /// Issues a GET with the shared query parameters and maps error statuses
    async fn get_text(&self, url: &str, params: &[(&str, String)]) -> Result<String, WeatherError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .query(&[("units", "metric"), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(WeatherError::InvalidKey),
            StatusCode::TOO_MANY_REQUESTS => Err(WeatherError::RateLimited),
            status if !status.is_success() => Err(WeatherError::HttpStatus(status.as_u16())),
            _ => Ok(response.text().await?),
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherClient {
    async fn current_weather(&self, lat: f64, lon: f64) -> Result<CurrentWeather, WeatherError> {
        self.fetch_current(lat, lon).await
    }

    async fn five_day_forecast(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<ForecastInterval>, WeatherError> {
        self.fetch_forecast(lat, lon).await
    }

    async fn search_cities(&self, query: &str) -> Result<Vec<CitySearchResult>, WeatherError> {
        self.search(query).await
    }
}

/// Converts the current-conditions response into a CurrentWeather
fn parse_current(response: CurrentResponse) -> Result<CurrentWeather, WeatherError> {
    let condition = first_condition(response.weather)?;

    Ok(CurrentWeather {
        name: response.name,
        country: response.sys.country.unwrap_or_default(),
        temp: response.main.temp,
        feels_like: response.main.feels_like,
        temp_min: response.main.temp_min,
        temp_max: response.main.temp_max,
        humidity: response.main.humidity,
        pressure: response.main.pressure,
        wind_speed: response.wind.speed,
        wind_deg: response.wind.deg,
        visibility: response.visibility.unwrap_or(DEFAULT_VISIBILITY_METERS),
        clouds: response.clouds.all,
        condition,
        sunrise: response.sys.sunrise.unwrap_or_default(),
        sunset: response.sys.sunset.unwrap_or_default(),
        dt: response.dt,
    })
}

/// Converts the forecast response into ForecastIntervals
fn parse_forecast(response: ForecastResponse) -> Result<Vec<ForecastInterval>, WeatherError> {
    response
        .list
        .into_iter()
        .map(|item| {
            Ok(ForecastInterval {
                dt: item.dt,
                temp: item.main.temp,
                temp_min: item.main.temp_min,
                temp_max: item.main.temp_max,
                humidity: item.main.humidity,
                pressure: item.main.pressure,
                condition: first_condition(item.weather)?,
                wind_speed: item.wind.speed,
                wind_deg: item.wind.deg,
                pop: item.pop,
                rain_3h: item.rain.and_then(|r| r.three_hour),
                snow_3h: item.snow.and_then(|s| s.three_hour),
            })
        })
        .collect()
}

fn first_condition(weather: Vec<ConditionEntry>) -> Result<WeatherCondition, WeatherError> {
    weather
        .into_iter()
        .next()
        .map(|w| WeatherCondition {
            id: w.id,
            main: w.main,
            description: w.description,
            icon: w.icon,
        })
        .ok_or_else(|| WeatherError::MissingField("weather".to_string()))
}

/// Condition entry shared by current and forecast responses
#[derive(Debug, Deserialize)]
struct ConditionEntry {
    id: u16,
    main: String,
    description: String,
    icon: String,
}

/// Temperature/pressure/humidity block
#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
    #[serde(default)]
    deg: u16,
}

#[derive(Debug, Default, Deserialize)]
struct CloudsBlock {
    #[serde(default)]
    all: u8,
}

#[derive(Debug, Deserialize)]
struct SysBlock {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

/// Current weather response from /data/2.5/weather
#[derive(Debug, Deserialize)]
struct CurrentResponse {
    weather: Vec<ConditionEntry>,
    main: MainBlock,
    visibility: Option<u32>,
    wind: WindBlock,
    #[serde(default)]
    clouds: CloudsBlock,
    dt: i64,
    sys: SysBlock,
    #[serde(default)]
    name: String,
}

/// Precipitation volume block, keyed "3h" in the forecast feed
#[derive(Debug, Deserialize)]
struct PrecipitationBlock {
    #[serde(rename = "3h")]
    three_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt: i64,
    main: MainBlock,
    weather: Vec<ConditionEntry>,
    wind: WindBlock,
    #[serde(default)]
    pop: f64,
    rain: Option<PrecipitationBlock>,
    snow: Option<PrecipitationBlock>,
}

/// Forecast response from /data/2.5/forecast
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastItem>,
}

/// Candidate from /geo/1.0/direct
#[derive(Debug, Deserialize)]
struct GeocodingEntry {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: String,
    state: Option<String>,
}

impl GeocodingEntry {
    fn into_location(self) -> Location {
        let location = Location::new(self.name, self.country, self.lat, self.lon);
        match self.state {
            Some(state) => location.with_state(state),
            None => location,
        }
    }
}
