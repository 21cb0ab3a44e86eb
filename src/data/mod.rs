//! Core data models for Skycast
//!
//! This module contains the data types used throughout the application for
//! representing tracked locations, current conditions and forecasts, along
//! with the API clients that produce them.

pub mod forecast;
pub mod geocode;
pub mod weather;

pub use forecast::{aggregate_daily, FORECAST_DAYS};
pub use geocode::{IpApiClient, IpLocator, NominatimClient, ReverseGeocoder};
pub use weather::{WeatherClient, WeatherError, WeatherProvider};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when validating a location's coordinates
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    /// Latitude is NaN, infinite or outside [-90, 90]
    #[error("Invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude is NaN, infinite or outside [-180, 180]
    #[error("Invalid longitude: {0}")]
    InvalidLongitude(f64),
}

/// Checks that a coordinate pair is finite and in range
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), CoordinateError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(CoordinateError::InvalidLatitude(lat));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(CoordinateError::InvalidLongitude(lon));
    }
    Ok(())
}

/// A named geographic point tracked by the user
///
/// Locations are never patched in place: a changed location is a new value
/// that replaces the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Opaque unique identifier, assigned at creation
    pub id: String,
    /// Display name (city or place)
    pub name: String,
    /// Country code or name
    pub country: String,
    /// State or region, when the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Whether this location was derived from the device/IP position
    #[serde(default)]
    pub is_current_location: bool,
}

impl Location {
    /// Creates a location with a freshly generated id
    pub fn new(name: impl Into<String>, country: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            country: country.into(),
            state: None,
            lat,
            lon,
            is_current_location: false,
        }
    }

    /// Sets the state/region
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Marks the location as the device-derived current location
    pub fn as_current(mut self) -> Self {
        self.is_current_location = true;
        self
    }

    /// Validates that the coordinates are finite and in range
    pub fn validate(&self) -> Result<(), CoordinateError> {
        validate_coordinates(self.lat, self.lon)
    }

    /// Human-readable label such as "Portland, Oregon, US"
    pub fn display_name(&self) -> String {
        match &self.state {
            Some(state) if !state.is_empty() => {
                format!("{}, {}, {}", self.name, state, self.country)
            }
            _ if self.country.is_empty() => self.name.clone(),
            _ => format!("{}, {}", self.name, self.country),
        }
    }

    /// Whether two locations share the same coordinate pair
    pub fn same_coordinates(&self, other: &Location) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }
}

/// Primary weather condition as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherCondition {
    /// Provider condition id (e.g. 500 for light rain)
    pub id: u16,
    /// Condition group (e.g. "Rain")
    pub main: String,
    /// Longer description (e.g. "light rain")
    pub description: String,
    /// Provider icon code (e.g. "10d")
    pub icon: String,
}

/// A single point-in-time reading for one location
///
/// Temperatures are in °C, pressure in hPa, wind speed in m/s as delivered
/// by the provider and visibility in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Place name reported by the provider
    pub name: String,
    /// Country code reported by the provider
    pub country: String,
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    pub pressure: f64,
    pub wind_speed: f64,
    /// Wind direction in degrees
    pub wind_deg: u16,
    pub visibility: u32,
    /// Cloud cover percentage (0-100)
    pub clouds: u8,
    pub condition: WeatherCondition,
    /// Sunrise, epoch seconds
    pub sunrise: i64,
    /// Sunset, epoch seconds
    pub sunset: i64,
    /// Observation time, epoch seconds
    pub dt: i64,
}

/// One raw 3-hour sample from the provider's forecast feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastInterval {
    /// Sample time, epoch seconds
    pub dt: i64,
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub pressure: f64,
    pub condition: WeatherCondition,
    pub wind_speed: f64,
    pub wind_deg: u16,
    /// Probability of precipitation as a 0-1 fraction
    pub pop: f64,
    /// Rain accumulation over the 3-hour window in mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain_3h: Option<f64>,
    /// Snow accumulation over the 3-hour window in mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snow_3h: Option<f64>,
}

/// One aggregated calendar day derived from forecast intervals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    /// Local calendar date, serialized as YYYY-MM-DD
    pub date: NaiveDate,
    /// Short weekday name, e.g. "Mon"
    pub day_of_week: String,
    #[serde(rename = "temp_max")]
    pub temp_max: f64,
    #[serde(rename = "temp_min")]
    pub temp_min: f64,
    /// Representative condition (first interval of the day)
    pub weather: WeatherCondition,
    /// Mean probability of precipitation as a whole percentage (0-100)
    pub pop: u8,
    /// Summed rain in mm, omitted when none fell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain: Option<f64>,
    /// Summed snow in mm, omitted when none fell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snow: Option<f64>,
    /// True when the day was synthesized because the feed did not cover it
    #[serde(default)]
    pub estimated: bool,
}

/// A city search hit: the resolved location plus its current conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySearchResult {
    pub location: Location,
    pub weather: CurrentWeather,
}
