//! Unit conversion for weather readings
//!
//! All readings are stored in metric base units (°C, km/h, hPa, meters) and
//! converted to the user's preferred unit system only when displayed.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unit system used for displaying weather values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Celsius, km/h, hPa, kilometers
    #[default]
    Metric,
    /// Fahrenheit, mph, inHg, miles
    Imperial,
}

/// The name does not match a known unit system
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown unit system '{0}'")]
pub struct UnknownUnitSystem(pub String);

impl FromStr for UnitSystem {
    type Err = UnknownUnitSystem;

    /// Parses a unit system name (case-insensitive)
    ///
    /// Accepts "metric"/"m" and "imperial"/"i"/"us".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metric" | "m" => Ok(Self::Metric),
            "imperial" | "i" | "us" => Ok(Self::Imperial),
            _ => Err(UnknownUnitSystem(s.to_string())),
        }
    }
}

impl UnitSystem {

    /// Temperature unit suffix
    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
        }
    }

    /// Speed unit suffix
    pub fn speed_suffix(&self) -> &'static str {
        match self {
            Self::Metric => "km/h",
            Self::Imperial => "mph",
        }
    }

    /// Pressure unit suffix
    pub fn pressure_suffix(&self) -> &'static str {
        match self {
            Self::Metric => "hPa",
            Self::Imperial => "inHg",
        }
    }

    /// Distance unit suffix
    pub fn distance_suffix(&self) -> &'static str {
        match self {
            Self::Metric => "km",
            Self::Imperial => "mi",
        }
    }
}

const KMH_PER_MPH: f64 = 1.609_344;
const HPA_PER_INHG: f64 = 33.863_886;
const METERS_PER_MILE: f64 = 1_609.344;

/// Converts a temperature in °C to the target unit system
pub fn convert_temperature(celsius: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => celsius,
        UnitSystem::Imperial => celsius * 9.0 / 5.0 + 32.0,
    }
}

/// Converts a speed in km/h to the target unit system
pub fn convert_speed(kmh: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => kmh,
        UnitSystem::Imperial => kmh / KMH_PER_MPH,
    }
}

/// Converts a pressure in hPa to the target unit system
pub fn convert_pressure(hpa: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => hpa,
        UnitSystem::Imperial => hpa / HPA_PER_INHG,
    }
}

/// Converts a distance in meters to kilometers or miles
pub fn convert_distance(meters: f64, units: UnitSystem) -> f64 {
    match units {
        UnitSystem::Metric => meters / 1_000.0,
        UnitSystem::Imperial => meters / METERS_PER_MILE,
    }
}

/// Converts a wind speed reported by the provider in m/s to km/h
pub fn meters_per_second_to_kmh(ms: f64) -> f64 {
    ms * 3.6
}

/// Formats a temperature rounded to a whole degree, e.g. "22°C"
pub fn format_temperature(celsius: f64, units: UnitSystem) -> String {
    format!(
        "{:.0}{}",
        convert_temperature(celsius, units),
        units.temperature_suffix()
    )
}

/// Formats a wind speed given in km/h, e.g. "12 km/h"
pub fn format_speed(kmh: f64, units: UnitSystem) -> String {
    format!("{:.0} {}", convert_speed(kmh, units), units.speed_suffix())
}

/// Formats a pressure given in hPa
pub fn format_pressure(hpa: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Metric => format!("{:.0} {}", hpa, units.pressure_suffix()),
        UnitSystem::Imperial => format!(
            "{:.2} {}",
            convert_pressure(hpa, units),
            units.pressure_suffix()
        ),
    }
}

/// Formats a visibility given in meters
pub fn format_distance(meters: f64, units: UnitSystem) -> String {
    format!(
        "{:.1} {}",
        convert_distance(meters, units),
        units.distance_suffix()
    )
}

/// Maps a wind direction in degrees to a 16-point compass label
pub fn wind_direction_to_cardinal(degrees: u16) -> &'static str {
    const POINTS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    let index = ((f64::from(degrees % 360) / 22.5).round() as usize) % 16;
    POINTS[index]
}
