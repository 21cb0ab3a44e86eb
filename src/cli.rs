//! Command-line interface parsing for Skycast
//!
//! This module defines the clap-derived argument structure: global options
//! for the API key, display units and data directory, plus one subcommand
//! per controller operation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::units::UnitSystem;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified unit system is not recognized
    #[error("Invalid units: '{0}'. Valid units: metric, imperial")]
    InvalidUnits(String),

    /// A network command was run without an API key
    #[error("No OpenWeatherMap API key. Pass --api-key or set OPENWEATHER_API_KEY")]
    MissingApiKey,

    /// The refresh interval must be at least one second
    #[error("Invalid refresh interval: {0} seconds")]
    InvalidInterval(u64),
}

/// Skycast - current conditions and 7-day forecasts for your favorite places
#[derive(Parser, Debug)]
#[command(name = "skycast")]
#[command(about = "Current conditions and 7-day forecasts for your favorite places")]
#[command(version)]
pub struct Cli {
    /// OpenWeatherMap API key
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Display units: metric or imperial
    #[arg(long, short = 'u', default_value = "metric", global = true)]
    pub units: String,

    /// Directory where tracked locations are stored
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the weather API base URL
    #[arg(long, env = "SKYCAST_WEATHER_URL", hide = true, global = true)]
    pub weather_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show tracked locations with their current conditions
    List,

    /// Search for cities by name
    ///
    /// Examples:
    ///   skycast search paris
    ///   skycast search new york
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Search for a city and start tracking it
    Add {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Which search result to add (1-based)
        #[arg(long, default_value_t = 1)]
        pick: usize,
    },

    /// Stop tracking a location
    Remove {
        /// Location id as shown by `skycast list`
        id: String,
    },

    /// Show the 7-day forecast for a tracked location
    Forecast {
        /// Location id as shown by `skycast list`
        id: String,
    },

    /// Refresh weather for every tracked location
    Refresh,

    /// Resolve your current location
    ///
    /// Uses --lat/--lon as the device position when given, otherwise falls
    /// back to IP geolocation.
    Locate {
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Also track the resolved location
        #[arg(long)]
        save: bool,
    },

    /// Keep refreshing tracked locations until interrupted
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value_t = 600)]
        interval: u64,
    },
}

impl Command {
    /// Whether the command talks to the weather API
    pub fn needs_api_key(&self) -> bool {
        !matches!(self, Command::Remove { .. })
    }
}

/// Parses a units string argument into a UnitSystem
///
/// # Returns
/// * `Ok(UnitSystem)` if the string matches a known unit system
/// * `Err(CliError::InvalidUnits)` if it doesn't
pub fn parse_units_arg(s: &str) -> Result<UnitSystem, CliError> {
    s.parse().map_err(|_| CliError::InvalidUnits(s.to_string()))
}
