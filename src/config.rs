//! Runtime configuration derived from CLI arguments

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{parse_units_arg, Cli, CliError, Command};
use crate::data::weather::OPEN_WEATHER_BASE_URL;
use crate::refresh::RefreshConfig;
use crate::storage::FileStore;
use crate::units::UnitSystem;

/// Configuration for one run of the application
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OpenWeatherMap API key, if one was supplied
    pub api_key: Option<String>,
    /// Units used when printing readings
    pub units: UnitSystem,
    /// Weather API base URL
    pub weather_base_url: String,
    /// Where tracked locations are stored; `None` means the XDG data dir
    pub data_dir: Option<PathBuf>,
    /// Background refresh settings for `watch`
    pub refresh: RefreshConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            units: UnitSystem::Metric,
            weather_base_url: OPEN_WEATHER_BASE_URL.to_string(),
            data_dir: None,
            refresh: RefreshConfig::default(),
        }
    }
}

impl AppConfig {
    /// Creates an AppConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(AppConfig)` with the resolved settings
    /// * `Err(CliError)` if units are unknown, the interval is zero, or a
    ///   network command has no API key
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let units = parse_units_arg(&cli.units)?;

        let api_key = cli
            .api_key
            .as_ref()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        if api_key.is_none() && cli.command.needs_api_key() {
            return Err(CliError::MissingApiKey);
        }

        let mut refresh = RefreshConfig::default();
        if let Command::Watch { interval } = cli.command {
            if interval == 0 {
                return Err(CliError::InvalidInterval(interval));
            }
            refresh.interval = Duration::from_secs(interval);
        }

        Ok(Self {
            api_key,
            units,
            weather_base_url: cli
                .weather_url
                .clone()
                .unwrap_or_else(|| OPEN_WEATHER_BASE_URL.to_string()),
            data_dir: cli.data_dir.clone(),
            refresh,
        })
    }

    /// Opens the file store for tracked locations
    pub fn file_store(&self) -> FileStore {
        match &self.data_dir {
            Some(dir) => FileStore::with_dir(dir.clone()),
            None => FileStore::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(args)
    }

    #[test]
    fn test_config_default() {
        let config = AppConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.units, UnitSystem::Metric);
        assert_eq!(config.weather_base_url, OPEN_WEATHER_BASE_URL);
    }

    #[test]
    fn test_from_cli_reads_key_and_units() {
        let cli = parse(&["skycast", "--api-key", "abc", "--units", "imperial", "list"]);
        let config = AppConfig::from_cli(&cli).unwrap();

        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.units, UnitSystem::Imperial);
    }

    #[test]
    fn test_from_cli_missing_key_for_network_command() {
        let mut cli = parse(&["skycast", "refresh"]);
        cli.api_key = None;

        let result = AppConfig::from_cli(&cli);
        assert!(matches!(result, Err(CliError::MissingApiKey)));
    }

    #[test]
    fn test_from_cli_blank_key_counts_as_missing() {
        let cli = parse(&["skycast", "--api-key", "  ", "refresh"]);
        assert!(matches!(
            AppConfig::from_cli(&cli),
            Err(CliError::MissingApiKey)
        ));
    }

    #[test]
    fn test_from_cli_remove_without_key() {
        let mut cli = parse(&["skycast", "remove", "some-id"]);
        cli.api_key = None;

        assert!(AppConfig::from_cli(&cli).is_ok());
    }

    #[test]
    fn test_from_cli_invalid_units() {
        let cli = parse(&["skycast", "--api-key", "abc", "--units", "kelvin", "list"]);
        assert!(matches!(
            AppConfig::from_cli(&cli),
            Err(CliError::InvalidUnits(_))
        ));
    }

    #[test]
    fn test_from_cli_watch_interval() {
        let cli = parse(&["skycast", "--api-key", "abc", "watch", "--interval", "30"]);
        let config = AppConfig::from_cli(&cli).unwrap();
        assert_eq!(config.refresh.interval, Duration::from_secs(30));

        let zero = parse(&["skycast", "--api-key", "abc", "watch", "--interval", "0"]);
        assert!(matches!(
            AppConfig::from_cli(&zero),
            Err(CliError::InvalidInterval(0))
        ));
    }

    #[test]
    fn test_from_cli_data_dir_and_url_override() {
        let cli = parse(&[
            "skycast",
            "--api-key",
            "abc",
            "--data-dir",
            "/tmp/skycast-test",
            "--weather-url",
            "http://127.0.0.1:9999",
            "list",
        ]);
        let config = AppConfig::from_cli(&cli).unwrap();

        assert_eq!(config.weather_base_url, "http://127.0.0.1:9999");
        assert_eq!(
            config.file_store().data_dir(),
            Some(std::path::Path::new("/tmp/skycast-test"))
        );
    }
}
