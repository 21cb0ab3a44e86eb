//! Resolves "where is the user right now" into a named `Location`
//!
//! The resolver walks a strict fallback chain: a high-accuracy device fix,
//! then a low-accuracy fix, then IP geolocation. A device fix is named by
//! reverse geocoding, falling back to a coordinate label when the lookup
//! fails or takes too long.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::geocode::{IpLocator, IpPosition, ReverseGeocoder};
use crate::data::Location;

/// Default budget for the reverse lookup of a device fix
pub const REVERSE_GEOCODE_TIMEOUT: Duration = Duration::from_secs(5);

/// Options passed to a position source for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Ask for GPS-grade accuracy rather than a coarse network fix
    pub enable_high_accuracy: bool,
    /// How long to wait for a fix before giving up
    pub timeout: Duration,
    /// Age of a cached fix the caller is willing to accept
    pub maximum_age: Duration,
}

impl PositionOptions {
    /// First tier: precise fix, long timeout, accepts a fix up to 5 minutes old
    pub fn high_accuracy() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(15),
            maximum_age: Duration::from_secs(5 * 60),
        }
    }

    /// Second tier: coarse fix with a short timeout
    pub fn low_accuracy() -> Self {
        Self {
            enable_high_accuracy: false,
            timeout: Duration::from_secs(5),
            maximum_age: Duration::from_secs(10 * 60),
        }
    }
}

/// A device coordinate fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    /// Accuracy radius in meters, when the source reports one
    pub accuracy: Option<f64>,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            accuracy: None,
        }
    }
}

/// Why a device position request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    PositionUnavailable,

    #[error("timed out")]
    Timeout,
}

/// A provider of device positions
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, PositionError>;
}

/// A position source that always answers with the same fix, or with
/// `PositionUnavailable` when it has none
///
/// Used by the CLI, where `--lat/--lon` stand in for a device sensor.
#[derive(Debug, Clone, Default)]
pub struct FixedPositionSource {
    position: Option<Position>,
}

impl FixedPositionSource {
    pub fn new(position: Option<Position>) -> Self {
        Self { position }
    }
}

#[async_trait]
impl PositionSource for FixedPositionSource {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, PositionError> {
        self.position.ok_or(PositionError::PositionUnavailable)
    }
}

/// Every tier of the fallback chain failed
#[derive(Debug, Clone, PartialEq, Error)]
pub struct GeolocationError {
    pub high_accuracy: PositionError,
    pub low_accuracy: PositionError,
    /// Description of the IP lookup failure
    pub ip_lookup: String,
}

impl GeolocationError {
    fn causes(&self) -> [PositionError; 2] {
        [self.high_accuracy, self.low_accuracy]
    }

    /// Next step for the user, keyed off the most specific cause
    pub fn hint(&self) -> &'static str {
        if self.causes().contains(&PositionError::PermissionDenied) {
            "Allow location access in your system settings, or search for a city by name."
        } else if self.causes().contains(&PositionError::Timeout) {
            "Move somewhere with a clearer signal and try again, or search for a city by name."
        } else {
            "Location services could not find you. Search for a city by name instead."
        }
    }
}

impl fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unable to determine your location (high accuracy: {}; low accuracy: {}; IP lookup: {}). {}",
            self.high_accuracy,
            self.low_accuracy,
            self.ip_lookup,
            self.hint()
        )
    }
}

/// Coordinate label used when a fix has no place name
pub fn coordinate_label(lat: f64, lon: f64) -> String {
    format!("{:.2}, {:.2}", lat, lon)
}

/// Walks device tiers, reverse geocoding and IP fallback in order
pub struct GeolocationResolver<S, G, I> {
    source: S,
    geocoder: G,
    ip_locator: I,
    high: PositionOptions,
    low: PositionOptions,
    reverse_timeout: Duration,
}

impl<S, G, I> GeolocationResolver<S, G, I>
where
    S: PositionSource,
    G: ReverseGeocoder,
    I: IpLocator,
{
    pub fn new(source: S, geocoder: G, ip_locator: I) -> Self {
        Self {
            source,
            geocoder,
            ip_locator,
            high: PositionOptions::high_accuracy(),
            low: PositionOptions::low_accuracy(),
            reverse_timeout: REVERSE_GEOCODE_TIMEOUT,
        }
    }

    /// Overrides the options for both device tiers
    pub fn with_tiers(mut self, high: PositionOptions, low: PositionOptions) -> Self {
        self.high = high;
        self.low = low;
        self
    }

    /// Overrides the reverse lookup budget
    pub fn with_reverse_timeout(mut self, timeout: Duration) -> Self {
        self.reverse_timeout = timeout;
        self
    }

    /// Resolves the current location
    ///
    /// The returned location always has `is_current_location` set.
    pub async fn resolve(&self) -> Result<Location, GeolocationError> {
        let high_err = match self.request(&self.high).await {
            Ok(position) => return Ok(self.name_position(position).await),
            Err(e) => e,
        };
        debug!(cause = %high_err, "High accuracy position failed, trying low accuracy");

        let low_err = match self.request(&self.low).await {
            Ok(position) => return Ok(self.name_position(position).await),
            Err(e) => e,
        };
        warn!(cause = %low_err, "Device position unavailable, falling back to IP lookup");

        match self.ip_locator.locate().await {
            Ok(ip) => {
                info!(city = %ip.city, "Located via IP address");
                Ok(location_from_ip(ip))
            }
            Err(e) => Err(GeolocationError {
                high_accuracy: high_err,
                low_accuracy: low_err,
                ip_lookup: e.to_string(),
            }),
        }
    }

    async fn request(&self, options: &PositionOptions) -> Result<Position, PositionError> {
        match tokio::time::timeout(options.timeout, self.source.current_position(options)).await {
            Ok(result) => result,
            Err(_) => Err(PositionError::Timeout),
        }
    }

    async fn name_position(&self, position: Position) -> Location {
        let lookup = tokio::time::timeout(
            self.reverse_timeout,
            self.geocoder.reverse(position.lat, position.lon),
        )
        .await;

        let location = match lookup {
            Ok(Ok(place)) => {
                let location = Location::new(place.name, place.country, position.lat, position.lon);
                match place.state {
                    Some(state) => location.with_state(state),
                    None => location,
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Reverse geocoding failed, using coordinates as name");
                Location::new(coordinate_label(position.lat, position.lon), "", position.lat, position.lon)
            }
            Err(_) => {
                warn!("Reverse geocoding timed out, using coordinates as name");
                Location::new(coordinate_label(position.lat, position.lon), "", position.lat, position.lon)
            }
        };

        location.as_current()
    }
}

fn location_from_ip(ip: IpPosition) -> Location {
    let name = if ip.city.is_empty() {
        coordinate_label(ip.lat, ip.lon)
    } else {
        ip.city
    };
    let location = Location::new(name, ip.country, ip.lat, ip.lon).as_current();
    match ip.region {
        Some(region) if !region.is_empty() => location.with_state(region),
        _ => location,
    }
}
