//! Application state management for Skycast
//!
//! `WeatherState` is the single snapshot of tracked locations, the current
//! location, per-location weather and forecast caches, and the shared
//! loading/error slot. It only changes through [`reduce`]. The [`App`]
//! controller orchestrates the weather provider and the location store and
//! funnels every failure into the error slot instead of returning it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::Local;
use futures::future::{join_all, try_join};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::geocode::{IpLocator, ReverseGeocoder};
use crate::data::weather::SEARCH_RESULT_LIMIT;
use crate::data::{
    aggregate_daily, CitySearchResult, CurrentWeather, DailyForecast, Location, WeatherError,
    WeatherProvider,
};
use crate::geolocation::{GeolocationResolver, PositionSource};
use crate::storage::{KeyValueStore, LocationStore};

/// Stable error codes surfaced in [`AppError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Weather fetch for a known location failed
    FetchError,
    /// The validation fetch before tracking a location failed
    AddLocationError,
    SearchError,
    /// At least one location in a batch refresh failed
    RefreshError,
    ForecastError,
    /// Device tiers and the IP fallback were all exhausted
    GeolocationError,
    /// A location id is not tracked
    NotFound,
    /// Writing through to durable storage failed
    StorageError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FetchError => "FETCH_ERROR",
            ErrorCode::AddLocationError => "ADD_LOCATION_ERROR",
            ErrorCode::SearchError => "SEARCH_ERROR",
            ErrorCode::RefreshError => "REFRESH_ERROR",
            ErrorCode::ForecastError => "FORECAST_ERROR",
            ErrorCode::GeolocationError => "GEOLOCATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::StorageError => "STORAGE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-facing error held in the shared error slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppError {
    pub message: String,
    pub code: ErrorCode,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

/// Snapshot of everything the front end renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherState {
    /// Tracked locations in display order; ids are unique
    pub locations: Vec<Location>,
    /// Device- or IP-derived location, separate from the tracked set
    pub current_location: Option<Location>,
    /// Latest current conditions keyed by location id
    pub weather_data: HashMap<String, CurrentWeather>,
    /// Latest 7-day forecast keyed by location id
    pub forecast_data: HashMap<String, Vec<DailyForecast>>,
    /// True while any operation is in flight
    pub loading: bool,
    pub error: Option<AppError>,
}

impl WeatherState {
    /// Looks up a tracked location, or the current location, by id
    pub fn find_location(&self, id: &str) -> Option<&Location> {
        self.locations
            .iter()
            .chain(self.current_location.iter())
            .find(|l| l.id == id)
    }
}

/// State transitions accepted by [`reduce`]
#[derive(Debug, Clone)]
pub enum Action {
    SetLoading(bool),
    SetError(AppError),
    ClearError,
    /// Replaces the tracked set wholesale (hydration)
    SetLocations(Vec<Location>),
    /// Appends a location, or replaces the entry with the same id in place
    AddLocation(Location),
    /// Drops a location and both of its cache entries
    RemoveLocation(String),
    /// Replaces the current location, evicting the caches of an untracked predecessor
    SetCurrentLocation(Location),
    SetWeather {
        id: String,
        weather: CurrentWeather,
    },
    SetForecast {
        id: String,
        forecast: Vec<DailyForecast>,
    },
}

/// Applies one action to a state snapshot, returning the next snapshot
pub fn reduce(mut state: WeatherState, action: Action) -> WeatherState {
    match action {
        Action::SetLoading(loading) => state.loading = loading,
        Action::SetError(error) => state.error = Some(error),
        Action::ClearError => state.error = None,
        Action::SetLocations(locations) => {
            let mut seen = HashSet::new();
            state.locations = locations
                .into_iter()
                .filter(|l| seen.insert(l.id.clone()))
                .collect();
        }
        Action::AddLocation(location) => {
            match state.locations.iter_mut().find(|l| l.id == location.id) {
                Some(existing) => *existing = location,
                None => state.locations.push(location),
            }
        }
        Action::RemoveLocation(id) => {
            state.locations.retain(|l| l.id != id);
            state.weather_data.remove(&id);
            state.forecast_data.remove(&id);
        }
        Action::SetCurrentLocation(location) => {
            if let Some(previous) = state.current_location.take() {
                let tracked = state.locations.iter().any(|l| l.id == previous.id);
                if previous.id != location.id && !tracked {
                    state.weather_data.remove(&previous.id);
                    state.forecast_data.remove(&previous.id);
                }
            }
            state.current_location = Some(location);
        }
        Action::SetWeather { id, weather } => {
            state.weather_data.insert(id, weather);
        }
        Action::SetForecast { id, forecast } => {
            state.forecast_data.insert(id, forecast);
        }
    }
    state
}

/// Either a tracked location id or a resolved location
#[derive(Debug, Clone)]
pub enum LocationRef {
    Id(String),
    Location(Location),
}

impl From<&str> for LocationRef {
    fn from(id: &str) -> Self {
        LocationRef::Id(id.to_string())
    }
}

impl From<Location> for LocationRef {
    fn from(location: Location) -> Self {
        LocationRef::Location(location)
    }
}

/// Per-location result of a batch refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Ids whose caches were updated
    pub refreshed: Vec<String>,
    /// Ids whose fetch failed; their caches are untouched
    pub failed: Vec<String>,
}

/// Fetches current conditions and the aggregated forecast for one location
///
/// Issues exactly one current request and one forecast request.
async fn fetch_snapshot<P: WeatherProvider>(
    provider: &P,
    location: &Location,
) -> Result<(CurrentWeather, Vec<DailyForecast>), WeatherError> {
    location.validate()?;
    let (weather, intervals) = try_join(
        provider.current_weather(location.lat, location.lon),
        provider.five_day_forecast(location.lat, location.lon),
    )
    .await?;
    Ok((weather, aggregate_daily(&intervals, &Local)))
}

/// Main controller owning the state and its collaborators
pub struct App<P, S> {
    provider: P,
    store: LocationStore<S>,
    state: WeatherState,
}

impl<P: WeatherProvider, S: KeyValueStore> App<P, S> {
    /// Creates a controller with an empty state
    ///
    /// Call [`App::hydrate`] to load the persisted tracked set.
    pub fn new(provider: P, store: S) -> Self {
        Self {
            provider,
            store: LocationStore::new(store),
            state: WeatherState::default(),
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> &WeatherState {
        &self.state
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn location_store(&self) -> &LocationStore<S> {
        &self.store
    }

    fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    fn fail(&mut self, code: ErrorCode, message: impl Into<String>) {
        let error = AppError::new(code, message);
        warn!(code = %error.code, message = %error.message, "Operation failed");
        self.dispatch(Action::SetError(error));
    }

    fn store_snapshot(&mut self, id: String, weather: CurrentWeather, forecast: Vec<DailyForecast>) {
        self.dispatch(Action::SetWeather {
            id: id.clone(),
            weather,
        });
        self.dispatch(Action::SetForecast { id, forecast });
    }

    /// Seeds the tracked set from durable storage
    pub fn hydrate(&mut self) {
        let locations = self.store.get_locations();
        info!(count = locations.len(), "Loaded tracked locations");
        self.dispatch(Action::SetLocations(locations));
    }

    /// Starts tracking a location once its weather has been fetched
    ///
    /// Nothing is committed when the fetch fails. A location whose id is
    /// already tracked replaces that entry; one whose coordinates match a
    /// tracked entry refreshes that entry instead of adding a duplicate.
    /// Returns whether the location is now tracked.
    pub async fn add_location(&mut self, location: Location) -> bool {
        self.dispatch(Action::SetLoading(true));
        let result = fetch_snapshot(&self.provider, &location).await;
        self.dispatch(Action::SetLoading(false));

        let (weather, forecast) = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.fail(
                    ErrorCode::AddLocationError,
                    format!("Could not add {}: {}", location.display_name(), e.user_message()),
                );
                return false;
            }
        };

        let duplicate = self
            .state
            .locations
            .iter()
            .find(|l| l.id != location.id && l.same_coordinates(&location))
            .map(|l| l.id.clone());
        if let Some(existing_id) = duplicate {
            debug!(id = %existing_id, "Location already tracked at these coordinates");
            self.store_snapshot(existing_id, weather, forecast);
            return true;
        }

        if let Err(e) = self.store.add_location(&location) {
            self.fail(
                ErrorCode::StorageError,
                format!("{} was added but could not be saved: {}", location.name, e),
            );
        }

        info!(id = %location.id, name = %location.name, "Tracking location");
        let id = location.id.clone();
        self.dispatch(Action::AddLocation(location));
        self.store_snapshot(id, weather, forecast);
        true
    }

    /// Stops tracking a location and purges its cached weather and forecast
    ///
    /// Removing an unknown id is a no-op.
    pub fn remove_location(&mut self, id: &str) {
        if let Err(e) = self.store.remove_location(id) {
            self.fail(
                ErrorCode::StorageError,
                format!("Could not update saved locations: {}", e),
            );
        }
        self.dispatch(Action::RemoveLocation(id.to_string()));
    }

    /// Searches cities by name
    ///
    /// A blank query returns nothing without touching the network. Errors
    /// are recorded in the state and yield an empty list.
    pub async fn search_cities(&mut self, query: &str) -> Vec<CitySearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        self.dispatch(Action::SetLoading(true));
        let result = self.provider.search_cities(query).await;
        self.dispatch(Action::SetLoading(false));

        match result {
            Ok(mut results) => {
                results.truncate(SEARCH_RESULT_LIMIT);
                results
            }
            Err(e) => {
                self.fail(ErrorCode::SearchError, e.user_message());
                Vec::new()
            }
        }
    }

    /// Refreshes every tracked location and the current location
    ///
    /// Fetches run concurrently and settle independently: successes update
    /// their caches even when others fail. The tracked set never changes.
    pub async fn refresh_all_weather(&mut self) -> RefreshOutcome {
        let mut seen = HashSet::new();
        let targets: Vec<Location> = self
            .state
            .locations
            .iter()
            .chain(self.state.current_location.iter())
            .filter(|l| seen.insert(l.id.clone()))
            .cloned()
            .collect();

        let mut outcome = RefreshOutcome::default();
        if targets.is_empty() {
            return outcome;
        }

        self.dispatch(Action::SetLoading(true));
        let provider = &self.provider;
        let results = join_all(targets.iter().map(|l| fetch_snapshot(provider, l))).await;

        let mut first_error: Option<WeatherError> = None;
        for (location, result) in targets.into_iter().zip(results) {
            match result {
                Ok((weather, forecast)) => {
                    self.store_snapshot(location.id.clone(), weather, forecast);
                    outcome.refreshed.push(location.id);
                }
                Err(e) => {
                    warn!(id = %location.id, error = %e, "Refresh failed for location");
                    first_error.get_or_insert(e);
                    outcome.failed.push(location.id);
                }
            }
        }

        if let Some(e) = first_error {
            let total = outcome.refreshed.len() + outcome.failed.len();
            self.fail(
                ErrorCode::RefreshError,
                format!(
                    "Could not refresh {} of {} locations. {}",
                    outcome.failed.len(),
                    total,
                    e.user_message()
                ),
            );
        }
        self.dispatch(Action::SetLoading(false));
        outcome
    }

    /// Refreshes one location's weather and forecast
    ///
    /// On failure the previous cache entries are left untouched.
    pub async fn fetch_weather(&mut self, location: &Location) -> Option<CurrentWeather> {
        self.dispatch(Action::SetLoading(true));
        let result = fetch_snapshot(&self.provider, location).await;
        self.dispatch(Action::SetLoading(false));

        match result {
            Ok((weather, forecast)) => {
                self.store_snapshot(location.id.clone(), weather.clone(), forecast);
                Some(weather)
            }
            Err(e) => {
                self.fail(ErrorCode::FetchError, e.user_message());
                None
            }
        }
    }

    /// Fetches, aggregates and caches the 7-day forecast
    ///
    /// An id must name a tracked location (or the current location);
    /// otherwise the error slot gets `NOT_FOUND`.
    pub async fn get_forecast(&mut self, target: impl Into<LocationRef>) -> Option<Vec<DailyForecast>> {
        let location = match target.into() {
            LocationRef::Location(location) => location,
            LocationRef::Id(id) => match self.state.find_location(&id) {
                Some(location) => location.clone(),
                None => {
                    self.fail(ErrorCode::NotFound, format!("Location {} is not tracked", id));
                    return None;
                }
            },
        };

        if let Err(e) = location.validate() {
            self.fail(ErrorCode::ForecastError, format!("{}.", e));
            return None;
        }

        self.dispatch(Action::SetLoading(true));
        let result = self.provider.five_day_forecast(location.lat, location.lon).await;
        self.dispatch(Action::SetLoading(false));

        match result {
            Ok(intervals) => {
                let forecast = aggregate_daily(&intervals, &Local);
                self.dispatch(Action::SetForecast {
                    id: location.id.clone(),
                    forecast: forecast.clone(),
                });
                Some(forecast)
            }
            Err(e) => {
                self.fail(ErrorCode::ForecastError, e.user_message());
                None
            }
        }
    }

    /// Records a geolocation-derived location as the current location
    pub fn set_current_location(&mut self, location: Location) {
        self.dispatch(Action::SetCurrentLocation(location.as_current()));
    }

    /// Resolves the current location and fetches its weather
    ///
    /// Failure of every geolocation tier is recorded as `GEOLOCATION_ERROR`.
    pub async fn locate_current<D, G, I>(
        &mut self,
        resolver: &GeolocationResolver<D, G, I>,
    ) -> Option<Location>
    where
        D: PositionSource,
        G: ReverseGeocoder,
        I: IpLocator,
    {
        self.dispatch(Action::SetLoading(true));
        let result = resolver.resolve().await;
        self.dispatch(Action::SetLoading(false));

        match result {
            Ok(location) => {
                info!(name = %location.name, "Resolved current location");
                self.set_current_location(location.clone());
                self.fetch_weather(&location).await;
                Some(location)
            }
            Err(e) => {
                self.fail(ErrorCode::GeolocationError, e.to_string());
                None
            }
        }
    }

    /// Clears the shared error slot
    pub fn clear_error(&mut self) {
        self.dispatch(Action::ClearError);
    }
}
