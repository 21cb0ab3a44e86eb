//! Favorite locations persisted under a single key

use tracing::warn;

use super::{KeyValueStore, StorageError};
use crate::data::Location;

/// Key the location list is stored under
pub const LOCATIONS_KEY: &str = "weather_locations";

/// Reads and writes the tracked-location list as a JSON array
///
/// Reads never fail: missing or malformed data is an empty list. Every
/// operation is a no-op when the backing store is unavailable.
#[derive(Debug, Clone)]
pub struct LocationStore<S> {
    store: S,
}

impl<S: KeyValueStore> LocationStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The backing key-value store
    pub fn backend(&self) -> &S {
        &self.store
    }

    /// Loads the stored locations in insertion order
    pub fn get_locations(&self) -> Vec<Location> {
        if !self.store.is_available() {
            return Vec::new();
        }

        let raw = match self.store.get_item(LOCATIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored locations");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(locations) => locations,
            Err(e) => {
                warn!(error = %e, "Stored locations are malformed, ignoring them");
                Vec::new()
            }
        }
    }

    /// Appends a location unless another entry has the same coordinates
    ///
    /// A stored entry with the same id is replaced in place. Returns
    /// whether the stored list changed.
    pub fn add_location(&mut self, location: &Location) -> Result<bool, StorageError> {
        if !self.store.is_available() {
            return Ok(false);
        }

        let mut locations = self.get_locations();
        if let Some(existing) = locations.iter_mut().find(|l| l.id == location.id) {
            if *existing == *location {
                return Ok(false);
            }
            *existing = location.clone();
        } else if locations.iter().any(|l| l.same_coordinates(location)) {
            return Ok(false);
        } else {
            locations.push(location.clone());
        }
        self.save(&locations)?;
        Ok(true)
    }

    /// Removes the location with the given id; unknown ids are ignored
    pub fn remove_location(&mut self, id: &str) -> Result<(), StorageError> {
        if !self.store.is_available() {
            return Ok(());
        }

        let mut locations = self.get_locations();
        let before = locations.len();
        locations.retain(|l| l.id != id);
        if locations.len() == before {
            return Ok(());
        }
        self.save(&locations)
    }

    /// Drops the whole stored list
    pub fn clear(&mut self) -> Result<(), StorageError> {
        if !self.store.is_available() {
            return Ok(());
        }
        self.store.remove_item(LOCATIONS_KEY)
    }

    fn save(&mut self, locations: &[Location]) -> Result<(), StorageError> {
        let json = serde_json::to_string(locations)?;
        self.store.set_item(LOCATIONS_KEY, &json)
    }
}
