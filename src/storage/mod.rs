//! Durable key-value storage and the favorite-location store built on it
//!
//! `KeyValueStore` is the small get/set/remove contract the rest of the
//! crate persists through. `FileStore` keeps one JSON file per key in the
//! XDG data directory and `MemoryStore` keeps everything in a map.

mod file_store;
mod location_store;
mod memory;

pub use file_store::FileStore;
pub use location_store::{LocationStore, LOCATIONS_KEY};
pub use memory::MemoryStore;

use thiserror::Error;

/// Errors raised by a backing store
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded for storage
    #[error("Failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A string key-value store
///
/// An unavailable store (no data directory, for instance) answers every
/// read with `None` and treats writes as no-ops.
pub trait KeyValueStore: Send {
    /// Whether the store has a usable backing medium
    fn is_available(&self) -> bool {
        true
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}
