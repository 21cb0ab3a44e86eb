//! File-backed key-value store
//!
//! Each key is stored as `<key>.json` inside the data directory.

use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{KeyValueStore, StorageError};

/// Stores each key as a file in an XDG-compliant data directory
///
/// Uses `~/.local/share/skycast/` on Linux. When no directory can be
/// determined the store is unavailable: reads return `None` and writes
/// are dropped.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where value files are stored
    data_dir: Option<PathBuf>,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore {
    /// Creates a FileStore in the platform data directory
    pub fn new() -> Self {
        let data_dir = ProjectDirs::from("", "", "skycast").map(|dirs| dirs.data_dir().to_path_buf());
        Self { data_dir }
    }

    /// Creates a FileStore rooted at a specific directory
    ///
    /// Useful for testing or when `--data-dir` is given.
    pub fn with_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir: Some(data_dir),
        }
    }

    /// The directory values are written to, if any
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Returns the path to the file for the given key
    fn item_path(&self, key: &str) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn is_available(&self) -> bool {
        self.data_dir.is_some()
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let Some(path) = self.item_path(key) else {
            return Ok(None);
        };

        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let (Some(dir), Some(path)) = (self.data_dir.as_ref(), self.item_path(key)) else {
            return Ok(());
        };

        fs::create_dir_all(dir)?;
        fs::write(&path, value)?;
        debug!(path = %path.display(), "Wrote stored value");
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        let Some(path) = self.item_path(key) else {
            return Ok(());
        };

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_set_item_creates_file_in_data_directory() {
        let (mut store, temp_dir) = create_test_store();

        store.set_item("test_key", "[1,2,3]").expect("Write should succeed");

        let expected_path = temp_dir.path().join("test_key.json");
        assert!(expected_path.exists(), "Value file should exist");
        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert_eq!(content, "[1,2,3]");
    }

    #[test]
    fn test_get_item_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();

        let result = store.get_item("nonexistent_key").expect("Read should succeed");

        assert!(result.is_none(), "Should return None for missing key");
    }

    #[test]
    fn test_overwrite_existing_value() {
        let (mut store, _temp_dir) = create_test_store();

        store.set_item("key", "first").expect("First write should succeed");
        store.set_item("key", "second").expect("Second write should succeed");

        assert_eq!(store.get_item("key").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_remove_item_is_idempotent() {
        let (mut store, _temp_dir) = create_test_store();

        store.set_item("key", "value").unwrap();
        store.remove_item("key").expect("Remove should succeed");
        store.remove_item("key").expect("Second remove should be a no-op");

        assert!(store.get_item("key").unwrap().is_none());
    }

    #[test]
    fn test_set_item_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("data").join("dir");
        let mut store = FileStore::with_dir(nested_path.clone());

        store.set_item("nested_key", "{}").expect("Write should succeed");

        assert!(nested_path.exists(), "Nested directory should be created");
        assert!(nested_path.join("nested_key.json").exists(), "Value file should exist");
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        let store = FileStore::new();
        if let Some(dir) = store.data_dir() {
            assert!(
                dir.to_string_lossy().contains("skycast"),
                "Data path should contain project name"
            );
        }
        // Test passes if no data directory exists (e.g., no home directory in CI)
    }

    #[test]
    fn test_unavailable_store_is_a_no_op() {
        let mut store = FileStore { data_dir: None };

        assert!(!store.is_available());
        store.set_item("key", "value").expect("Write should be a no-op");
        assert!(store.get_item("key").unwrap().is_none());
        store.remove_item("key").expect("Remove should be a no-op");
    }
}
