//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use std::path::Path;

use stowage_core::{KeyValueStore, Store, StoreConfig};
use tempfile::TempDir;

/// Namespace used by file-backed fixtures.
pub const TEST_NAMESPACE: &str = "testkit";

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: Store,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self {
            store: Store::in_memory(),
            _temp_dir: None,
        }
    }

    /// Creates a new file-backed test store in a fresh temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config =
            StoreConfig::filesystem(temp_dir.path(), TEST_NAMESPACE).create_if_missing(true);
        let store = Store::connect(config).expect("Failed to open file store");

        Self {
            store,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the backing directory if file-based, None if in-memory.
    pub fn root(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// Returns the store's configuration, if it was opened from one.
    pub fn config(&self) -> Option<&StoreConfig> {
        self.store.config()
    }

    /// Opens a second store from a JSON round trip of this store's config.
    ///
    /// Returns None for in-memory fixtures, which have no config.
    pub fn reopen(&self) -> Option<Store> {
        let json = serde_json::to_string(self.config()?).expect("Failed to serialize config");
        let config: StoreConfig = serde_json::from_str(&json).expect("Failed to parse config");
        Some(Store::connect(config).expect("Failed to reopen store"))
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust
/// use stowage_core::KeyValueStore;
/// use stowage_testkit::with_temp_store;
///
/// with_temp_store(|store| {
///     store.put("k", b"v").unwrap();
///     assert_eq!(store.get("k").unwrap(), b"v");
/// });
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store) -> R,
{
    let fixture = TestStore::memory();
    f(&fixture.store)
}

/// Runs a test with a temporary file-backed store and its root directory.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store, &Path) -> R,
{
    let fixture = TestStore::file();
    let root = fixture.root().expect("File store should have a root");
    f(&fixture.store, root)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Value stored under key `i` by [`populated_store`].
    pub fn value_for(i: usize) -> Vec<u8> {
        format!("value-{i}").into_bytes()
    }

    /// Creates a store holding `count` keys named `key-0000`, `key-0001`, ...
    pub fn populated_store(count: usize) -> TestStore {
        let fixture = TestStore::memory();
        populate(&fixture.store, count);
        fixture
    }

    /// Writes `count` sequential keys into `store`.
    pub fn populate<S: KeyValueStore>(store: &S, count: usize) {
        for i in 0..count {
            store
                .put(&format!("key-{i:04}"), &value_for(i))
                .expect("Failed to populate store");
        }
    }

    /// A value long enough to exercise seeking, in the shape the reader
    /// suite expects.
    pub fn long_value() -> Vec<u8> {
        b"abcdefghijklmnopqrstuvwxyz0123456789".repeat(64)
    }
}
