//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use stowage_core::{KeyValueStore, Store, StoreConfig};
use tempfile::TempDir;

/// Value sizes every benchmark group sweeps over.
pub const VALUE_SIZES: [usize; 4] = [64, 1024, 16 * 1024, 256 * 1024];

/// Generate deterministic data of the specified size.
pub fn value_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Generate a batch of keys.
pub fn generate_keys(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("bench-{i:08}")).collect()
}

/// Opens a file-backed store in a fresh temporary directory.
///
/// The directory is removed when the returned guard drops.
pub fn file_store() -> (Store, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = StoreConfig::filesystem(dir.path(), "bench").create_if_missing(true);
    let store = Store::connect(config).expect("Failed to open file store");
    (store, dir)
}

/// Stores one value of `size` bytes under `key`.
pub fn seed<S: KeyValueStore>(store: &S, key: &str, size: usize) {
    store.put(key, &value_data(size)).expect("Failed to seed store");
}
