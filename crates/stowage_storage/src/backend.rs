//! Storage backend trait definition.

use std::fmt;

use crate::error::{StorageError, StorageResult};

/// Default maximum key length, in bytes, for backends that do not declare one.
pub const DEFAULT_MAX_KEY_LEN: usize = 250;

/// Lazy sequence of keys produced by [`StorageBackend::iter_keys`].
///
/// Items are fallible because listing may hit the physical store while
/// the caller is iterating.
pub type KeyIter = Box<dyn Iterator<Item = StorageResult<String>> + Send>;

/// A backend adapter over one physical key-value system.
///
/// Backends are **opaque byte maps**. They store and return values by key
/// without interpreting them. Key grammar is enforced one layer up, so
/// backends only reject keys they physically cannot represent
/// (see [`StorageError::UnsupportedKey`]).
///
/// # Invariants
///
/// - `get_range` returns fewer than `len` bytes only at end-of-value, and
///   zero bytes when `start >= size(key)`
/// - `size`, `get`, and `get_range` fail with [`StorageError::NotFound`]
///   for an absent key; `exists` returns `false` instead
/// - `delete` on an absent key succeeds
/// - `put` overwrites unconditionally
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Returns whether a value is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Returns the total length in bytes of the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the key is absent.
    fn size(&self, key: &str) -> StorageResult<u64>;

    /// Reads up to `len` bytes of the value under `key`, starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the key is absent, or an
    /// I/O error if the fetch fails.
    fn get_range(&self, key: &str, start: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Reads the whole value under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the key is absent.
    fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let size = self.size(key)?;
        let len = usize::try_from(size).map_err(|_| {
            StorageError::unavailable(format!("value of {size} bytes does not fit in memory"))
        })?;
        self.get_range(key, 0, len)
    }

    /// Stores `data` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn put(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Removes the value under `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Lists stored keys, optionally restricted to those starting with `prefix`.
    ///
    /// Order is backend-defined. Each call starts a fresh listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be started.
    fn iter_keys(&self, prefix: Option<&str>) -> StorageResult<KeyIter>;

    /// Copies the value under `source` to `dest`.
    ///
    /// The default composes `get` and `put`; backends with a native copy
    /// primitive should override it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if `source` is absent.
    fn copy(&self, source: &str, dest: &str) -> StorageResult<()> {
        let data = self.get(source)?;
        self.put(dest, &data)
    }

    /// Moves the value under `source` to `dest`.
    ///
    /// The default composes `copy` and `delete`, so it is not atomic.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if `source` is absent.
    fn rename(&self, source: &str, dest: &str) -> StorageResult<()> {
        if source == dest {
            return if self.exists(source)? {
                Ok(())
            } else {
                Err(StorageError::not_found(source))
            };
        }
        self.copy(source, dest)?;
        self.delete(source)
    }

    /// Maximum key length, in bytes, this backend can store.
    fn max_key_len(&self) -> usize {
        DEFAULT_MAX_KEY_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Backend that only implements the required methods, so the provided
    /// ones are exercised.
    #[derive(Debug, Default)]
    struct MinimalBackend {
        values: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl StorageBackend for MinimalBackend {
        fn exists(&self, key: &str) -> StorageResult<bool> {
            Ok(self.values.lock().contains_key(key))
        }

        fn size(&self, key: &str) -> StorageResult<u64> {
            self.values
                .lock()
                .get(key)
                .map(|v| v.len() as u64)
                .ok_or_else(|| StorageError::not_found(key))
        }

        fn get_range(&self, key: &str, start: u64, len: usize) -> StorageResult<Vec<u8>> {
            let values = self.values.lock();
            let value = values.get(key).ok_or_else(|| StorageError::not_found(key))?;
            let start = (start as usize).min(value.len());
            let end = start.saturating_add(len).min(value.len());
            Ok(value[start..end].to_vec())
        }

        fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
            self.values.lock().insert(key.to_string(), data.to_vec());
            Ok(())
        }

        fn delete(&self, key: &str) -> StorageResult<()> {
            self.values.lock().remove(key);
            Ok(())
        }

        fn iter_keys(&self, prefix: Option<&str>) -> StorageResult<KeyIter> {
            let prefix = prefix.unwrap_or("").to_string();
            let keys: Vec<_> = self
                .values
                .lock()
                .keys()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .map(Ok)
                .collect();
            Ok(Box::new(keys.into_iter()))
        }
    }

    #[test]
    fn default_get_reads_whole_value() {
        let backend = MinimalBackend::default();
        backend.put("k", b"hello world").unwrap();
        assert_eq!(backend.get("k").unwrap(), b"hello world");
    }

    #[test]
    fn default_get_missing_is_not_found() {
        let backend = MinimalBackend::default();
        assert!(backend.get("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn default_copy_keeps_source() {
        let backend = MinimalBackend::default();
        backend.put("a", b"1").unwrap();
        backend.copy("a", "b").unwrap();
        assert_eq!(backend.get("a").unwrap(), b"1");
        assert_eq!(backend.get("b").unwrap(), b"1");
    }

    #[test]
    fn default_rename_removes_source() {
        let backend = MinimalBackend::default();
        backend.put("a", b"1").unwrap();
        backend.rename("a", "b").unwrap();
        assert!(!backend.exists("a").unwrap());
        assert_eq!(backend.get("b").unwrap(), b"1");
    }

    #[test]
    fn default_rename_onto_itself_keeps_value() {
        let backend = MinimalBackend::default();
        backend.put("a", b"1").unwrap();
        backend.rename("a", "a").unwrap();
        assert_eq!(backend.get("a").unwrap(), b"1");
        assert!(backend.rename("b", "b").unwrap_err().is_not_found());
    }

    #[test]
    fn default_max_key_len() {
        assert_eq!(MinimalBackend::default().max_key_len(), DEFAULT_MAX_KEY_LEN);
    }
}
