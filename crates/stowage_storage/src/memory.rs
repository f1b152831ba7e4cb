//! In-memory storage backend for testing.

use std::collections::BTreeMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::backend::{KeyIter, StorageBackend};
use crate::error::{StorageError, StorageResult};

/// Maximum key length declared by the in-memory backend.
const MEMORY_MAX_KEY_LEN: usize = 1024;

/// An in-memory storage backend.
///
/// This backend stores all values in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// Values are held as [`Bytes`], so range fetches and copies share the
/// stored buffer instead of duplicating it.
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use stowage_storage::{StorageBackend, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.put("k", b"test data").unwrap();
/// assert_eq!(backend.size("k").unwrap(), 9);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: RwLock<BTreeMap<String, Bytes>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend with pre-existing entries.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Bytes>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Clears all values from the backend.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn value(&self, key: &str) -> StorageResult<Bytes> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }
}

impl StorageBackend for InMemoryBackend {
    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.entries.read().contains_key(key))
    }

    fn size(&self, key: &str) -> StorageResult<u64> {
        Ok(self.value(key)?.len() as u64)
    }

    fn get_range(&self, key: &str, start: u64, len: usize) -> StorageResult<Vec<u8>> {
        let value = self.value(key)?;
        let start = usize::try_from(start).unwrap_or(usize::MAX).min(value.len());
        let end = start.saturating_add(len).min(value.len());
        Ok(value.slice(start..end).to_vec())
    }

    fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        Ok(self.value(key)?.to_vec())
    }

    fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), Bytes::copy_from_slice(data));
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn iter_keys(&self, prefix: Option<&str>) -> StorageResult<KeyIter> {
        // Snapshot so an open listing never holds the lock.
        let keys: Vec<String> = {
            let entries = self.entries.read();
            match prefix {
                Some(prefix) => entries
                    .range(prefix.to_string()..)
                    .take_while(|(k, _)| k.starts_with(prefix))
                    .map(|(k, _)| k.clone())
                    .collect(),
                None => entries.keys().cloned().collect(),
            }
        };
        Ok(Box::new(keys.into_iter().map(Ok)))
    }

    fn copy(&self, source: &str, dest: &str) -> StorageResult<()> {
        let mut entries = self.entries.write();
        let value = entries
            .get(source)
            .cloned()
            .ok_or_else(|| StorageError::not_found(source))?;
        entries.insert(dest.to_string(), value);
        Ok(())
    }

    fn rename(&self, source: &str, dest: &str) -> StorageResult<()> {
        let mut entries = self.entries.write();
        let value = entries
            .remove(source)
            .ok_or_else(|| StorageError::not_found(source))?;
        entries.insert(dest.to_string(), value);
        Ok(())
    }

    fn max_key_len(&self) -> usize {
        MEMORY_MAX_KEY_LEN
    }
}
