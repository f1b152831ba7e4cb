//! The store façade.
//!
//! [`Store`] pairs a backend with key validation and exposes the uniform
//! operations every backend supports. The [`KeyValueStore`] trait carries
//! those operations so that keyspace decorators share them.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::sync::Arc;

use stowage_storage::{InMemoryBackend, StorageBackend};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::extended::ExtendedKeyspaceStore;
use crate::factory::backend_for;
use crate::key::{Key, Keyspace};
use crate::reader::RangeReader;

/// Lazy sequence of keys returned by listing operations.
pub type Keys = Box<dyn Iterator<Item = StoreResult<String>> + Send>;

/// Chunk size used when streaming a value into a writer.
const STREAM_CHUNK: usize = 64 * 1024;

/// A key-value store.
///
/// Implementors only choose their keyspace and the [`Store`] they delegate
/// to; every operation is provided. Each key-bearing operation validates
/// its key before any I/O and fails with
/// [`StoreError::InvalidKey`] otherwise.
pub trait KeyValueStore {
    /// The key grammar this store accepts.
    fn keyspace(&self) -> Keyspace;

    /// The store that performs the I/O.
    fn base(&self) -> &Store;

    /// Validates `key` against this store's keyspace and backend limits.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if the key is not acceptable.
    fn validate_key(&self, key: &str) -> StoreResult<Key> {
        Key::parse(key, self.keyspace(), self.base().max_key_len())
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a bad key or `Io` if the backend fails.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<Key> {
        let key = self.validate_key(key)?;
        self.base().put_key(&key, value)?;
        Ok(key)
    }

    /// Stores everything `reader` yields under `key`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a bad key, or `Io` if reading the source or
    /// writing the backend fails.
    fn put_from<R: Read + ?Sized>(&self, key: &str, reader: &mut R) -> StoreResult<Key> {
        let key = self.validate_key(key)?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.base().put_key(&key, &data)?;
        Ok(key)
    }

    /// Returns the whole value under `key`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key is absent.
    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let key = self.validate_key(key)?;
        self.base().get_key(&key)
    }

    /// Streams the value under `key` into `writer`, returning the bytes written.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key is absent, or `Io` if the writer fails.
    fn get_into<W: Write + ?Sized>(&self, key: &str, writer: &mut W) -> StoreResult<u64> {
        let mut reader = self.open(key)?;
        let mut written = 0u64;
        loop {
            let chunk = reader.read_bytes(Some(STREAM_CHUNK))?;
            if chunk.is_empty() {
                break;
            }
            writer.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        reader.close();
        Ok(written)
    }

    /// Opens a random-access reader positioned at offset 0.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key is absent.
    fn open(&self, key: &str) -> StoreResult<RangeReader> {
        let key = self.validate_key(key)?;
        self.base().open_key(key)
    }

    /// Returns whether a value is stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a bad key or `Io` if the backend fails.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        let key = self.validate_key(key)?;
        self.base().contains_key(&key)
    }

    /// Removes the value under `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for a bad key or `Io` if the backend fails.
    fn delete(&self, key: &str) -> StoreResult<()> {
        let key = self.validate_key(key)?;
        self.base().delete_key(&key)
    }

    /// Lists keys, optionally only those starting with `prefix`.
    ///
    /// Order is backend-defined. Each call starts a new listing.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the listing cannot be started.
    fn iter_keys(&self, prefix: Option<&str>) -> StoreResult<Keys> {
        self.base().list(prefix)
    }

    /// Collects [`iter_keys`](Self::iter_keys) into a vector.
    ///
    /// # Errors
    ///
    /// Returns `Io` if listing fails at any point.
    fn keys(&self, prefix: Option<&str>) -> StoreResult<Vec<String>> {
        self.iter_keys(prefix)?.collect()
    }

    /// Lists the distinct key prefixes ending at the first `delimiter` after
    /// `prefix`. Keys with no further delimiter are yielded whole.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the listing cannot be started.
    fn iter_prefixes(&self, delimiter: char, prefix: Option<&str>) -> StoreResult<Keys> {
        let skip = prefix.map_or(0, str::len);
        let mut seen = HashSet::new();
        let prefixes = self.iter_keys(prefix)?.filter_map(move |key| {
            let key = match key {
                Ok(key) => key,
                Err(e) => return Some(Err(e)),
            };
            let cut = key
                .get(skip..)
                .and_then(|rest| rest.find(delimiter))
                .map(|i| skip + i + delimiter.len_utf8());
            let candidate = match cut {
                Some(end) => key[..end].to_string(),
                None => key,
            };
            seen.insert(candidate.clone()).then_some(Ok(candidate))
        });
        Ok(Box::new(prefixes))
    }

    /// Copies the value under `source` to `dest`, returning `dest`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `source` is absent.
    fn copy(&self, source: &str, dest: &str) -> StoreResult<Key> {
        let source = self.validate_key(source)?;
        let dest = self.validate_key(dest)?;
        self.base().copy_key(&source, &dest)?;
        Ok(dest)
    }

    /// Moves the value under `source` to `dest`, returning `dest`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `source` is absent.
    fn move_key(&self, source: &str, dest: &str) -> StoreResult<Key> {
        let source = self.validate_key(source)?;
        let dest = self.validate_key(dest)?;
        self.base().move_key_to(&source, &dest)?;
        Ok(dest)
    }
}

/// A store over one backend using the default keyspace.
///
/// Cloning is cheap and clones share the backend. A store opened from a
/// [`StoreConfig`] keeps it, so an equivalent store can be rebuilt from
/// [`config`](Self::config) alone.
#[derive(Debug, Clone)]
pub struct Store {
    backend: Arc<dyn StorageBackend>,
    config: Option<StoreConfig>,
}

impl Store {
    /// Creates a store over an existing backend.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            config: None,
        }
    }

    /// Creates a store owning `backend`.
    #[must_use]
    pub fn with_backend<B: StorageBackend + 'static>(backend: B) -> Self {
        Self::new(Arc::new(backend))
    }

    /// Creates a store over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_backend(InMemoryBackend::new())
    }

    /// Opens the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the configuration is invalid.
    pub fn connect(config: StoreConfig) -> StoreResult<Self> {
        let backend = backend_for(&config)?;
        Ok(Self {
            backend,
            config: Some(config),
        })
    }

    /// Returns the configuration this store was opened from, if any.
    #[must_use]
    pub fn config(&self) -> Option<&StoreConfig> {
        self.config.as_ref()
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Maximum key length declared by the backend.
    #[must_use]
    pub fn max_key_len(&self) -> usize {
        self.backend.max_key_len()
    }

    /// Wraps this store so it accepts the extended keyspace.
    #[must_use]
    pub fn extended(self) -> ExtendedKeyspaceStore {
        ExtendedKeyspaceStore::new(self)
    }

    // =========================================================================
    // Operations on validated keys
    // =========================================================================

    /// Stores `value` under an already validated key.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the backend fails.
    pub fn put_key(&self, key: &Key, value: &[u8]) -> StoreResult<()> {
        self.backend.put(key, value)?;
        debug!(key = %key, bytes = value.len(), "put");
        Ok(())
    }

    /// Returns the value under an already validated key.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key is absent.
    pub fn get_key(&self, key: &Key) -> StoreResult<Vec<u8>> {
        let value = self.backend.get(key)?;
        debug!(key = %key, bytes = value.len(), "get");
        Ok(value)
    }

    /// Opens a reader on an already validated key.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key is absent.
    pub fn open_key(&self, key: Key) -> StoreResult<RangeReader> {
        RangeReader::open(Arc::clone(&self.backend), key)
    }

    /// Returns whether an already validated key is present.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the backend fails.
    pub fn contains_key(&self, key: &Key) -> StoreResult<bool> {
        Ok(self.backend.exists(key)?)
    }

    /// Removes the value under an already validated key.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the backend fails.
    pub fn delete_key(&self, key: &Key) -> StoreResult<()> {
        self.backend.delete(key)?;
        debug!(key = %key, "delete");
        Ok(())
    }

    /// Copies between two already validated keys.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `source` is absent.
    pub fn copy_key(&self, source: &Key, dest: &Key) -> StoreResult<()> {
        self.backend.copy(source, dest)?;
        debug!(source = %source, dest = %dest, "copy");
        Ok(())
    }

    /// Moves between two already validated keys.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `source` is absent.
    pub fn move_key_to(&self, source: &Key, dest: &Key) -> StoreResult<()> {
        self.backend.rename(source, dest)?;
        debug!(source = %source, dest = %dest, "move");
        Ok(())
    }

    /// Starts a key listing.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the listing cannot be started.
    pub fn list(&self, prefix: Option<&str>) -> StoreResult<Keys> {
        let keys = self.backend.iter_keys(prefix)?;
        Ok(Box::new(keys.map(|key| key.map_err(StoreError::from))))
    }
}

impl KeyValueStore for Store {
    fn keyspace(&self) -> Keyspace {
        Keyspace::Default
    }

    fn base(&self) -> &Store {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::reader::Whence;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn sorted(mut keys: Vec<String>) -> Vec<String> {
        keys.sort();
        keys
    }

    #[test]
    fn put_get_round_trip() {
        let store = Store::in_memory();
        let key = store.put("key1", b"value1").unwrap();
        assert_eq!(key, "key1");
        assert_eq!(store.get("key1").unwrap(), b"value1");
    }

    #[test]
    fn put_overwrites() {
        let store = Store::in_memory();
        store.put("k", b"v1").unwrap();
        store.put("k", b"v2").unwrap();
        assert_eq!(store.get("k").unwrap(), b"v2");
    }

    #[test]
    fn missing_key_errors() {
        let store = Store::in_memory();
        assert_eq!(store.get("nope").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(store.open("nope").unwrap_err().kind(), ErrorKind::NotFound);
        assert!(!store.contains("nope").unwrap());
    }

    #[test]
    fn delete_is_idempotent() {
        let store = Store::in_memory();
        store.put("k", b"v").unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        store.delete("never").unwrap();
        assert_eq!(store.get("k").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn invalid_keys_rejected_before_io() {
        let store = Store::in_memory();
        for bad in ["", "a/b", "a b", "a*b"] {
            assert_eq!(
                store.put(bad, b"v").unwrap_err().kind(),
                ErrorKind::InvalidKey
            );
            assert_eq!(store.get(bad).unwrap_err().kind(), ErrorKind::InvalidKey);
            assert_eq!(store.open(bad).unwrap_err().kind(), ErrorKind::InvalidKey);
            assert_eq!(store.delete(bad).unwrap_err().kind(), ErrorKind::InvalidKey);
            assert_eq!(
                store.contains(bad).unwrap_err().kind(),
                ErrorKind::InvalidKey
            );
        }
        assert!(store.keys(None).unwrap().is_empty());
    }

    #[test]
    fn key_length_follows_backend() {
        let store = Store::in_memory();
        let longest = "k".repeat(store.max_key_len());
        store.put(&longest, b"v").unwrap();
        let too_long = "k".repeat(store.max_key_len() + 1);
        assert_eq!(
            store.put(&too_long, b"v").unwrap_err().kind(),
            ErrorKind::InvalidKey
        );
    }

    #[test]
    fn open_returns_reader_at_zero() {
        let store = Store::in_memory();
        store.put("k", b"hello world").unwrap();
        let mut reader = store.open("k").unwrap();
        assert_eq!(reader.tell().unwrap(), 0);
        reader.seek(6, Whence::Start).unwrap();
        assert_eq!(reader.read_bytes(None).unwrap(), b"world");
    }

    #[test]
    fn listing_and_prefixes() {
        let store = Store::in_memory();
        for key in ["a.1", "a.2", "b.1", "c"] {
            store.put(key, b"v").unwrap();
        }

        assert_eq!(sorted(store.keys(None).unwrap()), ["a.1", "a.2", "b.1", "c"]);
        assert_eq!(sorted(store.keys(Some("a.")).unwrap()), ["a.1", "a.2"]);

        let prefixes: Vec<String> = store
            .iter_prefixes('.', None)
            .unwrap()
            .collect::<StoreResult<_>>()
            .unwrap();
        assert_eq!(sorted(prefixes), ["a.", "b.", "c"]);
    }

    #[test]
    fn iter_keys_is_restartable() {
        let store = Store::in_memory();
        store.put("x", b"1").unwrap();
        let first: Vec<_> = store.iter_keys(None).unwrap().collect();
        let second: Vec<_> = store.iter_keys(None).unwrap().collect();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn copy_and_move() {
        let store = Store::in_memory();
        store.put("src", b"payload").unwrap();

        assert_eq!(store.copy("src", "dst").unwrap(), "dst");
        assert_eq!(store.get("src").unwrap(), b"payload");
        assert_eq!(store.get("dst").unwrap(), b"payload");

        assert_eq!(store.move_key("dst", "moved").unwrap(), "moved");
        assert!(!store.contains("dst").unwrap());
        assert_eq!(store.get("moved").unwrap(), b"payload");

        assert_eq!(
            store.copy("gone", "x").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            store.move_key("gone", "x").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            store.copy("src", "bad key").unwrap_err().kind(),
            ErrorKind::InvalidKey
        );
    }

    #[test]
    fn streaming_in_and_out() {
        let store = Store::in_memory();
        let value: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

        store.put_from("big", &mut Cursor::new(&value)).unwrap();
        let mut out = Vec::new();
        assert_eq!(store.get_into("big", &mut out).unwrap(), value.len() as u64);
        assert_eq!(out, value);

        let mut sink = Vec::new();
        assert_eq!(
            store.get_into("missing", &mut sink).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn reconstruct_from_config() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::filesystem(dir.path(), "ns").create_if_missing(true);

        let store = Store::connect(config).unwrap();
        store.put("key1", b"value1").unwrap();

        let rebuilt = Store::connect(store.config().cloned().unwrap()).unwrap();
        assert_eq!(rebuilt.get("key1").unwrap(), b"value1");
    }

    #[test]
    fn reconstruct_from_serialized_config() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::filesystem(dir.path(), "ns").create_if_missing(true);
        let store = Store::connect(config).unwrap();
        store.put("key1", b"value1").unwrap();

        let json = serde_json::to_string(store.config().unwrap()).unwrap();
        drop(store);

        let rebuilt = Store::connect(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(rebuilt.get("key1").unwrap(), b"value1");
    }

    #[test]
    fn missing_namespace_is_io_failure() {
        let dir = tempdir().unwrap();
        let store = Store::connect(StoreConfig::filesystem(dir.path(), "absent")).unwrap();

        let err = store.iter_keys(None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("namespace does not exist"));

        assert_eq!(store.put("k", b"v").unwrap_err().kind(), ErrorKind::Io);
        assert_eq!(store.get("k").unwrap_err().kind(), ErrorKind::Io);
    }

    #[test]
    fn store_without_config() {
        let store = Store::in_memory();
        assert!(store.config().is_none());
        assert_eq!(store.max_key_len(), store.backend().max_key_len());
    }
}
