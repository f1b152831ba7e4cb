//! Extended keyspace decorator.
//!
//! Wraps a [`Store`] so that keys may also contain `/` separators and
//! spaces. Only validation changes; every operation is forwarded to the
//! wrapped store, which does not re-check the key.

use crate::key::Keyspace;
use crate::store::{KeyValueStore, Store};

/// A store accepting the extended keyspace.
#[derive(Debug, Clone)]
pub struct ExtendedKeyspaceStore {
    inner: Store,
}

impl ExtendedKeyspaceStore {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Store) -> Self {
        Self { inner }
    }

    /// Returns the wrapped store.
    #[must_use]
    pub fn inner(&self) -> &Store {
        &self.inner
    }

    /// Unwraps the decorator.
    #[must_use]
    pub fn into_inner(self) -> Store {
        self.inner
    }
}

impl From<Store> for ExtendedKeyspaceStore {
    fn from(inner: Store) -> Self {
        Self::new(inner)
    }
}

impl KeyValueStore for ExtendedKeyspaceStore {
    fn keyspace(&self) -> Keyspace {
        Keyspace::Extended
    }

    fn base(&self) -> &Store {
        &self.inner
    }
}
