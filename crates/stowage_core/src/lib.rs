//! # Stowage Core
//!
//! A uniform key-value store over interchangeable backends.
//!
//! This crate provides:
//! - Key validation for the default and extended keyspaces
//! - The [`Store`] façade: put, get, open, delete, listing, copy and move
//! - [`RangeReader`], a seekable read-only cursor over one stored value
//! - [`ExtendedKeyspaceStore`], a decorator admitting `/` and spaces in keys
//! - Configuration ([`StoreConfig`]) from which a store can be rebuilt
//!
//! ## Example
//!
//! ```rust
//! use stowage_core::{KeyValueStore, Store, Whence};
//!
//! let store = Store::in_memory();
//! store.put("greeting", b"hello world").unwrap();
//!
//! let mut reader = store.open("greeting").unwrap();
//! reader.seek(-5, Whence::End).unwrap();
//! assert_eq!(reader.read_bytes(None).unwrap(), b"world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod extended;
mod factory;
mod key;
mod reader;
mod store;

pub use config::{Connection, StoreConfig};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use extended::ExtendedKeyspaceStore;
pub use factory::backend_for;
pub use key::{Key, Keyspace, DEFAULT_PUNCTUATION, SEPARATOR};
pub use reader::{RangeReader, Whence};
pub use store::{KeyValueStore, Keys, Store};

// Re-export backend types callers need to build stores directly.
pub use stowage_storage::{
    FileBackend, FileOptions, InMemoryBackend, StorageBackend, StorageError,
};
