//! # Stowage Storage
//!
//! Backend adapter trait and implementations for Stowage.
//!
//! This crate provides the lowest-level storage abstraction for Stowage.
//! Backends are **opaque key → bytes maps** - they do not interpret
//! the values they hold and they do not enforce a key grammar beyond
//! what the physical store itself cannot represent.
//!
//! ## Design Principles
//!
//! - Backends expose raw primitives: existence, size, range fetch, put,
//!   delete, and listing
//! - Backend-native failures are folded into [`StorageError`]
//! - Must be `Send + Sync` so a single backend can sit behind many readers
//! - Key validation and cursor semantics live in `stowage_core`
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - For persistent storage in a directory tree
//!
//! ## Example
//!
//! ```rust
//! use stowage_storage::{StorageBackend, InMemoryBackend};
//!
//! let backend = InMemoryBackend::new();
//! backend.put("greeting", b"hello world").unwrap();
//! let data = backend.get_range("greeting", 6, 5).unwrap();
//! assert_eq!(&data, b"world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
mod namespace;

pub use backend::{KeyIter, StorageBackend, DEFAULT_MAX_KEY_LEN};
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, FileOptions};
pub use memory::InMemoryBackend;
pub use namespace::validate_namespace;
