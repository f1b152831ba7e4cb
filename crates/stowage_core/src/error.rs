//! Error types for store operations.

use std::io;

use stowage_storage::StorageError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced to callers of a store or reader.
///
/// Every backend failure is folded into one of these four kinds, so
/// callers can handle "storage is unavailable" the same way regardless of
/// which backend sits underneath.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key does not satisfy the active keyspace.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The key is absent.
    #[error("key not found: {key}")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// The operation is not permitted in the current state or with these arguments.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// The backend failed.
    #[error("storage I/O failure: {source}")]
    Io {
        /// The underlying backend error.
        source: StorageError,
    },
}

/// The kind of a [`StoreError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`StoreError::InvalidKey`].
    InvalidKey,
    /// See [`StoreError::NotFound`].
    NotFound,
    /// See [`StoreError::InvalidOperation`].
    InvalidOperation,
    /// See [`StoreError::Io`].
    Io,
}

impl StoreError {
    /// Creates an invalid key error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKey { .. } => ErrorKind::InvalidKey,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { key } => Self::NotFound { key },
            StorageError::UnsupportedKey { key, reason } => Self::InvalidKey { key, reason },
            source => Self::Io { source },
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        // Unwrap errors that crossed an io::Read/io::Seek boundary.
        if err.get_ref().is_some_and(|inner| inner.is::<StoreError>()) {
            if let Some(inner) = err.into_inner() {
                if let Ok(store_err) = inner.downcast::<StoreError>() {
                    return *store_err;
                }
            }
            return Self::invalid_operation("unrecoverable wrapped error");
        }
        Self::Io {
            source: StorageError::Io(err),
        }
    }
}

impl From<StoreError> for io::Error {
    fn from(err: StoreError) -> Self {
        let kind = match &err {
            StoreError::NotFound { .. } => io::ErrorKind::NotFound,
            StoreError::InvalidKey { .. } | StoreError::InvalidOperation { .. } => {
                io::ErrorKind::InvalidInput
            }
            StoreError::Io {
                source: StorageError::Io(inner),
            } => inner.kind(),
            StoreError::Io { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
