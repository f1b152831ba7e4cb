//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// Every backend folds its native failures into these variants so that
/// callers never see backend-specific error types.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The key does not exist in the backend.
    #[error("key not found: {key}")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// The namespace does not exist and the backend may not create it.
    #[error("namespace does not exist: {namespace}")]
    NamespaceMissing {
        /// The namespace that was expected.
        namespace: String,
    },

    /// The key cannot be represented by this backend.
    #[error("key {key:?} is not supported by this backend: {reason}")]
    UnsupportedKey {
        /// The rejected key.
        key: String,
        /// Why the backend cannot store it.
        reason: String,
    },

    /// The backend was configured with invalid parameters.
    #[error("invalid backend configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// The backend is unreachable or refused the request.
    #[error("backend unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

impl StorageError {
    /// Creates a not-found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates an unsupported-key error.
    pub fn unsupported_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Returns true if this error reports a missing key.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
