//! Namespace name rules shared by every backend.

use crate::error::{StorageError, StorageResult};

/// Longest namespace name accepted.
const MAX_NAMESPACE_LEN: usize = 63;

/// Checks that `namespace` is usable as a container/bucket/directory name.
///
/// Names are 1 to 63 characters of ASCII letters, digits, `-` and `_`.
/// This also guarantees a namespace never starts with `.`, which keeps it
/// clear of backend bookkeeping directories.
///
/// # Errors
///
/// Returns [`StorageError::InvalidConfig`] describing the violation.
pub fn validate_namespace(namespace: &str) -> StorageResult<()> {
    if namespace.is_empty() {
        return Err(StorageError::invalid_config("namespace must not be empty"));
    }
    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(StorageError::invalid_config(format!(
            "namespace {namespace:?} is longer than {MAX_NAMESPACE_LEN} characters"
        )));
    }
    if let Some(bad) = namespace
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(StorageError::invalid_config(format!(
            "namespace {namespace:?} contains illegal character {bad:?}"
        )));
    }
    Ok(())
}
