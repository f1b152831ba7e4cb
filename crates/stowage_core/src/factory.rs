//! Backend construction from configuration.

use std::sync::Arc;

use stowage_storage::{
    validate_namespace, FileBackend, FileOptions, InMemoryBackend, StorageBackend,
};
use tracing::debug;

use crate::config::{Connection, StoreConfig};
use crate::error::StoreResult;

/// Builds the backend described by `config`.
///
/// No I/O happens here; namespace provisioning is deferred to first use.
///
/// # Errors
///
/// Returns [`StoreError::Io`](crate::StoreError::Io) if the namespace name
/// is invalid.
pub fn backend_for(config: &StoreConfig) -> StoreResult<Arc<dyn StorageBackend>> {
    validate_namespace(&config.namespace)?;

    let backend: Arc<dyn StorageBackend> = match &config.connection {
        Connection::Memory => Arc::new(InMemoryBackend::new()),
        Connection::Filesystem { root } => Arc::new(FileBackend::open(
            root,
            &config.namespace,
            FileOptions {
                create_if_missing: config.create_if_missing,
                public: config.public,
            },
        )?),
    };

    debug!(namespace = %config.namespace, "built {:?} backend", config.connection);
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn memory_backend_is_fresh_each_time() {
        let config = StoreConfig::memory("ns");
        let first = backend_for(&config).unwrap();
        first.put("k", b"v").unwrap();

        let second = backend_for(&config).unwrap();
        assert!(!second.exists("k").unwrap());
    }

    #[test]
    fn filesystem_backends_share_data() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::filesystem(dir.path(), "ns").create_if_missing(true);

        backend_for(&config).unwrap().put("k", b"v").unwrap();
        assert_eq!(backend_for(&config).unwrap().get("k").unwrap(), b"v");
    }

    #[test]
    fn invalid_namespace_is_rejected() {
        let err = backend_for(&StoreConfig::memory("has space")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("namespace"));
    }
}
