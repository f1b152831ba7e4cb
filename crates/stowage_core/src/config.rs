//! Store configuration.
//!
//! A [`StoreConfig`] fully describes how to reach a backend. It holds no
//! open handles, so two equal configs always reach the same data (except
//! for [`Connection::Memory`], which is private to each opened store).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the values live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Connection {
    /// A private in-process map. Each opened store gets a fresh, empty one.
    Memory,

    /// A directory tree on the local filesystem.
    Filesystem {
        /// Directory under which each namespace is a subdirectory.
        root: PathBuf,
    },
}

/// Configuration for opening a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend locator.
    pub connection: Connection,

    /// Namespace (container, bucket, directory) the keys are scoped to.
    pub namespace: String,

    /// Whether first use provisions a missing namespace.
    #[serde(default)]
    pub create_if_missing: bool,

    /// Whether a provisioned namespace is publicly readable.
    #[serde(default)]
    pub public: bool,
}

impl StoreConfig {
    /// Creates a configuration with both policy flags off.
    #[must_use]
    pub fn new(connection: Connection, namespace: impl Into<String>) -> Self {
        Self {
            connection,
            namespace: namespace.into(),
            create_if_missing: false,
            public: false,
        }
    }

    /// Creates an in-memory configuration.
    #[must_use]
    pub fn memory(namespace: impl Into<String>) -> Self {
        Self::new(Connection::Memory, namespace)
    }

    /// Creates a filesystem configuration rooted at `root`.
    #[must_use]
    pub fn filesystem(root: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self::new(Connection::Filesystem { root: root.into() }, namespace)
    }

    /// Sets whether to create the namespace if missing.
    #[must_use]
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether a created namespace is publicly readable.
    #[must_use]
    pub fn public(mut self, value: bool) -> Self {
        self.public = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_default_off() {
        let config = StoreConfig::memory("ns");
        assert!(!config.create_if_missing);
        assert!(!config.public);
        assert_eq!(config.connection, Connection::Memory);
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::filesystem("/tmp/data", "blobs")
            .create_if_missing(true)
            .public(true);

        assert!(config.create_if_missing);
        assert!(config.public);
        assert_eq!(config.namespace, "blobs");
        assert_eq!(
            config.connection,
            Connection::Filesystem {
                root: PathBuf::from("/tmp/data")
            }
        );
    }

    #[test]
    fn json_round_trip_is_equal() {
        let config = StoreConfig::filesystem("/srv/kv", "ns").create_if_missing(true);
        let json = serde_json::to_string(&config).unwrap();
        let back: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn missing_flags_deserialize_as_false() {
        let json = r#"{"connection":{"kind":"memory"},"namespace":"ns"}"#;
        let config: StoreConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config, StoreConfig::memory("ns"));
    }
}
