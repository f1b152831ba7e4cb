//! # Stowage Testkit
//!
//! Test utilities for Stowage.
//!
//! This crate provides:
//! - Temporary store fixtures over every backend
//! - Property-based test generators using proptest
//! - A conformance suite every backend and keyspace must pass
//! - Stress testing utilities
//! - Test logging setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stowage_testkit::prelude::*;
//!
//! #[test]
//! fn file_store_conforms() {
//!     let fixture = TestStore::file();
//!     run_basic_suite(&fixture.store);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod conformance;
pub mod fixtures;
pub mod generators;
pub mod stress;

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::conformance::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use crate::init_test_logging;
}

pub use conformance::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;

static LOGGING: Once = Once::new();

/// Installs a test-friendly `tracing` subscriber once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Output goes
/// through the test harness' captured writer.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        // Another harness may already have installed a global subscriber.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
