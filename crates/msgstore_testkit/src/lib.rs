//! # msgstore testkit
//!
//! Test utilities for msgstore.
//!
//! This crate provides:
//! - Test fixtures: stores on temporary directories and entity builders
//! - Property-based test generators using proptest
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust,ignore
//! use msgstore_testkit::prelude::*;
//!
//! #[test]
//! fn overflow_is_transparent() {
//!     let store = TestStore::file(2);
//!     store.save(due_entity(3, NOW));
//!     // ...
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;

/// Installs a test-friendly `tracing` subscriber once per process.
///
/// Filtering follows `RUST_LOG` and defaults to `warn`. Output goes through
/// the test harness capture.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
