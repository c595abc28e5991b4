//! # Fleetsync Testkit
//!
//! Test utilities for Fleetsync.
//!
//! This crate provides:
//! - Test fixtures for file-backed stores with automatic cleanup
//! - Seeded store scenarios for replication tests
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fleetsync_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     with_temp_log_store(|store| {
//!         let log_id = store.create_log().unwrap();
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
