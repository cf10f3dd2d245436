//! # EavDB Testkit
//!
//! Test utilities for EavDB.
//!
//! This crate provides:
//! - Test fixtures and store helpers
//! - Property-based test generators using proptest
//! - A probe backend that records how the store drives its backend
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use eavdb_testkit::prelude::*;
//!
//! with_temp_store(|store| {
//!     let people = scenarios::people(store);
//!     assert!(store.exists(people.alice).unwrap());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod probe;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::probe::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use probe::*;
pub use stress::*;
