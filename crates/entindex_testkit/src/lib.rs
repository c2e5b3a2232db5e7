//! # entindex Testkit
//!
//! Test utilities for entindex.
//!
//! This crate provides:
//! - Sample entity classes with their index specifications
//! - An owner cache standing in for the strong side of a data context
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entindex_testkit::prelude::*;
//!
//! #[test]
//! fn snapshots_by_account() {
//!     let (mut engine, by_account) = snapshot_engine();
//!     let mut owner = OwnerCache::new();
//!     let e1 = owner.hold(AccountSnapshot::new(1, date(2020, 1, 1)));
//!     engine.add(&e1).unwrap();
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
