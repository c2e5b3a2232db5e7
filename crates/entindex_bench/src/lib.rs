//! Benchmark support for entindex.

#![warn(missing_docs)]

pub mod utils;
