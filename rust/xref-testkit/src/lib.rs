//! Test utilities for the xref-index crates.
//!
//! - [`data_gen`]: seeded generators for term streams, segment slices and
//!   segment sizes.
//! - [`writer`]: an in-memory storage layer implementing `CombineHandle`,
//!   with failure injection.

pub mod data_gen;
pub mod writer;

pub use writer::InMemoryIndexWriter;
