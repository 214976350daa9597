//! # sy-types
//!
//! Core types and data structures for Sibyl: search-space and trial value
//! objects shared by the sampler and suggestion crates, plus the
//! workspace-wide error taxonomy.

pub mod errors;
pub mod space;
pub mod trial;

pub use errors::*;
pub use space::*;
pub use trial::*;
