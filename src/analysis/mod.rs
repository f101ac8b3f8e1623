//! Structural analysis of the driver graph.
pub mod topology;

pub use topology::{downstream_of, sort, ResolveError};
