//! Driver definitions and the per-scenario driver catalog.
pub mod registry;
pub mod types;

pub use registry::{CatalogError, CatalogIssue, DriverCatalog};
pub use types::{DependencyList, Driver, DriverCategory, DriverId, DriverValue, Provenance, ValueKind, Year};
