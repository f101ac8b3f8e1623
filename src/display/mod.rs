//! Human-readable renderings of a projection run.
pub mod trace;

pub use trace::{format_convergence_log, format_driver_trace};
