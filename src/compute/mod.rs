//! The value store and the pipeline that fills it.
pub mod pipeline;
pub mod table;

pub use pipeline::{EvaluationFailure, PipelineReport, ProjectionPipeline};
pub use table::{Cell, ValueTable};
