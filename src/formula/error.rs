//! Defines the error types for formula evaluation.
use crate::store::{DriverId, Year};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures scoped to a single driver-year evaluation.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormulaError {
    #[error("No value for driver '{driver}' in {year}")]
    MissingDependencyValue { driver: DriverId, year: Year },
    #[error("Formula '{formula}' could not be evaluated: {reason}")]
    FormulaEvaluationError { formula: String, reason: String },
}

impl FormulaError {
    pub(crate) fn evaluation(formula: &str, reason: impl Into<String>) -> Self {
        FormulaError::FormulaEvaluationError { formula: formula.to_string(), reason: reason.into() }
    }
}
