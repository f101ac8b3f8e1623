//! Defines the error types for the validation module.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The specific category of a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorType {
    /// A configuration value lies outside its permitted range (e.g., DSO of 400 days).
    OutOfRange,
    /// A statement line is mapped to a driver that has no value for the year.
    MissingInput,
    /// The year horizon is inconsistent or outside the supported domain.
    InvalidHorizon,
}

/// A structured error report about a scenario's configuration or inputs.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// The configuration field or statement line the error refers to.
    pub field: String,
    /// The category of the error.
    pub error_type: ValidationErrorType,
    /// A human-readable message explaining the error.
    pub message: String,
}

impl ValidationError {
    pub fn out_of_range(field: &str, value: f64, min: f64, max: f64) -> Self {
        Self {
            field: field.to_string(),
            error_type: ValidationErrorType::OutOfRange,
            message: format!("{} is outside [{}, {}]", value, min, max),
        }
    }

    pub fn missing_input(field: &str, message: String) -> Self {
        Self { field: field.to_string(), error_type: ValidationErrorType::MissingInput, message }
    }

    pub fn invalid_horizon(field: &str, message: String) -> Self {
        Self { field: field.to_string(), error_type: ValidationErrorType::InvalidHorizon, message }
    }
}
