//! The central validator that orchestrates the execution of all validation rules.
use super::error::{ValidationError, ValidationErrorType};
use super::rules::{horizon, working_capital};
use crate::config::ScenarioConfig;

/// Collects every configuration problem before any computation runs.
pub struct Validator<'a> {
    config: &'a ScenarioConfig,
}

/// Validation findings split by how far their damage reaches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Problems that make the whole run impossible (no valid year sequence).
    pub fatal: Vec<ValidationError>,
    /// Problems that fail each year's statement derivation.
    pub per_year: Vec<ValidationError>,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a ScenarioConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport {
            fatal: horizon::validate_horizon(&self.config.horizon),
            per_year: working_capital::validate_working_capital(&self.config.working_capital),
        };
        report.per_year.extend(working_capital::validate_cash_engine(&self.config.cash_engine));
        report
    }

    /// All findings as a single result, for callers that only want a yes/no.
    pub fn check(&self) -> Result<(), Vec<ValidationError>> {
        let report = self.validate();
        let errors: Vec<_> = report.fatal.into_iter().chain(report.per_year).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ValidationReport {
    pub fn has(&self, error_type: ValidationErrorType) -> bool {
        self.fatal.iter().chain(&self.per_year).any(|e| e.error_type == error_type)
    }
}
