//! Validation rules for working-capital and cash-engine settings.

use crate::config::{CashEngineConfig, WorkingCapitalAssumptions};
use crate::validation::error::ValidationError;

pub const MAX_DAYS: f64 = 365.0;

/// DSO/DPO must be a day count within one year; the deferred share a fraction.
/// Values are reported, never clamped.
pub(crate) fn validate_working_capital(wc: &WorkingCapitalAssumptions) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    check_range(&mut errors, "dso_days", wc.dso_days, 0.0, MAX_DAYS);
    check_range(&mut errors, "dpo_days", wc.dpo_days, 0.0, MAX_DAYS);
    check_range(&mut errors, "deferred_revenue_pct", wc.deferred_revenue_pct, 0.0, 1.0);
    errors
}

pub(crate) fn validate_cash_engine(cfg: &CashEngineConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if cfg.max_iterations == 0 {
        errors.push(ValidationError::out_of_range("max_iterations", 0.0, 1.0, u32::MAX as f64));
    }
    check_range(&mut errors, "tolerance", cfg.tolerance, 0.0, f64::MAX);
    errors
}

/// Rates read per year from the value table (tax) share the same rule.
pub(crate) fn check_fraction(field: &str, value: f64) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    check_range(&mut errors, field, value, 0.0, 1.0);
    errors.pop().map_or(Ok(()), Err)
}

fn check_range(errors: &mut Vec<ValidationError>, field: &str, value: f64, min: f64, max: f64) {
    // NaN fails both comparisons, so it is rejected too.
    if !(value >= min && value <= max) {
        errors.push(ValidationError::out_of_range(field, value, min, max));
    }
}
