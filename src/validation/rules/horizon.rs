//! Validation rule for the year horizon.

use crate::config::{Horizon, MAX_YEAR, MIN_YEAR};
use crate::validation::error::ValidationError;

/// Historical years come first, at least one forecast year follows, and every
/// year lies in the supported domain.
pub(crate) fn validate_horizon(h: &Horizon) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (field, year) in [
        ("historical_start", h.historical_start),
        ("historical_end", h.historical_end),
        ("forecast_end", h.forecast_end),
    ] {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            errors.push(ValidationError::invalid_horizon(
                field,
                format!("{} is outside {}..={}", year, MIN_YEAR, MAX_YEAR),
            ));
        }
    }
    if h.historical_end < h.historical_start {
        errors.push(ValidationError::invalid_horizon(
            "historical_end",
            format!("{} precedes historical_start {}", h.historical_end, h.historical_start),
        ));
    }
    if h.forecast_end <= h.historical_end {
        errors.push(ValidationError::invalid_horizon(
            "forecast_end",
            format!("{} leaves no forecast years after {}", h.forecast_end, h.historical_end),
        ));
    }
    errors
}
