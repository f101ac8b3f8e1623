//! Per-scenario configuration, passed explicitly into every run.
//!
//! Nothing here is read from ambient state: a run is fully determined by its
//! `ScenarioConfig`, driver catalog, seed values and opening balances.
use crate::solver::ConvergenceCheck;
use crate::store::{DriverId, Year};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const MIN_YEAR: Year = 1900;
pub const MAX_YEAR: Year = 2200;

pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Historical years are supplied from outside and read-only; forecast years
/// run from `historical_end + 1` through `forecast_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    pub historical_start: Year,
    pub historical_end: Year,
    pub forecast_end: Year,
}

impl Horizon {
    pub fn forecast_years(&self) -> RangeInclusive<Year> {
        (self.historical_end + 1)..=self.forecast_end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingCapitalAssumptions {
    /// Days sales outstanding, in [0, 365].
    pub dso_days: f64,
    /// Days payable outstanding, in [0, 365].
    pub dpo_days: f64,
    /// Share of revenue billed in advance, in [0, 1].
    pub deferred_revenue_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CashEngineConfig {
    pub max_iterations: u32,
    /// Accepted balance-sheet residual, in the statement currency.
    pub tolerance: f64,
    pub convergence_check: ConvergenceCheck,
}

impl Default for CashEngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            convergence_check: ConvergenceCheck::BalanceSheet,
        }
    }
}

/// Which drivers feed the statement lines.
///
/// Revenue is required. Every other line is optional: an unmapped line is an
/// explicit zero, while a mapped line without a value for the year fails that
/// year.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatementMapping {
    pub revenue: DriverId,
    #[serde(default)]
    pub staff_costs: Option<DriverId>,
    #[serde(default)]
    pub rent: Option<DriverId>,
    #[serde(default)]
    pub other_opex: Option<DriverId>,
    #[serde(default)]
    pub depreciation: Option<DriverId>,
    #[serde(default)]
    pub capex_additions: Option<DriverId>,
    /// Closing provisions balance for the year.
    #[serde(default)]
    pub provisions: Option<DriverId>,
    #[serde(default)]
    pub financing_cash_flow: Option<DriverId>,
    /// Annual rate earned on the average cash balance.
    #[serde(default)]
    pub interest_rate: Option<DriverId>,
    /// Tax rate on positive pre-tax profit, in [0, 1].
    #[serde(default)]
    pub tax_rate: Option<DriverId>,
}

impl StatementMapping {
    pub fn new(revenue: impl Into<String>) -> Self {
        Self { revenue: DriverId::new(revenue), ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub horizon: Horizon,
    #[serde(default)]
    pub working_capital: WorkingCapitalAssumptions,
    #[serde(default)]
    pub cash_engine: CashEngineConfig,
    pub statement_lines: StatementMapping,
}

impl ScenarioConfig {
    pub fn new(horizon: Horizon, statement_lines: StatementMapping) -> Self {
        Self {
            horizon,
            working_capital: WorkingCapitalAssumptions::default(),
            cash_engine: CashEngineConfig::default(),
            statement_lines,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_fills_cash_engine_defaults() {
        let cfg = ScenarioConfig::from_json(
            r#"{
                "horizon": { "historical_start": 2020, "historical_end": 2024, "forecast_end": 2030 },
                "working_capital": { "dso_days": 30 },
                "statement_lines": { "revenue": "rev", "rent": "rent" }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.cash_engine, CashEngineConfig::default());
        assert_eq!(cfg.cash_engine.max_iterations, 3);
        assert_eq!(cfg.cash_engine.tolerance, 0.01);
        assert_eq!(cfg.working_capital.dso_days, 30.0);
        assert_eq!(cfg.working_capital.dpo_days, 0.0);
        assert_eq!(cfg.statement_lines.rent, Some(DriverId::from("rent")));
        assert_eq!(cfg.statement_lines.tax_rate, None);
        assert_eq!(cfg.horizon.forecast_years(), 2025..=2030);
    }

    #[test]
    fn test_json_requires_revenue_mapping() {
        let err = ScenarioConfig::from_json(
            r#"{ "horizon": { "historical_start": 2020, "historical_end": 2024, "forecast_end": 2030 },
                 "statement_lines": {} }"#,
        );
        assert!(err.is_err());
    }
}
