//! Convergence predicates. The year state machine only asks a predicate for a
//! residual; adding a predicate never touches the state machine.
use crate::statements::{derive, StatementSnapshot};
use serde::{Deserialize, Serialize};

pub trait ConvergencePredicate: Send + Sync {
    fn name(&self) -> &'static str;

    /// Signed distance from convergence for `snapshot`.
    fn residual(&self, snapshot: &StatementSnapshot) -> f64;

    fn is_satisfied(&self, snapshot: &StatementSnapshot, tolerance: f64) -> bool {
        self.residual(snapshot).abs() <= tolerance
    }
}

/// Assets = Liabilities + Equity.
pub struct BalanceSheetEquality;

impl ConvergencePredicate for BalanceSheetEquality {
    fn name(&self) -> &'static str {
        "balance_sheet"
    }

    fn residual(&self, snapshot: &StatementSnapshot) -> f64 {
        let bs = &snapshot.balance_sheet;
        derive::balance_check(bs.total_assets, bs.total_liabilities, bs.total_equity, 0.0).residual
    }

    fn is_satisfied(&self, snapshot: &StatementSnapshot, tolerance: f64) -> bool {
        let bs = &snapshot.balance_sheet;
        derive::balance_check(bs.total_assets, bs.total_liabilities, bs.total_equity, tolerance).balanced
    }
}

/// Serializable selector for the predicate a scenario converges on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceCheck {
    #[default]
    BalanceSheet,
}

impl ConvergenceCheck {
    pub fn predicate(&self) -> Box<dyn ConvergencePredicate> {
        match self {
            ConvergenceCheck::BalanceSheet => Box::new(BalanceSheetEquality),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::BalanceSheet;

    #[test]
    fn test_balance_sheet_residual() {
        let snapshot = StatementSnapshot {
            balance_sheet: BalanceSheet {
                total_assets: 1_000_000.0,
                total_liabilities: 600_000.0,
                total_equity: 399_995.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let p = ConvergenceCheck::BalanceSheet.predicate();
        assert_eq!(p.name(), "balance_sheet");
        assert_eq!(p.residual(&snapshot), 5.0);
        assert!(!p.is_satisfied(&snapshot, 0.01));
        assert!(p.is_satisfied(&snapshot, 5.0));
    }

    #[test]
    fn test_selector_parses_from_json() {
        let check: ConvergenceCheck = serde_json::from_str("\"balance_sheet\"").unwrap();
        assert_eq!(check, ConvergenceCheck::BalanceSheet);
    }
}
