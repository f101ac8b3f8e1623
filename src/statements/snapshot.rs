use crate::store::Year;
use serde::{Deserialize, Serialize};

/// Closing balances of an accepted year, used as the opening basis of the next.
///
/// This is a copy, not a reference: once a year is accepted its snapshot is
/// read-only and the next year only sees these numbers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CarryForward {
    pub cash: f64,
    pub accounts_receivable: f64,
    pub accounts_payable: f64,
    pub deferred_revenue: f64,
    pub provisions: f64,
    pub tangible_assets: f64,
    pub accumulated_depreciation: f64,
    pub retained_earnings: f64,
}

/// Balances at the end of the last historical year, supplied by the caller.
pub type OpeningBalances = CarryForward;

impl CarryForward {
    /// assets - (liabilities + equity) of the carried balances.
    pub fn imbalance(&self) -> f64 {
        let assets = self.cash + self.accounts_receivable + self.tangible_assets - self.accumulated_depreciation;
        let liabilities = self.accounts_payable + self.deferred_revenue + self.provisions;
        assets - (liabilities + self.retained_earnings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub revenue: f64,
    pub staff_costs: f64,
    pub rent: f64,
    pub other_opex: f64,
    pub cogs: f64,
    pub ebitda: f64,
    pub depreciation: f64,
    pub ebit: f64,
    /// Interest on the average of opening and closing cash.
    pub interest_income: f64,
    pub pre_tax_result: f64,
    pub tax: f64,
    pub net_result: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkingCapital {
    pub accounts_receivable: f64,
    pub accounts_payable: f64,
    pub deferred_revenue: f64,
    pub working_capital: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub cash: f64,
    pub accounts_receivable: f64,
    pub total_current_assets: f64,
    pub tangible_assets: f64,
    pub accumulated_depreciation: f64,
    pub net_fixed_assets: f64,
    pub total_assets: f64,
    pub accounts_payable: f64,
    pub deferred_revenue: f64,
    pub total_current_liabilities: f64,
    pub provisions: f64,
    pub total_liabilities: f64,
    pub retained_earnings: f64,
    pub total_equity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub cash_begin: f64,
    /// The net result the cash flow was built from (the iteration's seed view).
    pub net_result: f64,
    pub depreciation: f64,
    pub delta_ar: f64,
    pub delta_ap: f64,
    pub delta_deferred_income: f64,
    pub delta_provisions: f64,
    pub cf_operating: f64,
    pub cf_investing: f64,
    pub cf_financing: f64,
    pub net_cash_flow: f64,
    pub cash_end: f64,
}

/// One year's derived statements.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatementSnapshot {
    pub year: Year,
    pub income: IncomeStatement,
    pub working_capital: WorkingCapital,
    pub balance_sheet: BalanceSheet,
    pub cash_flow: CashFlowStatement,
    /// Interest income assumed when the cash flow was computed.
    pub interest_seed: f64,
}

impl StatementSnapshot {
    pub fn carry_forward(&self) -> CarryForward {
        let bs = &self.balance_sheet;
        CarryForward {
            cash: bs.cash,
            accounts_receivable: bs.accounts_receivable,
            accounts_payable: bs.accounts_payable,
            deferred_revenue: bs.deferred_revenue,
            provisions: bs.provisions,
            tangible_assets: bs.tangible_assets,
            accumulated_depreciation: bs.accumulated_depreciation,
            retained_earnings: bs.retained_earnings,
        }
    }

    pub fn liabilities_and_equity(&self) -> f64 {
        self.balance_sheet.total_liabilities + self.balance_sheet.total_equity
    }
}
