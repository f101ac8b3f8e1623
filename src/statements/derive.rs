//! Pure statement arithmetic. Every function takes explicit numbers and
//! returns explicit numbers; there is no hidden state.

pub const DAYS_PER_YEAR: f64 = 365.0;

#[inline]
pub fn cogs(staff: f64, rent: f64, other_opex: f64) -> f64 {
    staff + rent + other_opex
}

#[inline]
pub fn accounts_receivable(revenue: f64, dso_days: f64) -> f64 {
    revenue * dso_days / DAYS_PER_YEAR
}

#[inline]
pub fn accounts_payable(cogs: f64, dpo_days: f64) -> f64 {
    cogs * dpo_days / DAYS_PER_YEAR
}

#[inline]
pub fn deferred_revenue(revenue: f64, deferred_pct: f64) -> f64 {
    revenue * deferred_pct
}

#[inline]
pub fn working_capital(ar: f64, ap: f64, deferred_revenue: f64) -> f64 {
    ar - ap - deferred_revenue
}

// --- Balance sheet ---

/// Summed through `net_cash_flow` so `cash_begin + net_cash_flow == cash_end` holds bit for bit.
#[inline]
pub fn cash_end(cash_begin: f64, cf_operating: f64, cf_investing: f64, cf_financing: f64) -> f64 {
    cash_begin + net_cash_flow(cf_operating, cf_investing, cf_financing)
}

#[inline]
pub fn total_current_assets(cash_end: f64, ar: f64) -> f64 {
    cash_end + ar
}

#[inline]
pub fn net_fixed_assets(tangible_assets: f64, accumulated_depreciation: f64) -> f64 {
    tangible_assets - accumulated_depreciation
}

#[inline]
pub fn total_assets(total_current_assets: f64, net_fixed_assets: f64) -> f64 {
    total_current_assets + net_fixed_assets
}

#[inline]
pub fn total_current_liabilities(ap: f64, deferred_revenue: f64) -> f64 {
    ap + deferred_revenue
}

#[inline]
pub fn total_liabilities(total_current_liabilities: f64, provisions: f64) -> f64 {
    total_current_liabilities + provisions
}

#[inline]
pub fn retained_earnings(prior_retained_earnings: f64, net_result: f64) -> f64 {
    prior_retained_earnings + net_result
}

#[inline]
pub fn total_equity(retained_earnings: f64) -> f64 {
    retained_earnings
}

// --- Cash flow ---

/// Year-over-year movements of the balance-sheet items that drive operating cash.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BalanceMovements {
    pub delta_ar: f64,
    pub delta_ap: f64,
    pub delta_deferred_income: f64,
    pub delta_provisions: f64,
}

#[inline]
pub fn cf_operating(net_result: f64, depreciation: f64, m: &BalanceMovements) -> f64 {
    net_result + depreciation - m.delta_ar + m.delta_ap + m.delta_deferred_income + m.delta_provisions
}

#[inline]
pub fn cf_investing(capex_additions: f64) -> f64 {
    -capex_additions
}

#[inline]
pub fn net_cash_flow(cf_operating: f64, cf_investing: f64, cf_financing: f64) -> f64 {
    cf_operating + cf_investing + cf_financing
}

// --- Balance check ---

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceCheck {
    pub balanced: bool,
    /// total_assets - (total_liabilities + total_equity)
    pub residual: f64,
}

pub fn balance_check(total_assets: f64, total_liabilities: f64, total_equity: f64, tolerance: f64) -> BalanceCheck {
    let residual = total_assets - (total_liabilities + total_equity);
    BalanceCheck { balanced: residual.abs() <= tolerance, residual }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_accounts_receivable_from_dso() {
        assert_eq!(accounts_receivable(365000.0, 30.0), 30000.0);
    }

    #[test]
    fn test_cogs_and_working_capital() {
        let c = cogs(100.0, 50.0, 25.0);
        assert_eq!(c, 175.0);
        assert_eq!(accounts_payable(365.0 * 2.0, 10.0), 20.0);
        assert_eq!(working_capital(30.0, 20.0, 5.0), 5.0);
    }

    #[rstest]
    #[case(0.0, 0.0, 0.0)]
    #[case(365.0, 365.0, 1.0)]
    #[case(45.0, 60.0, 0.25)]
    fn test_working_capital_items_non_negative(#[case] dso: f64, #[case] dpo: f64, #[case] pct: f64) {
        for base in [0.0, 1.0, 123_456.78, 1e9] {
            assert!(accounts_receivable(base, dso) >= 0.0);
            assert!(accounts_payable(base, dpo) >= 0.0);
            assert!(deferred_revenue(base, pct) >= 0.0);
        }
    }

    #[test]
    fn test_unbalanced_sheet_reports_residual() {
        let check = balance_check(1_000_000.00, 600_000.00, 399_995.00, 0.01);
        assert!(!check.balanced);
        assert_eq!(check.residual, 5.0);
    }

    #[test]
    fn test_balance_within_tolerance() {
        let check = balance_check(100.0, 60.0, 39.995, 0.01);
        assert!(check.balanced);
    }

    #[test]
    fn test_operating_cash_flow_signs() {
        let m = BalanceMovements { delta_ar: 10.0, delta_ap: 4.0, delta_deferred_income: 3.0, delta_provisions: 1.0 };
        assert_eq!(cf_operating(100.0, 20.0, &m), 118.0);
        assert_eq!(cf_investing(50.0), -50.0);
        assert_eq!(net_cash_flow(118.0, -50.0, 7.0), 75.0);
        assert_eq!(cash_end(25.0, 118.0, -50.0, 7.0), 100.0);
    }
}
