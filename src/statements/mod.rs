//! Per-year financial statements derived from driver values.
//!
//! `derive` holds the line-item arithmetic. This module gathers a year's raw
//! inputs from the `ValueTable` and assembles a full `StatementSnapshot` from
//! them, the prior year's carry-forward and an interest seed.
pub mod derive;
pub mod snapshot;

pub use snapshot::{
    BalanceSheet, CarryForward, CashFlowStatement, IncomeStatement, OpeningBalances, StatementSnapshot, WorkingCapital,
};

use crate::compute::ValueTable;
use crate::config::{StatementMapping, WorkingCapitalAssumptions};
use crate::store::{DriverId, Year};
use crate::validation::rules::working_capital::{check_fraction, validate_working_capital};
use crate::validation::ValidationError;
use derive::BalanceMovements;
use serde::{Deserialize, Serialize};

/// Raw values of one year, read from the value table through a `StatementMapping`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct YearInputs {
    pub revenue: f64,
    pub staff_costs: f64,
    pub rent: f64,
    pub other_opex: f64,
    pub depreciation: f64,
    pub capex_additions: f64,
    /// Closing provisions; `None` carries the prior balance unchanged.
    pub provisions: Option<f64>,
    pub financing_cash_flow: f64,
    pub interest_rate: f64,
    pub tax_rate: f64,
}

impl YearInputs {
    pub fn gather(mapping: &StatementMapping, table: &ValueTable, year: Year) -> Result<Self, ValidationError> {
        let line = |field: &str, id: Option<&DriverId>| -> Result<Option<f64>, ValidationError> {
            let Some(id) = id else { return Ok(None) };
            match table.get(id, year) {
                Some(v) if v.is_finite() => Ok(Some(v)),
                Some(v) => Err(ValidationError::missing_input(
                    field,
                    format!("driver '{}' has non-finite value {} in {}", id, v, year),
                )),
                None => Err(ValidationError::missing_input(field, format!("no value for driver '{}' in {}", id, year))),
            }
        };
        let zero_if_unmapped = |field: &str, id: Option<&DriverId>| line(field, id).map(|v| v.unwrap_or(0.0));

        Ok(Self {
            revenue: zero_if_unmapped("revenue", Some(&mapping.revenue))?,
            staff_costs: zero_if_unmapped("staff_costs", mapping.staff_costs.as_ref())?,
            rent: zero_if_unmapped("rent", mapping.rent.as_ref())?,
            other_opex: zero_if_unmapped("other_opex", mapping.other_opex.as_ref())?,
            depreciation: zero_if_unmapped("depreciation", mapping.depreciation.as_ref())?,
            capex_additions: zero_if_unmapped("capex_additions", mapping.capex_additions.as_ref())?,
            provisions: line("provisions", mapping.provisions.as_ref())?,
            financing_cash_flow: zero_if_unmapped("financing_cash_flow", mapping.financing_cash_flow.as_ref())?,
            interest_rate: zero_if_unmapped("interest_rate", mapping.interest_rate.as_ref())?,
            tax_rate: zero_if_unmapped("tax_rate", mapping.tax_rate.as_ref())?,
        })
    }
}

/// Tax on positive pre-tax profit only.
#[inline]
pub fn tax(pre_tax_result: f64, rate: f64) -> f64 {
    pre_tax_result.max(0.0) * rate
}

/// Interest on the average of opening and closing cash.
#[inline]
pub fn interest_on_cash(rate: f64, cash_begin: f64, cash_end: f64) -> f64 {
    rate * (cash_begin + cash_end) / 2.0
}

/// Builds one year's statements.
///
/// The cash flow is computed from `interest_seed`; the reported income
/// statement and retained earnings use the interest earned on the resulting
/// cash. When the two agree, the only remaining balance-sheet residual is
/// whatever the opening balances and financing flows bring in.
pub fn derive_snapshot(
    year: Year,
    inputs: &YearInputs,
    wc: &WorkingCapitalAssumptions,
    prior: &CarryForward,
    interest_seed: f64,
) -> Result<StatementSnapshot, ValidationError> {
    if let Some(err) = validate_working_capital(wc).into_iter().next() {
        return Err(err);
    }
    check_fraction("tax_rate", inputs.tax_rate)?;

    // P&L above the circular line
    let cogs = derive::cogs(inputs.staff_costs, inputs.rent, inputs.other_opex);
    let ebitda = inputs.revenue - cogs;
    let ebit = ebitda - inputs.depreciation;

    // Working capital
    let ar = derive::accounts_receivable(inputs.revenue, wc.dso_days);
    let ap = derive::accounts_payable(cogs, wc.dpo_days);
    let deferred = derive::deferred_revenue(inputs.revenue, wc.deferred_revenue_pct);
    let provisions = inputs.provisions.unwrap_or(prior.provisions);

    // Cash flow from the seeded interest
    let seeded_pre_tax = ebit + interest_seed;
    let seeded_net_result = seeded_pre_tax - tax(seeded_pre_tax, inputs.tax_rate);
    let movements = BalanceMovements {
        delta_ar: ar - prior.accounts_receivable,
        delta_ap: ap - prior.accounts_payable,
        delta_deferred_income: deferred - prior.deferred_revenue,
        delta_provisions: provisions - prior.provisions,
    };
    let cf_operating = derive::cf_operating(seeded_net_result, inputs.depreciation, &movements);
    let cf_investing = derive::cf_investing(inputs.capex_additions);
    let cf_financing = inputs.financing_cash_flow;
    let net_cash_flow = derive::net_cash_flow(cf_operating, cf_investing, cf_financing);
    let cash_end = derive::cash_end(prior.cash, cf_operating, cf_investing, cf_financing);

    // Reported result from the interest actually earned on that cash
    let interest_income = interest_on_cash(inputs.interest_rate, prior.cash, cash_end);
    let pre_tax_result = ebit + interest_income;
    let tax_charge = tax(pre_tax_result, inputs.tax_rate);
    let net_result = pre_tax_result - tax_charge;

    // Balance sheet
    let tangible_assets = prior.tangible_assets + inputs.capex_additions;
    let accumulated_depreciation = prior.accumulated_depreciation + inputs.depreciation;
    let net_fixed_assets = derive::net_fixed_assets(tangible_assets, accumulated_depreciation);
    let total_current_assets = derive::total_current_assets(cash_end, ar);
    let total_current_liabilities = derive::total_current_liabilities(ap, deferred);
    let retained_earnings = derive::retained_earnings(prior.retained_earnings, net_result);

    Ok(StatementSnapshot {
        year,
        income: IncomeStatement {
            revenue: inputs.revenue,
            staff_costs: inputs.staff_costs,
            rent: inputs.rent,
            other_opex: inputs.other_opex,
            cogs,
            ebitda,
            depreciation: inputs.depreciation,
            ebit,
            interest_income,
            pre_tax_result,
            tax: tax_charge,
            net_result,
        },
        working_capital: WorkingCapital {
            accounts_receivable: ar,
            accounts_payable: ap,
            deferred_revenue: deferred,
            working_capital: derive::working_capital(ar, ap, deferred),
        },
        balance_sheet: BalanceSheet {
            cash: cash_end,
            accounts_receivable: ar,
            total_current_assets,
            tangible_assets,
            accumulated_depreciation,
            net_fixed_assets,
            total_assets: derive::total_assets(total_current_assets, net_fixed_assets),
            accounts_payable: ap,
            deferred_revenue: deferred,
            total_current_liabilities,
            provisions,
            total_liabilities: derive::total_liabilities(total_current_liabilities, provisions),
            retained_earnings,
            total_equity: derive::total_equity(retained_earnings),
        },
        cash_flow: CashFlowStatement {
            cash_begin: prior.cash,
            net_result: seeded_net_result,
            depreciation: inputs.depreciation,
            delta_ar: movements.delta_ar,
            delta_ap: movements.delta_ap,
            delta_deferred_income: movements.delta_deferred_income,
            delta_provisions: movements.delta_provisions,
            cf_operating,
            cf_investing,
            cf_financing,
            net_cash_flow,
            cash_end,
        },
        interest_seed,
    })
}
