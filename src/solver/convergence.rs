//! Per-year fixed-point solve of the circular cash / interest / result loop.
use super::predicate::ConvergencePredicate;
use crate::compute::ValueTable;
use crate::config::{CashEngineConfig, ScenarioConfig, StatementMapping, WorkingCapitalAssumptions};
use crate::statements::{derive_snapshot, interest_on_cash, CarryForward, OpeningBalances, StatementSnapshot, YearInputs};
use crate::store::Year;
use crate::validation::rules::working_capital::validate_cash_engine;
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearState {
    Seeded,
    Iterating,
    Converged,
    /// Ran out of iterations; the last snapshot is still returned.
    Exhausted,
    /// Aborted before producing a snapshot.
    Failed,
}

impl YearState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, YearState::Converged | YearState::Exhausted | YearState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub interest_seed: f64,
    pub cash_end: f64,
    pub residual: f64,
}

/// Diagnostics of one year's solve. Never patched after the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceResult {
    pub year: Year,
    pub state: YearState,
    pub converged: bool,
    pub iterations: u32,
    pub last_error: Option<String>,
    /// `None` only for failed years, which have no balance sheet.
    pub residual: Option<f64>,
    /// Year whose snapshot seeded this one; `None` means the opening balances.
    pub seeded_from: Option<Year>,
    pub trace: Vec<IterationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearOutcome {
    pub result: ConvergenceResult,
    pub snapshot: Option<StatementSnapshot>,
}

/// The full-horizon result of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceRun {
    pub years: Vec<YearOutcome>,
}

impl ConvergenceRun {
    pub fn all_converged(&self) -> bool {
        self.years.iter().all(|y| y.result.converged)
    }

    pub fn total_iterations(&self) -> u32 {
        self.years.iter().map(|y| y.result.iterations).sum()
    }

    pub fn years_processed(&self) -> Vec<Year> {
        self.years.iter().map(|y| y.result.year).collect()
    }

    pub fn outcome(&self, year: Year) -> Option<&YearOutcome> {
        self.years.iter().find(|y| y.result.year == year)
    }

    pub fn snapshot(&self, year: Year) -> Option<&StatementSnapshot> {
        self.outcome(year).and_then(|y| y.snapshot.as_ref())
    }
}

/// Drives `Seeded -> Iterating -> Converged | Exhausted | Failed` for each year.
///
/// Feedback policy: the first iteration assumes closing cash equals opening
/// cash. Every later iteration seeds interest with the interest earned on the
/// previous iteration's closing cash. Nothing else is fed back; all other lines
/// are recomputed from the value table and the carry-forward each time.
pub struct ConvergenceEngine<'a> {
    cash_engine: &'a CashEngineConfig,
    working_capital: &'a WorkingCapitalAssumptions,
    mapping: &'a StatementMapping,
    predicate: Box<dyn ConvergencePredicate>,
    config_error: Option<ValidationError>,
}

impl<'a> ConvergenceEngine<'a> {
    pub fn new(config: &'a ScenarioConfig) -> Self {
        Self {
            cash_engine: &config.cash_engine,
            working_capital: &config.working_capital,
            mapping: &config.statement_lines,
            predicate: config.cash_engine.convergence_check.predicate(),
            config_error: validate_cash_engine(&config.cash_engine).into_iter().next(),
        }
    }

    /// Solves `years` in increasing order. Every year gets an outcome; an
    /// exhausted year still seeds the next one, a failed year is skipped and the
    /// next year starts from the last accepted balances.
    #[instrument(skip_all, fields(first = *years.start(), last = *years.end()))]
    pub fn run(&self, table: &ValueTable, years: RangeInclusive<Year>, opening: &OpeningBalances) -> ConvergenceRun {
        let mut run = ConvergenceRun::default();
        let mut carry = *opening;
        let mut seeded_from = None;

        for year in years {
            let outcome = self.solve_year(year, table, &carry, seeded_from);
            if let Some(snapshot) = &outcome.snapshot {
                carry = snapshot.carry_forward();
                seeded_from = Some(year);
            }
            run.years.push(outcome);
        }

        info!(
            years = run.years.len(),
            all_converged = run.all_converged(),
            total_iterations = run.total_iterations(),
            "statement run complete"
        );
        run
    }

    pub fn solve_year(
        &self,
        year: Year,
        table: &ValueTable,
        carry: &CarryForward,
        seeded_from: Option<Year>,
    ) -> YearOutcome {
        let mut state = YearState::Seeded;
        let mut iterations = 0;
        let mut trace = Vec::new();
        let mut last: Option<StatementSnapshot> = None;

        if let Some(err) = &self.config_error {
            return self.failed(year, seeded_from, err.to_string());
        }
        let inputs = match YearInputs::gather(self.mapping, table, year) {
            Ok(i) => i,
            Err(err) => return self.failed(year, seeded_from, err.to_string()),
        };
        let mut seed = interest_on_cash(inputs.interest_rate, carry.cash, carry.cash);

        while !state.is_terminal() {
            match state {
                YearState::Seeded => state = YearState::Iterating,
                YearState::Iterating => {
                    let snapshot = match derive_snapshot(year, &inputs, self.working_capital, carry, seed) {
                        Ok(s) => s,
                        Err(err) => return self.failed(year, seeded_from, err.to_string()),
                    };
                    iterations += 1;

                    let residual = self.predicate.residual(&snapshot);
                    debug!(year, iteration = iterations, seed, residual, "cash engine iteration");
                    trace.push(IterationRecord {
                        iteration: iterations,
                        interest_seed: seed,
                        cash_end: snapshot.cash_flow.cash_end,
                        residual,
                    });

                    if self.predicate.is_satisfied(&snapshot, self.cash_engine.tolerance) {
                        state = YearState::Converged;
                    } else if iterations >= self.cash_engine.max_iterations {
                        state = YearState::Exhausted;
                    } else {
                        seed = snapshot.income.interest_income;
                    }
                    last = Some(snapshot);
                }
                YearState::Converged | YearState::Exhausted | YearState::Failed => {}
            }
        }

        let residual = trace.last().map(|r| r.residual);
        let last_error = match state {
            YearState::Exhausted => {
                let msg = format!(
                    "{} did not converge after {} iteration(s); residual {:.4} exceeds tolerance {}",
                    self.predicate.name(),
                    iterations,
                    residual.unwrap_or_default(),
                    self.cash_engine.tolerance
                );
                warn!(year, iterations, residual, "year exhausted");
                Some(msg)
            }
            _ => {
                info!(year, iterations, residual, "year converged");
                None
            }
        };

        YearOutcome {
            result: ConvergenceResult {
                year,
                state,
                converged: state == YearState::Converged,
                iterations,
                last_error,
                residual,
                seeded_from,
                trace,
            },
            snapshot: last,
        }
    }

    fn failed(&self, year: Year, seeded_from: Option<Year>, reason: String) -> YearOutcome {
        warn!(year, %reason, "year failed");
        YearOutcome {
            result: ConvergenceResult {
                year,
                state: YearState::Failed,
                converged: false,
                iterations: 0,
                last_error: Some(reason),
                residual: None,
                seeded_from,
                trace: Vec::new(),
            },
            snapshot: None,
        }
    }
}
