//! Resolves the circular cash / interest / net-result loop of each year by
//! fixed-point iteration.
pub mod convergence;
pub mod predicate;

pub use convergence::{ConvergenceEngine, ConvergenceResult, ConvergenceRun, IterationRecord, YearOutcome, YearState};
pub use predicate::{BalanceSheetEquality, ConvergenceCheck, ConvergencePredicate};
