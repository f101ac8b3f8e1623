//! Multi-year financial projection core.
//!
//! A scenario is a catalog of drivers (inputs and formula-derived values), a
//! set of seed values and a `ScenarioConfig`. A run resolves the driver graph,
//! fills every forecast (driver, year) by evaluating formulas in dependency
//! order, and then derives income statement, working capital, balance sheet and
//! cash flow per year, iterating the cash / interest loop until the balance
//! sheet balances or the iteration budget runs out.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod display;
pub mod formula;
pub mod scenario;
pub mod solver;
pub mod statements;
pub mod store;
pub mod validation;

pub use compute::{ProjectionPipeline, ValueTable};
pub use config::{CashEngineConfig, Horizon, ScenarioConfig, StatementMapping, WorkingCapitalAssumptions};
pub use scenario::{run_scenario, run_scenarios, EngineError, ProjectionEngine, ProjectionOutcome, ScenarioInput};
pub use solver::{ConvergenceEngine, ConvergenceResult, ConvergenceRun, YearState};
pub use statements::{OpeningBalances, StatementSnapshot};
pub use store::{Driver, DriverCatalog, DriverId, DriverValue, Provenance, Year};
