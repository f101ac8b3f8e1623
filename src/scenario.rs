//! Entry point: resolve -> project drivers -> solve statements, for one
//! scenario or many independent ones in parallel.
use crate::analysis::{self, ResolveError};
use crate::compute::{EvaluationFailure, ProjectionPipeline, ValueTable};
use crate::config::ScenarioConfig;
use crate::solver::{ConvergenceEngine, ConvergenceRun};
use crate::statements::OpeningBalances;
use crate::store::{CatalogIssue, DriverCatalog, DriverId, DriverValue, Year};
use crate::validation::{ValidationError, Validator};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Run-level failures. Everything narrower is reported inside `ProjectionOutcome`.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("Invalid configuration: {}", join(.0))]
    InvalidConfiguration(Vec<ValidationError>),
    #[error("Invalid scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

/// Everything one scenario run needs, as plain in-memory data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub scenario: String,
    pub catalog: DriverCatalog,
    /// Manual and historical values.
    #[serde(default)]
    pub seeds: Vec<DriverValue>,
    #[serde(default)]
    pub opening_balances: OpeningBalances,
    pub config: ScenarioConfig,
}

impl ScenarioInput {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionOutcome {
    /// The evaluation order the pipeline used.
    pub order: Vec<DriverId>,
    /// Seeds plus every calculated value.
    pub values: ValueTable,
    pub evaluation_failures: Vec<EvaluationFailure>,
    /// Formula driver-years kept at their operator-owned value.
    pub locked: Vec<(DriverId, Year)>,
    pub catalog_issues: Vec<CatalogIssue>,
    pub statements: ConvergenceRun,
}

pub struct ProjectionEngine<'a> {
    config: &'a ScenarioConfig,
}

impl<'a> ProjectionEngine<'a> {
    pub fn new(config: &'a ScenarioConfig) -> Self {
        Self { config }
    }

    /// A cyclic catalog or an unusable horizon aborts the run; everything
    /// else (bad formulas, missing inputs, out-of-range assumptions,
    /// non-convergence) is reported per driver-year or per year.
    #[instrument(skip_all, fields(drivers = catalog.count()))]
    pub fn run(
        &self,
        catalog: &DriverCatalog,
        seeds: impl IntoIterator<Item = DriverValue>,
        opening: &OpeningBalances,
    ) -> Result<ProjectionOutcome, EngineError> {
        let validation = Validator::new(self.config).validate();
        if !validation.fatal.is_empty() {
            return Err(EngineError::InvalidConfiguration(validation.fatal));
        }
        for err in &validation.per_year {
            warn!(%err, "configuration error; affected years will fail");
        }

        let catalog_issues = catalog.validate();
        if !catalog_issues.is_empty() {
            warn!(issues = catalog_issues.len(), "driver catalog has issues");
        }

        let order = analysis::sort(catalog)?;
        let horizon = &self.config.horizon;
        let years = horizon.forecast_years();
        info!(first = *years.start(), last = *years.end(), "projection run starting");

        let mut values = ValueTable::from_values(seeds);
        let report = ProjectionPipeline::new(catalog, &order)
            .with_historical_end(horizon.historical_end)
            .run(years.clone(), &mut values);

        let statements = ConvergenceEngine::new(self.config).run(&values, years, opening);

        Ok(ProjectionOutcome {
            order,
            values,
            evaluation_failures: report.failures,
            locked: report.locked,
            catalog_issues,
            statements,
        })
    }
}

/// Runs one scenario with its own configuration.
pub fn run_scenario(input: &ScenarioInput) -> Result<ProjectionOutcome, EngineError> {
    ProjectionEngine::new(&input.config).run(&input.catalog, input.seeds.iter().cloned(), &input.opening_balances)
}

/// Runs independent scenarios in parallel. Scenarios share no state; each run
/// is sequential inside. Results come back in input order.
pub fn run_scenarios(inputs: &[ScenarioInput]) -> Vec<(String, Result<ProjectionOutcome, EngineError>)> {
    inputs
        .par_iter()
        .map(|input| (input.scenario.clone(), run_scenario(input)))
        .collect()
}
