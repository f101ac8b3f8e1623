//! A synchronous, single-threaded driver projection pipeline.
use crate::compute::table::ValueTable;
use crate::formula::{FormulaBinding, FormulaError};
use crate::store::{Driver, DriverCatalog, DriverId, Year};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::{debug, info, warn};

/// A driver-year that could not be evaluated. The run carried on without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationFailure {
    pub driver: DriverId,
    pub year: Year,
    pub error: FormulaError,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub failures: Vec<EvaluationFailure>,
    /// Number of values written with calculated provenance.
    pub calculated: usize,
    /// Driver-years left alone because an operator-owned value was present.
    pub locked: Vec<(DriverId, Year)>,
}

pub struct ProjectionPipeline<'a> {
    catalog: &'a DriverCatalog,
    order: &'a [DriverId],
    historical_end: Option<Year>,
}

impl<'a> ProjectionPipeline<'a> {
    /// `order` must be a topological order of `catalog`, as produced by `analysis::sort`.
    pub fn new(catalog: &'a DriverCatalog, order: &'a [DriverId]) -> Self {
        Self { catalog, order, historical_end: None }
    }

    /// Years up to and including `year` are historical and never evaluated.
    pub fn with_historical_end(mut self, year: Year) -> Self {
        self.historical_end = Some(year);
        self
    }

    /// Evaluates every formula driver for every year of `years`.
    ///
    /// Driver-major, year-minor: all years of a driver are settled before the
    /// next driver starts, so a dependent always sees its dependencies' values
    /// for the same year, and a driver can read its own earlier years through
    /// `Name[PREV_YEAR]`. Failures are recorded and skipped; a failed
    /// driver-year loses any calculated value it held before the run.
    pub fn run(&self, years: RangeInclusive<Year>, table: &mut ValueTable) -> PipelineReport {
        let mut report = PipelineReport::default();
        let first = match self.historical_end {
            Some(end) => (*years.start()).max(end + 1),
            None => *years.start(),
        };
        let last = *years.end();
        if first > *years.start() {
            debug!(requested = *years.start(), first, "skipping historical years");
        }

        for id in self.order {
            let Some(driver) = self.catalog.get(id) else { continue };
            if !driver.is_formula() {
                continue;
            }
            let binding = match self.bind(driver) {
                Ok(b) => b,
                Err(error) => {
                    for year in first..=last {
                        if table.is_locked(&driver.id, year) {
                            report.locked.push((driver.id.clone(), year));
                            continue;
                        }
                        self.record(&mut report, table, driver, year, error.clone());
                    }
                    continue;
                }
            };

            for year in first..=last {
                if table.is_locked(&driver.id, year) {
                    debug!(driver = %driver.id, year, "locked value kept");
                    report.locked.push((driver.id.clone(), year));
                    continue;
                }
                match binding.evaluate(year, table) {
                    Ok(value) => {
                        debug!(driver = %driver.id, year, value, "driver evaluated");
                        table.set_calculated(&driver.id, year, value);
                        report.calculated += 1;
                    }
                    Err(error) => self.record(&mut report, table, driver, year, error),
                }
            }
        }

        info!(
            drivers = self.order.len(),
            calculated = report.calculated,
            failures = report.failures.len(),
            "projection pipeline complete"
        );
        report
    }

    fn bind(&self, driver: &Driver) -> Result<FormulaBinding, FormulaError> {
        let formula = driver.formula.as_deref().unwrap_or_default();
        let deps = driver
            .dependencies
            .iter()
            .map(|dep| (dep, self.catalog.get(dep).map(|d| d.name.as_str())));
        FormulaBinding::new(formula, (&driver.id, driver.name.as_str()), deps)
    }

    fn record(&self, report: &mut PipelineReport, table: &mut ValueTable, driver: &Driver, year: Year, error: FormulaError) {
        warn!(driver = %driver.id, year, %error, "driver evaluation failed");
        if table.remove_calculated(&driver.id, year) {
            debug!(driver = %driver.id, year, "stale calculated value dropped");
        }
        report.failures.push(EvaluationFailure { driver: driver.id.clone(), year, error });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sort;
    use crate::store::{DriverValue, Provenance};

    fn school() -> DriverCatalog {
        DriverCatalog::new(vec![
            Driver::formula("revenue", "Revenue", "Students * Tuition", &["students", "tuition"]),
            Driver::input("students", "Students"),
            Driver::input("tuition", "Tuition"),
        ])
        .unwrap()
    }

    #[test]
    fn test_revenue_from_students_and_tuition() {
        let catalog = school();
        let order = sort(&catalog).unwrap();
        let mut table = ValueTable::from_values([
            DriverValue::manual("students", 2025, 500.0),
            DriverValue::manual("tuition", 2025, 1000.0),
        ]);
        let report = ProjectionPipeline::new(&catalog, &order).run(2025..=2025, &mut table);
        assert!(report.failures.is_empty());
        let cell = table.cell(&DriverId::from("revenue"), 2025).unwrap();
        assert_eq!(cell.value, 500000.0);
        assert_eq!(cell.provenance, Provenance::Calculated);
    }

    #[test]
    fn test_failure_does_not_block_other_years_or_drivers() {
        let catalog = DriverCatalog::new(vec![
            Driver::input("a", "A"),
            Driver::input("b", "B"),
            Driver::formula("ratio", "Ratio", "A / B", &["a", "b"]),
            Driver::formula("double", "Double", "A * 2", &["a"]),
        ])
        .unwrap();
        let order = sort(&catalog).unwrap();
        let mut table = ValueTable::from_values([
            DriverValue::manual("a", 2025, 10.0),
            DriverValue::manual("b", 2025, 0.0),
            DriverValue::manual("a", 2026, 10.0),
            DriverValue::manual("b", 2026, 4.0),
        ]);
        let report = ProjectionPipeline::new(&catalog, &order).run(2025..=2026, &mut table);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].year, 2025);
        assert!(matches!(report.failures[0].error, FormulaError::FormulaEvaluationError { .. }));
        assert_eq!(table.get(&DriverId::from("ratio"), 2025), None);
        assert_eq!(table.get(&DriverId::from("ratio"), 2026), Some(2.5));
        assert_eq!(table.get(&DriverId::from("double"), 2025), Some(20.0));
    }

    #[test]
    fn test_prev_year_self_reference_compounds() {
        let catalog = DriverCatalog::new(vec![
            Driver::input("growth", "Growth"),
            Driver::formula("revenue", "Revenue", "Revenue[PREV_YEAR] * (1 + Growth)", &["growth"]),
        ])
        .unwrap();
        let order = sort(&catalog).unwrap();
        let mut table = ValueTable::from_values([
            DriverValue::manual("revenue", 2024, 100.0),
            DriverValue::manual("growth", 2025, 0.5),
            DriverValue::manual("growth", 2026, 0.5),
        ]);
        let report = ProjectionPipeline::new(&catalog, &order)
            .with_historical_end(2024)
            .run(2024..=2026, &mut table);
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert_eq!(table.get(&DriverId::from("revenue"), 2024), Some(100.0));
        assert_eq!(table.get(&DriverId::from("revenue"), 2025), Some(150.0));
        assert_eq!(table.get(&DriverId::from("revenue"), 2026), Some(225.0));
    }

    #[test]
    fn test_missing_dependency_is_reported_not_zeroed() {
        let catalog = school();
        let order = sort(&catalog).unwrap();
        let mut table = ValueTable::from_values([DriverValue::manual("students", 2025, 500.0)]);
        let report = ProjectionPipeline::new(&catalog, &order).run(2025..=2025, &mut table);
        assert_eq!(
            report.failures[0].error,
            FormulaError::MissingDependencyValue { driver: DriverId::from("tuition"), year: 2025 }
        );
        assert_eq!(table.get(&DriverId::from("revenue"), 2025), None);
    }

    #[test]
    fn test_failed_evaluation_drops_stale_calculated_value() {
        let mut drivers = school().drivers().to_vec();
        drivers.push(Driver::formula("fees", "Fees", "Revenue * 0.1", &["revenue"]));
        let catalog = DriverCatalog::new(drivers).unwrap();
        let order = sort(&catalog).unwrap();
        let revenue = DriverId::from("revenue");
        let mut table = ValueTable::from_values([
            DriverValue::manual("students", 2025, 500.0),
            DriverValue { driver: revenue.clone(), year: 2025, value: 500000.0, provenance: Provenance::Calculated },
        ]);
        let report = ProjectionPipeline::new(&catalog, &order).run(2025..=2025, &mut table);

        assert_eq!(
            report.failures[0].error,
            FormulaError::MissingDependencyValue { driver: DriverId::from("tuition"), year: 2025 }
        );
        assert_eq!(table.get(&revenue, 2025), None);
        // Downstream sees the gap, not last run's revenue.
        assert_eq!(
            report.failures[1].error,
            FormulaError::MissingDependencyValue { driver: revenue.clone(), year: 2025 }
        );
        assert_eq!(table.get(&DriverId::from("fees"), 2025), None);
    }

    #[test]
    fn test_manual_override_is_kept() {
        let catalog = school();
        let order = sort(&catalog).unwrap();
        let mut table = ValueTable::from_values([
            DriverValue::manual("students", 2025, 500.0),
            DriverValue::manual("tuition", 2025, 1000.0),
            DriverValue::manual("revenue", 2025, 1.0),
        ]);
        let report = ProjectionPipeline::new(&catalog, &order).run(2025..=2025, &mut table);
        assert_eq!(report.locked, vec![(DriverId::from("revenue"), 2025)]);
        assert_eq!(table.get(&DriverId::from("revenue"), 2025), Some(1.0));
    }

    #[test]
    fn test_rerun_is_bit_identical() {
        let catalog = DriverCatalog::new(vec![
            Driver::input("growth", "Growth"),
            Driver::formula("revenue", "Revenue", "Revenue[PREV_YEAR] * (1 + Growth) / 3", &["growth"]),
        ])
        .unwrap();
        let order = sort(&catalog).unwrap();
        let seeds = vec![
            DriverValue::manual("revenue", 2024, 1234.5678),
            DriverValue::manual("growth", 2025, 0.0731),
            DriverValue::manual("growth", 2026, 0.011),
        ];
        let run = || {
            let mut table = ValueTable::from_values(seeds.clone());
            ProjectionPipeline::new(&catalog, &order).with_historical_end(2024).run(2025..=2026, &mut table);
            table.calculated().map(|v| v.value.to_bits()).collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first.len(), 2);
        assert_eq!(first, run());
    }
}
