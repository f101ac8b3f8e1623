use prism_projection::analysis::ResolveError;
use prism_projection::display::{format_convergence_log, format_driver_trace};
use prism_projection::store::CatalogIssue;
use prism_projection::*;
use rstest::{fixture, rstest};

const SCHOOL_JSON: &str = r#"{
    "scenario": "base",
    "catalog": [
        { "id": "students", "name": "Students", "formula": "Students[PREV_YEAR] + 10" },
        { "id": "tuition", "name": "Tuition" },
        { "id": "revenue", "name": "Revenue", "formula": "Students * Tuition",
          "dependencies": ["students", "tuition"], "category": "revenue" },
        { "id": "staff", "name": "Staff", "formula": "Revenue * 0.5",
          "dependencies": ["revenue"], "category": "expense" },
        { "id": "rent", "name": "Rent" },
        { "id": "rate", "name": "Rate" }
    ],
    "seeds": [
        { "driver": "students", "year": 2024, "value": 100, "provenance": "imported" },
        { "driver": "tuition", "year": 2025, "value": 10000, "provenance": "manual" },
        { "driver": "tuition", "year": 2026, "value": 10000, "provenance": "manual" },
        { "driver": "tuition", "year": 2027, "value": 10000, "provenance": "manual" },
        { "driver": "rent", "year": 2025, "value": 50000, "provenance": "manual" },
        { "driver": "rent", "year": 2026, "value": 50000, "provenance": "manual" },
        { "driver": "rent", "year": 2027, "value": 50000, "provenance": "manual" },
        { "driver": "rate", "year": 2025, "value": 0, "provenance": "manual" },
        { "driver": "rate", "year": 2026, "value": 0, "provenance": "manual" },
        { "driver": "rate", "year": 2027, "value": 0, "provenance": "manual" }
    ],
    "opening_balances": { "cash": 200000, "retained_earnings": 200000 },
    "config": {
        "horizon": { "historical_start": 2023, "historical_end": 2024, "forecast_end": 2027 },
        "statement_lines": {
            "revenue": "revenue",
            "staff_costs": "staff",
            "rent": "rent",
            "interest_rate": "rate"
        }
    }
}"#;

#[fixture]
fn school() -> ScenarioInput {
    ScenarioInput::from_json(SCHOOL_JSON).unwrap()
}

fn value(outcome: &ProjectionOutcome, driver: &str, year: Year) -> Option<f64> {
    outcome.values.get(&DriverId::from(driver), year)
}

#[rstest]
fn test_school_scenario_end_to_end(school: ScenarioInput) {
    let outcome = run_scenario(&school).unwrap();

    assert!(outcome.evaluation_failures.is_empty(), "{:?}", outcome.evaluation_failures);
    assert!(outcome.catalog_issues.is_empty());
    assert_eq!(value(&outcome, "students", 2024), Some(100.0));
    assert_eq!(value(&outcome, "students", 2027), Some(130.0));
    assert_eq!(value(&outcome, "revenue", 2025), Some(1_100_000.0));
    assert_eq!(value(&outcome, "staff", 2026), Some(600_000.0));
    // Historical years are never projected.
    assert_eq!(value(&outcome, "revenue", 2024), None);

    let run = &outcome.statements;
    assert_eq!(run.years_processed(), vec![2025, 2026, 2027]);
    assert!(run.all_converged());
    assert_eq!(run.total_iterations(), 3);

    let y25 = run.snapshot(2025).unwrap();
    assert_eq!(y25.income.net_result, 500_000.0);
    assert_eq!(y25.balance_sheet.cash, 700_000.0);
    let y27 = run.snapshot(2027).unwrap();
    assert_eq!(y27.cash_flow.cash_begin, 1_250_000.0);
    assert_eq!(y27.balance_sheet.cash, 1_850_000.0);
    assert_eq!(y27.balance_sheet.total_assets, y27.liabilities_and_equity());
}

#[rstest]
fn test_manual_override_survives_and_feeds_statements(mut school: ScenarioInput) {
    school.seeds.push(DriverValue::manual("revenue", 2026, 2_000_000.0));
    let outcome = run_scenario(&school).unwrap();

    assert_eq!(outcome.locked, vec![(DriverId::from("revenue"), 2026)]);
    assert_eq!(value(&outcome, "revenue", 2026), Some(2_000_000.0));
    assert_eq!(value(&outcome, "staff", 2026), Some(1_000_000.0));
    let y26 = outcome.statements.snapshot(2026).unwrap();
    assert_eq!(y26.income.net_result, 950_000.0);
}

#[rstest]
fn test_rerun_is_identical(school: ScenarioInput) {
    let first = run_scenario(&school).unwrap();
    let second = run_scenario(&school).unwrap();
    assert_eq!(first, second);

    // Feeding the filled table back in as seeds changes nothing either.
    let mut reseeded = school.clone();
    reseeded.seeds = first.values.iter().collect();
    let third = run_scenario(&reseeded).unwrap();
    assert_eq!(first.values, third.values);
}

#[rstest]
fn test_cyclic_catalog_aborts_run(school: ScenarioInput) {
    let catalog = DriverCatalog::new(vec![
        Driver::formula("a", "A", "B + 1", &["b"]),
        Driver::formula("b", "B", "A + 1", &["a"]),
    ])
    .unwrap();
    let err = ProjectionEngine::new(&school.config).run(&catalog, Vec::<DriverValue>::new(), &school.opening_balances).unwrap_err();
    match err {
        EngineError::Resolve(ResolveError::CyclicDependency { path }) => {
            assert_eq!(path.first(), path.last());
            assert!(path.contains(&DriverId::from("a")) && path.contains(&DriverId::from("b")));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[rstest]
fn test_invalid_horizon_aborts_run(mut school: ScenarioInput) {
    school.config.horizon.forecast_end = 2024;
    let err = run_scenario(&school).unwrap_err();
    assert!(matches!(err, EngineError::InvalidConfiguration(ref errors) if errors[0].field == "forecast_end"));
    assert!(err.to_string().contains("leaves no forecast years"));
}

#[rstest]
fn test_bad_formula_is_isolated(mut school: ScenarioInput) {
    let mut drivers: Vec<Driver> = school.catalog.drivers().to_vec();
    drivers.push(Driver::formula("margin", "Margin", "Revenue / Rent - Bonus", &["revenue", "rent"]));
    school.catalog = DriverCatalog::new(drivers).unwrap();

    let outcome = run_scenario(&school).unwrap();
    assert_eq!(outcome.evaluation_failures.len(), 3);
    assert!(outcome.evaluation_failures.iter().all(|f| f.driver.as_str() == "margin"));
    assert_eq!(value(&outcome, "margin", 2025), None);
    // Everything else is still projected and the statements still balance.
    assert_eq!(value(&outcome, "revenue", 2027), Some(1_300_000.0));
    assert!(outcome.statements.all_converged());
}

#[rstest]
fn test_undeclared_reference_is_reported(mut school: ScenarioInput) {
    let mut drivers: Vec<Driver> = school.catalog.drivers().to_vec();
    drivers.push(Driver::formula("net", "Net", "Revenue - Rent", &["revenue"]));
    school.catalog = DriverCatalog::new(drivers).unwrap();

    let outcome = run_scenario(&school).unwrap();
    assert!(outcome.catalog_issues.contains(&CatalogIssue::UndeclaredReference {
        driver: DriverId::from("net"),
        referenced: DriverId::from("rent"),
    }));
    assert_eq!(outcome.evaluation_failures.len(), 3);
}

#[rstest]
fn test_interest_loop_is_reported_per_year(mut school: ScenarioInput) {
    for seed in school.seeds.iter_mut().filter(|s| s.driver.as_str() == "rate") {
        seed.value = 0.05;
    }
    let outcome = run_scenario(&school).unwrap();
    let run = &outcome.statements;

    assert_eq!(run.years.len(), 3);
    for year in &run.years {
        assert!(!year.result.converged);
        assert_eq!(year.result.iterations, 3);
        assert!(year.snapshot.is_some());
    }
    assert_eq!(run.years[2].result.seeded_from, Some(2026));

    let log = format_convergence_log(run);
    assert!(log.contains("2025: NOT converged after 3 iteration(s) (seeded from opening balances)"));
    assert!(log.contains("did not converge"));
}

#[rstest]
fn test_parallel_scenarios_are_independent(school: ScenarioInput) {
    let mut high = school.clone();
    high.scenario = "high".to_string();
    for seed in high.seeds.iter_mut().filter(|s| s.driver.as_str() == "tuition") {
        seed.value = 20_000.0;
    }
    let mut broken = school.clone();
    broken.scenario = "broken".to_string();
    broken.config.horizon.historical_end = 2030;

    let results = run_scenarios(&[school.clone(), high, broken]);
    let names: Vec<&str> = results.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["base", "high", "broken"]);

    let base = results[0].1.as_ref().unwrap();
    let high = results[1].1.as_ref().unwrap();
    assert_eq!(value(base, "revenue", 2025), Some(1_100_000.0));
    assert_eq!(value(high, "revenue", 2025), Some(2_200_000.0));
    assert!(results[2].1.is_err());
    assert_eq!(base, &run_scenario(&school).unwrap());
}

#[rstest]
fn test_trace_explains_a_projected_value(school: ScenarioInput) {
    let outcome = run_scenario(&school).unwrap();
    let trace = format_driver_trace(&school.catalog, &outcome.values, &DriverId::from("staff"), 2025);
    assert!(trace.contains("[L1] Staff[550000.000] (Calculated) = Revenue * 0.5"));
    assert!(trace.contains("`--[L2] Revenue[1100000.000] (Calculated) = Students * Tuition"));
    assert!(trace.contains("Tuition[10000.000] (Manual) -> Input"));
}
