use crate::analysis::topology;
use crate::compute::ValueTable;
use crate::solver::{ConvergenceRun, YearState};
use crate::store::{DriverCatalog, DriverId, Year};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the dependency tree behind one driver-year with the stored values.
pub fn format_driver_trace(catalog: &DriverCatalog, table: &ValueTable, target: &DriverId, year: Year) -> String {
    let mut tracer = Tracer { catalog, table, year, visited_at_level: HashMap::new(), output: String::new() };

    match catalog.get(target) {
        Some(driver) => {
            let _ = writeln!(tracer.output, "AUDIT TRACE for driver '{}' in {}:", driver.name, year);
            let _ = writeln!(tracer.output, "--------------------------------------------------");
            tracer.trace_driver(target, 1, "");

            let affected = topology::downstream_of(catalog, std::slice::from_ref(target));
            let names: Vec<&str> = affected
                .iter()
                .filter(|id| *id != target)
                .filter_map(|id| catalog.get(id).map(|d| d.name.as_str()))
                .collect();
            if !names.is_empty() {
                let _ = writeln!(tracer.output, "--------------------------------------------------");
                let _ = writeln!(tracer.output, "Affects: {}", names.join(", "));
            }
        }
        None => {
            let _ = writeln!(tracer.output, "Error: Unknown driver '{}'", target);
        }
    }
    tracer.output
}

struct Tracer<'a> {
    catalog: &'a DriverCatalog,
    table: &'a ValueTable,
    year: Year,
    visited_at_level: HashMap<DriverId, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_driver(&mut self, id: &DriverId, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(id) {
            let _ = writeln!(self.output, "{}-> (Ref to L{})", prefix, first_seen);
            return;
        }
        self.visited_at_level.insert(id.clone(), level);

        let Some(driver) = self.catalog.get(id) else {
            let _ = writeln!(self.output, "{}[L{}] {} (not in catalog)", prefix, level, id);
            return;
        };
        let header = format!("[L{}] {}{}", level, driver.name, self.format_value(id));

        match &driver.formula {
            Some(formula) => {
                let _ = writeln!(self.output, "{}{} = {}", prefix, header, formula);
                let stem = build_child_stem(prefix);
                let count = driver.dependencies.len();
                for (i, dep) in driver.dependencies.iter().enumerate() {
                    let connector = if i == count - 1 { "`--" } else { "|--" };
                    self.trace_driver(dep, level + 1, &format!("{}{}", stem, connector));
                }
            }
            None => {
                let _ = writeln!(self.output, "{}{} -> Input", prefix, header);
            }
        }
    }

    fn format_value(&self, id: &DriverId) -> String {
        match self.table.cell(id, self.year) {
            Some(cell) => format!("[{:.3}] ({:?})", cell.value, cell.provenance),
            None => "[?]".to_string(),
        }
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}

/// Per-year iteration log of a statement run.
pub fn format_convergence_log(run: &ConvergenceRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "CONVERGENCE LOG:");
    let _ = writeln!(out, "--------------------------------------------------");

    for outcome in &run.years {
        let r = &outcome.result;
        let seeded = match r.seeded_from {
            Some(y) => format!("seeded from {}", y),
            None => "seeded from opening balances".to_string(),
        };
        let status = match r.state {
            YearState::Converged => format!("converged after {} iteration(s)", r.iterations),
            YearState::Exhausted => format!("NOT converged after {} iteration(s)", r.iterations),
            YearState::Failed => "FAILED".to_string(),
            YearState::Seeded | YearState::Iterating => format!("{:?}", r.state),
        };
        let _ = writeln!(out, "{}: {} ({})", r.year, status, seeded);

        if let Some(err) = &r.last_error {
            let _ = writeln!(out, "|  {}", err);
        }
        if !r.trace.is_empty() {
            let _ = writeln!(out, "|   iter        seed     cash_end     residual");
            for rec in &r.trace {
                let _ = writeln!(
                    out,
                    "|  {: >5}{: >12.4e} {: >12.4e} {: >12.4e}",
                    rec.iteration, rec.interest_seed, rec.cash_end, rec.residual
                );
            }
        }
    }
    out
}
