//! Operator-authored formulas, treated as data.
//!
//! Evaluation is a pure pipeline over text: temporal tokens are replaced by
//! year numbers, driver references by their values from the `ValueTable`, and
//! the resulting closed expression is tokenized, parsed and folded to a single
//! finite number. Nothing in here can reach beyond arithmetic.
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod substitute;

pub use error::FormulaError;
pub use substitute::{FormulaBinding, CURRENT_YEAR, PREV_YEAR};

use crate::compute::ValueTable;
use crate::store::Year;
use regex::Regex;
use std::collections::HashMap;

impl FormulaBinding {
    /// Substitutes, parses and evaluates the formula for `year`.
    pub fn evaluate(&self, year: Year, table: &ValueTable) -> Result<f64, FormulaError> {
        let closed = self.substitute(year, table)?;
        evaluate_closed(self.formula(), &closed)
    }
}

/// Evaluates already-substituted text, attributing failures to `original`.
pub fn evaluate_closed(original: &str, closed: &str) -> Result<f64, FormulaError> {
    let expr = parser::parse(closed).map_err(|reason| FormulaError::evaluation(original, reason))?;
    eval::evaluate(&expr).map_err(|reason| FormulaError::evaluation(original, reason))
}

/// Whole-word matcher for display names across many formulas.
///
/// A name's pattern is compiled at most once, and only after a plain substring
/// check has found the name somewhere in a formula.
#[derive(Default)]
pub struct NameMatcher {
    patterns: HashMap<String, Option<Regex>>,
}

impl NameMatcher {
    /// True when `formula` contains `name` as a whole word.
    pub fn mentions(&mut self, formula: &str, name: &str) -> bool {
        if name.is_empty() || !formula.contains(name) {
            return false;
        }
        let pattern = self
            .patterns
            .entry(name.to_string())
            .or_insert_with(|| substitute::name_pattern(name).ok());
        pattern.as_ref().is_some_and(|re| re.is_match(formula))
    }

    #[cfg(test)]
    fn compiled(&self) -> usize {
        self.patterns.len()
    }
}
