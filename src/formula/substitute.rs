//! Replaces temporal tokens and driver references in formula text with numeric literals.
use super::error::FormulaError;
use super::{eval, parser};
use crate::compute::ValueTable;
use crate::store::{DriverId, Year};
use regex::Regex;

pub const PREV_YEAR: &str = "PREV_YEAR";
pub const CURRENT_YEAR: &str = "CURRENT_YEAR";

/// Builds the whole-word pattern for a display name, optionally followed by a
/// bracketed year index such as `Revenue[PREV_YEAR]`.
pub(crate) fn name_pattern(name: &str) -> Result<Regex, regex::Error> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let lead = if name.chars().next().is_some_and(is_word) { r"\b" } else { "" };
    let trail = if name.chars().last().is_some_and(is_word) { r"\b" } else { "" };
    Regex::new(&format!(r"{}{}{}(?:\s*\[([^\[\]]*)\])?", lead, regex::escape(name), trail))
}

struct Binding {
    id: DriverId,
    pattern: Regex,
    name_len: usize,
    is_self: bool,
}

/// A formula prepared for repeated evaluation across years.
///
/// Patterns are compiled once per driver; the pipeline then evaluates the same
/// binding for every year of the horizon.
pub struct FormulaBinding {
    formula: String,
    prev_year: Regex,
    current_year: Regex,
    bindings: Vec<Binding>,
    unknown: Vec<DriverId>,
}

impl FormulaBinding {
    /// `dependencies` pairs each declared id with its display name, or `None`
    /// when the id is not in the catalog.
    pub fn new<'a>(
        formula: &str,
        driver: (&DriverId, &str),
        dependencies: impl IntoIterator<Item = (&'a DriverId, Option<&'a str>)>,
    ) -> Result<Self, FormulaError> {
        let compile = |pattern: &str| Regex::new(pattern).map_err(|e| FormulaError::evaluation(formula, e.to_string()));
        let prev_year = compile(&format!(r"\b{}\b", PREV_YEAR))?;
        let current_year = compile(&format!(r"\b{}\b", CURRENT_YEAR))?;

        let mut bindings = Vec::new();
        let mut unknown = Vec::new();
        for (id, name) in dependencies {
            match name {
                Some(name) if !name.is_empty() => bindings.push(Binding {
                    id: id.clone(),
                    pattern: name_pattern(name).map_err(|e| FormulaError::evaluation(formula, e.to_string()))?,
                    name_len: name.len(),
                    is_self: false,
                }),
                Some(_) => {}
                None => unknown.push(id.clone()),
            }
        }
        let (own_id, own_name) = driver;
        if !own_name.is_empty() && !bindings.iter().any(|b| &b.id == own_id) {
            bindings.push(Binding {
                id: own_id.clone(),
                pattern: name_pattern(own_name).map_err(|e| FormulaError::evaluation(formula, e.to_string()))?,
                name_len: own_name.len(),
                is_self: true,
            });
        }
        // Longest names first so "Revenue Growth" is consumed before "Revenue".
        bindings.sort_by(|a, b| b.name_len.cmp(&a.name_len));

        Ok(Self { formula: formula.to_string(), prev_year, current_year, bindings, unknown })
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// Produces the closed arithmetic text for `year`.
    pub fn substitute(&self, year: Year, table: &ValueTable) -> Result<String, FormulaError> {
        if let Some(id) = self.unknown.first() {
            return Err(FormulaError::MissingDependencyValue { driver: id.clone(), year });
        }

        let text = self.prev_year.replace_all(&self.formula, (year - 1).to_string());
        let mut text = self.current_year.replace_all(&text, year.to_string()).into_owned();

        for binding in &self.bindings {
            let mut out = String::with_capacity(text.len());
            let mut last = 0;
            for caps in binding.pattern.captures_iter(&text) {
                let Some(whole) = caps.get(0) else { continue };
                let target_year = match caps.get(1) {
                    Some(index) => self.index_year(index.as_str())?,
                    // An unindexed self reference is left in place and fails as an unknown reference.
                    None if binding.is_self => continue,
                    None => year,
                };
                if binding.is_self && target_year >= year {
                    return Err(FormulaError::evaluation(
                        &self.formula,
                        format!("self reference must point to a year before {}, got {}", year, target_year),
                    ));
                }
                let value = table
                    .get(&binding.id, target_year)
                    .ok_or_else(|| FormulaError::MissingDependencyValue { driver: binding.id.clone(), year: target_year })?;
                if !value.is_finite() {
                    return Err(FormulaError::evaluation(
                        &self.formula,
                        format!("value of '{}' in {} is not finite", binding.id, target_year),
                    ));
                }
                out.push_str(&text[last..whole.start()]);
                out.push_str(&format!("({:?})", value));
                last = whole.end();
            }
            out.push_str(&text[last..]);
            text = out;
        }
        Ok(text)
    }

    fn index_year(&self, index: &str) -> Result<Year, FormulaError> {
        let expr = parser::parse(index).map_err(|e| FormulaError::evaluation(&self.formula, format!("year index: {}", e)))?;
        let value = eval::evaluate(&expr).map_err(|e| FormulaError::evaluation(&self.formula, format!("year index: {}", e)))?;
        if value.fract() != 0.0 || value < Year::MIN as f64 || value > Year::MAX as f64 {
            return Err(FormulaError::evaluation(&self.formula, format!("year index {} is not a whole year", value)));
        }
        Ok(value as Year)
    }
}
