use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// A calendar year on the projection horizon.
pub type Year = i32;

/// Opaque driver identity as handed over by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(pub String);

impl DriverId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DriverId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Dependency lists are short in practice; four inline slots cover most drivers.
pub type DependencyList = SmallVec<[DriverId; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    #[default]
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverCategory {
    Revenue,
    Expense,
    Operational,
    Financial,
    Assumption,
    #[default]
    #[serde(other)]
    Other,
}

/// Where a stored value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Manual,
    Calculated,
    Imported,
    Forecasted,
    Adjusted,
}

impl Provenance {
    /// Locked values are never overwritten by a projection run.
    pub fn is_locked(&self) -> bool {
        matches!(self, Provenance::Manual | Provenance::Imported | Provenance::Adjusted)
    }
}

/// A named scalar tracked per year, optionally derived from a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub dependencies: DependencyList,
    #[serde(default)]
    pub kind: ValueKind,
    #[serde(default)]
    pub category: DriverCategory,
}

impl Driver {
    /// A pure input driver: its values come from seeds only.
    pub fn input(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: DriverId::new(id),
            name: name.into(),
            formula: None,
            dependencies: SmallVec::new(),
            kind: ValueKind::Numeric,
            category: DriverCategory::Other,
        }
    }

    pub fn formula(
        id: impl Into<String>,
        name: impl Into<String>,
        formula: impl Into<String>,
        dependencies: &[&str],
    ) -> Self {
        Self {
            formula: Some(formula.into()),
            dependencies: dependencies.iter().map(|&d| DriverId::from(d)).collect(),
            ..Self::input(id, name)
        }
    }

    pub fn is_formula(&self) -> bool {
        self.formula.as_deref().is_some_and(|f| !f.trim().is_empty())
    }
}

/// One stored value of a driver for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverValue {
    pub driver: DriverId,
    pub year: Year,
    pub value: f64,
    pub provenance: Provenance,
}

impl DriverValue {
    pub fn manual(driver: impl Into<String>, year: Year, value: f64) -> Self {
        Self { driver: DriverId::new(driver), year, value, provenance: Provenance::Manual }
    }
}
