use super::types::*;
use crate::formula;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Driver id '{0}' appears more than once in the catalog")]
    DuplicateId(DriverId),
}

/// Non-fatal findings about a catalog. Structural problems that only matter at
/// evaluation time are reported here and again by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogIssue {
    /// The formula mentions another driver by name without declaring it.
    UndeclaredReference { driver: DriverId, referenced: DriverId },
    /// A declared dependency id is not present in the catalog.
    UnknownDependency { driver: DriverId, dependency: DriverId },
    /// Two drivers share a display name, so formula references are ambiguous.
    DuplicateName { name: String, drivers: Vec<DriverId> },
}

/// The driver set of one scenario, kept in the order it was supplied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Driver>", into = "Vec<Driver>")]
pub struct DriverCatalog {
    drivers: Vec<Driver>,
    // Rebuilt on construction, never serialized
    index: HashMap<DriverId, usize>,
}

impl DriverCatalog {
    pub fn new(drivers: Vec<Driver>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(drivers.len());
        for (i, driver) in drivers.iter().enumerate() {
            if index.insert(driver.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateId(driver.id.clone()));
            }
        }
        Ok(Self { drivers, index })
    }

    pub fn count(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub fn get(&self, id: &DriverId) -> Option<&Driver> {
        self.index.get(id).map(|&i| &self.drivers[i])
    }

    #[inline(always)]
    pub fn position(&self, id: &DriverId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &DriverId) -> bool {
        self.index.contains_key(id)
    }

    /// Drivers in supply order.
    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    /// Checks the declared dependency lists against the formulas and the catalog.
    ///
    /// Nothing here is fatal: unknown dependencies surface again as missing values
    /// when the pipeline evaluates the driver.
    pub fn validate(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();

        // First-appearance order keeps the report deterministic.
        let mut name_slots: HashMap<&str, usize> = HashMap::new();
        let mut names: Vec<(&str, Vec<DriverId>)> = Vec::new();
        for driver in &self.drivers {
            let slot = *name_slots.entry(driver.name.as_str()).or_insert_with(|| {
                names.push((driver.name.as_str(), Vec::new()));
                names.len() - 1
            });
            names[slot].1.push(driver.id.clone());
        }
        let duplicate_names: Vec<_> = names
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(name, drivers)| CatalogIssue::DuplicateName { name: name.to_string(), drivers })
            .collect();

        let mut matcher = formula::NameMatcher::default();
        for driver in &self.drivers {
            for dep in &driver.dependencies {
                if !self.contains(dep) {
                    issues.push(CatalogIssue::UnknownDependency {
                        driver: driver.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }

            let Some(text) = driver.formula.as_deref() else { continue };
            let declared: HashSet<&DriverId> = driver.dependencies.iter().collect();
            for other in &self.drivers {
                if other.id == driver.id || declared.contains(&other.id) {
                    continue;
                }
                if matcher.mentions(text, &other.name) {
                    issues.push(CatalogIssue::UndeclaredReference {
                        driver: driver.id.clone(),
                        referenced: other.id.clone(),
                    });
                }
            }
        }

        issues.extend(duplicate_names);
        issues
    }
}

impl TryFrom<Vec<Driver>> for DriverCatalog {
    type Error = CatalogError;

    fn try_from(drivers: Vec<Driver>) -> Result<Self, Self::Error> {
        Self::new(drivers)
    }
}

impl From<DriverCatalog> for Vec<Driver> {
    fn from(catalog: DriverCatalog) -> Self {
        catalog.drivers
    }
}
