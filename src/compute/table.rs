//! table.rs
//! Sparse (driver, year) value store shared by the pipeline and the statement engine.

use crate::store::{DriverId, DriverValue, Provenance, Year};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: f64,
    pub provenance: Provenance,
}

/// A missing key means "no value yet", which is distinct from zero.
///
/// Ordered storage keeps iteration, serialization and therefore re-runs
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<DriverValue>", into = "Vec<DriverValue>")]
pub struct ValueTable {
    cells: BTreeMap<(DriverId, Year), Cell>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from seed values. Later duplicates of a (driver, year) win.
    pub fn from_values(values: impl IntoIterator<Item = DriverValue>) -> Self {
        let mut table = Self::new();
        for v in values {
            table.insert(v);
        }
        table
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, driver: &DriverId, year: Year) -> Option<f64> {
        self.cell(driver, year).map(|c| c.value)
    }

    pub fn cell(&self, driver: &DriverId, year: Year) -> Option<&Cell> {
        self.cells.get(&(driver.clone(), year))
    }

    pub fn insert(&mut self, value: DriverValue) {
        self.cells.insert(
            (value.driver, value.year),
            Cell { value: value.value, provenance: value.provenance },
        );
    }

    /// Writes an engine-produced value. Returns `false` and leaves the table
    /// untouched when the existing cell is locked.
    pub fn set_calculated(&mut self, driver: &DriverId, year: Year, value: f64) -> bool {
        if self.is_locked(driver, year) {
            return false;
        }
        self.cells.insert((driver.clone(), year), Cell { value, provenance: Provenance::Calculated });
        true
    }

    /// Drops an engine-produced value. Locked cells are kept.
    pub fn remove_calculated(&mut self, driver: &DriverId, year: Year) -> bool {
        if self.is_locked(driver, year) {
            return false;
        }
        self.cells.remove(&(driver.clone(), year)).is_some()
    }

    pub fn is_locked(&self, driver: &DriverId, year: Year) -> bool {
        self.cell(driver, year).is_some_and(|c| c.provenance.is_locked())
    }

    pub fn iter(&self) -> impl Iterator<Item = DriverValue> + '_ {
        self.cells.iter().map(|((driver, year), c)| DriverValue {
            driver: driver.clone(),
            year: *year,
            value: c.value,
            provenance: c.provenance,
        })
    }

    pub fn calculated(&self) -> impl Iterator<Item = DriverValue> + '_ {
        self.iter().filter(|v| v.provenance == Provenance::Calculated)
    }
}

impl From<Vec<DriverValue>> for ValueTable {
    fn from(values: Vec<DriverValue>) -> Self {
        Self::from_values(values)
    }
}

impl From<ValueTable> for Vec<DriverValue> {
    fn from(table: ValueTable) -> Self {
        table.iter().collect()
    }
}
