use std::collections::HashMap;

use super::settlement::{Settlement, SettlementYear};
use crate::utils::error::{PlanningError, Result};

/// Ordered collection of settlements; row order is the deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct SettlementTable {
    settlements: Vec<Settlement>,
    rows_by_id: HashMap<u64, usize>,
}

impl SettlementTable {
    pub fn new(settlements: Vec<Settlement>) -> Result<Self> {
        let mut rows_by_id = HashMap::with_capacity(settlements.len());
        for (row, settlement) in settlements.iter().enumerate() {
            let geography = settlement.geography();
            if !(geography.population >= 0.0) {
                return Err(PlanningError::InvalidSettlement {
                    row,
                    reason: format!("population must be non-negative, got {}", geography.population),
                });
            }
            if !(geography.grid_penalty_ratio > 0.0) {
                return Err(PlanningError::InvalidSettlement {
                    row,
                    reason: format!("grid penalty ratio must be positive, got {}", geography.grid_penalty_ratio),
                });
            }
            if rows_by_id.insert(settlement.id(), row).is_some() {
                return Err(PlanningError::InvalidSettlement {
                    row,
                    reason: format!("duplicate settlement id {}", settlement.id()),
                });
            }
        }
        Ok(Self { settlements, rows_by_id })
    }

    pub fn len(&self) -> usize {
        self.settlements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settlements.is_empty()
    }

    pub fn settlements(&self) -> &[Settlement] {
        &self.settlements
    }

    pub fn get(&self, row: usize) -> Option<&Settlement> {
        self.settlements.get(row)
    }

    pub fn row_of(&self, id: u64) -> Option<usize> {
        self.rows_by_id.get(&id).copied()
    }

    pub fn by_id(&self, id: u64) -> Option<&Settlement> {
        self.row_of(id).map(|row| &self.settlements[row])
    }

    /// Append one year of results, one entry per row.
    ///
    /// Rejects results that would disconnect a settlement connected in an earlier year.
    pub fn commit_year(&mut self, year: u32, states: Vec<SettlementYear>) -> Result<()> {
        if states.len() != self.settlements.len() {
            return Err(PlanningError::InvariantViolation(format!(
                "{} results for {} settlements in {}",
                states.len(),
                self.settlements.len(),
                year
            )));
        }
        if let Some(settlement) = self.settlements.iter().find(|s| s.year(year).is_some()) {
            return Err(PlanningError::InvariantViolation(format!(
                "results for {} already recorded for settlement {}",
                year,
                settlement.id()
            )));
        }
        for (settlement, state) in self.settlements.iter().zip(&states) {
            if settlement.grid_connected_before(year) && !state.grid_connected {
                return Err(PlanningError::InvariantViolation(format!(
                    "settlement {} was grid-connected before {} but not in {}",
                    settlement.id(),
                    year,
                    year
                )));
            }
        }
        for (settlement, state) in self.settlements.iter_mut().zip(states) {
            settlement.record_year(year, state);
        }
        Ok(())
    }

    pub fn total_population(&self, year: u32) -> f64 {
        self.settlements
            .iter()
            .filter_map(|s| s.year(year))
            .map(|state| state.population)
            .sum()
    }

    pub fn electrified_population(&self, year: u32) -> f64 {
        self.settlements
            .iter()
            .filter_map(|s| s.year(year))
            .filter(|state| state.is_electrified())
            .map(|state| state.population)
            .sum()
    }

    pub fn years(&self) -> Vec<u32> {
        self.settlements
            .first()
            .map(|s| s.history().keys().copied().collect())
            .unwrap_or_default()
    }
}
