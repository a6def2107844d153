use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::constants::TARGET_TOLERANCE;
use crate::config::scenario_config::PrioritizationRule;
use crate::config::tech_type::{TechCode, TechMap};
use crate::core::grid_extension::{rank_order, RankInput};
use crate::models::cost_model::CostOutcome;
use crate::models::settlement::GridAdmissionPath;
use crate::utils::logging::{self, OperationCategory, SelectionType};

/// What the selector knows about one settlement after grid extension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRow {
    pub id: u64,
    pub population: f64,
    pub grid_distance_km: f64,
    /// Every technology's cost this step; the grid slot is only feasible for connected settlements.
    pub costs: TechMap<CostOutcome>,
    /// How the settlement is on the grid this step, if it is.
    pub admission: Option<GridAdmissionPath>,
    /// Settlement the line was extended from this step.
    pub grid_parent: Option<u64>,
    /// Technology carried in from the previous step.
    pub previous: Option<TechCode>,
}

impl SelectionRow {
    pub fn is_grid_connected(&self) -> bool {
        self.admission.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub electrified_fraction_before: f64,
    pub electrified_fraction: f64,
    pub demoted: usize,
}

/// Cheapest feasible technology among the grid (when connected) and every off-grid option.
///
/// Grid wins ties, then the lowest technology code. Settlements without a
/// feasible option stay unelectrified.
pub fn cheapest_technology(row: &SelectionRow) -> TechCode {
    let mut best = (TechCode::Unelectrified, f64::INFINITY);
    for tech in TechCode::ELECTRIFYING {
        if tech == TechCode::Grid && !row.is_grid_connected() {
            continue;
        }
        let lcoe = row.costs[tech].lcoe;
        if lcoe < best.1 {
            best = (tech, lcoe);
        }
    }
    best.0
}

/// Technology for one settlement this step.
pub fn choose_technology(row: &SelectionRow) -> TechCode {
    match (row.admission, row.previous) {
        // The network never retreats and infill is not cost-tested
        (Some(GridAdmissionPath::PreElectrified), _) | (Some(GridAdmissionPath::Intensification), _) => TechCode::Grid,
        (_, Some(TechCode::Grid)) => TechCode::Grid,
        (Some(GridAdmissionPath::Economic), _) => cheapest_technology(row),
        (None, Some(previous)) if previous.is_off_grid() => previous,
        _ => cheapest_technology(row),
    }
}

pub fn choose_technologies(rows: &[SelectionRow]) -> Vec<TechCode> {
    let _timing = logging::start_timing(
        "choose_technologies",
        OperationCategory::Selection { subcategory: SelectionType::TechnologyChoice },
    );
    rows.iter().map(choose_technology).collect()
}

fn electrified_fraction(rows: &[SelectionRow], choices: &[TechCode]) -> f64 {
    let total: f64 = rows.iter().map(|row| row.population).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let electrified: f64 = rows
        .iter()
        .zip(choices)
        .filter(|(_, tech)| **tech != TechCode::Unelectrified)
        .map(|(row, _)| row.population)
        .sum();
    electrified / total
}

/// Rows connected this step through the grid line of each row, while they stay on the grid.
fn grid_children(rows: &[SelectionRow]) -> Vec<Vec<usize>> {
    let row_of: HashMap<u64, usize> = rows.iter().enumerate().map(|(row, selection)| (selection.id, row)).collect();
    let mut children = vec![Vec::new(); rows.len()];
    for (row, selection) in rows.iter().enumerate() {
        if let Some(parent) = selection.grid_parent.and_then(|id| row_of.get(&id)) {
            children[*parent].push(row);
        }
    }
    children
}

/// Settlements currently fed through the grid line of `root`, `root` excluded.
fn grid_descendants(root: usize, children: &[Vec<usize>], choices: &[TechCode]) -> Vec<usize> {
    let mut descendants = Vec::new();
    let mut stack = vec![root];
    while let Some(row) = stack.pop() {
        for &child in &children[row] {
            if choices[child] == TechCode::Grid {
                descendants.push(child);
                stack.push(child);
            }
        }
    }
    descendants
}

/// Demote settlements electrified for the first time this step until the
/// population-weighted electrified fraction is within `target`.
///
/// The lowest-ranked settlements under `rule` go first, but a settlement still
/// feeding a newly electrified grid settlement waits until that one is demoted.
/// Settlements that were off-grid before and hang off a demoted line fall back to
/// their previous technology. Returns the demoted rows.
pub fn enforce_target(
    rows: &[SelectionRow],
    choices: &mut [TechCode],
    target: f64,
    rule: &PrioritizationRule,
) -> (Vec<usize>, TargetOutcome) {
    let _timing = logging::start_timing(
        "enforce_target",
        OperationCategory::Selection { subcategory: SelectionType::TargetEnforcement },
    );

    let total: f64 = rows.iter().map(|row| row.population).sum();
    let start_fraction = electrified_fraction(rows, choices);
    let mut fraction = start_fraction;
    let mut demoted = Vec::new();

    if fraction > target + TARGET_TOLERANCE && total > 0.0 {
        let newly_electrified: Vec<usize> = (0..rows.len())
            .filter(|&row| rows[row].previous.is_none() && choices[row] != TechCode::Unelectrified)
            .collect();
        let rank_inputs: Vec<RankInput> = newly_electrified
            .iter()
            .map(|&row| RankInput {
                id: rows[row].id,
                distance_km: rows[row].grid_distance_km,
                lcoe: rows[row].costs[choices[row]].lcoe,
                population: rows[row].population,
            })
            .collect();

        let lowest_first: Vec<usize> = rank_order(rule, &rank_inputs)
            .into_iter()
            .rev()
            .map(|position| newly_electrified[position])
            .collect();
        let children = grid_children(rows);

        let mut electrified_population = fraction * total;
        while electrified_population / total > target + TARGET_TOLERANCE {
            let next = lowest_first.iter().copied().find_map(|row| {
                if choices[row] == TechCode::Unelectrified {
                    return None;
                }
                let descendants = grid_descendants(row, &children, &*choices);
                let leaf = descendants.iter().all(|&child| rows[child].previous.is_some());
                leaf.then_some((row, descendants))
            });
            let Some((row, descendants)) = next else {
                break;
            };

            for child in descendants {
                if let Some(previous) = rows[child].previous {
                    debug!("Settlement {} loses its grid line and keeps {}", rows[child].id, previous);
                    choices[child] = previous;
                }
            }
            debug!("Demoting settlement {} ({:.0} people) to meet the target", rows[row].id, rows[row].population);
            choices[row] = TechCode::Unelectrified;
            electrified_population -= rows[row].population;
            demoted.push(row);
        }
        fraction = electrified_fraction(rows, choices);
    }

    if !demoted.is_empty() {
        info!(
            "Target {:.3}: demoted {} settlements, electrified fraction {:.3} -> {:.3}",
            target,
            demoted.len(),
            start_fraction,
            fraction
        );
    }

    let outcome = TargetOutcome {
        electrified_fraction_before: start_fraction,
        electrified_fraction: fraction,
        demoted: demoted.len(),
    };
    (demoted, outcome)
}
