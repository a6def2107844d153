use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::scenario_config::{ScenarioConfig, StepWindow};
use crate::config::tech_type::{TechCode, TechMap};
use crate::core::costing::{cheapest_off_grid, StepTechnologies};
use crate::core::grid_extension::{extend_grid, Budget, ExtensionRow, ExtensionSettings, ExtensionStop};
use crate::core::projection::{project_table, GrowthRates};
use crate::core::selection::{choose_technologies, enforce_target, SelectionRow};
use crate::models::cost_model::CostOutcome;
use crate::models::settlement::{GridAdmissionPath, SettlementYear};
use crate::models::settlement_table::SettlementTable;
use crate::utils::error::Result;
use crate::utils::logging::{self, ExtensionType, OperationCategory};

/// Bookkeeping of one planning step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub year: u32,
    pub time_step: u32,
    pub budget: Budget,
    pub remaining: Budget,
    pub pre_electrified: usize,
    pub admitted: usize,
    pub extension_iterations: u32,
    pub stop: ExtensionStop,
    pub demoted: usize,
    pub electrified_fraction: f64,
    pub electrification_target: f64,
    pub investment: f64,
}

/// Everything a step produced, one state per settlement row.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub states: Vec<SettlementYear>,
    pub report: StepReport,
}

/// Plan one step: project demand, cost every technology, grow the grid,
/// select technologies and hold the electrification target.
///
/// The table is read only; the caller commits the returned states.
pub fn run_step(
    table: &SettlementTable,
    config: &ScenarioConfig,
    window: &StepWindow,
    growth: &GrowthRates,
    parallel: bool,
) -> Result<StepResult> {
    let _timing = logging::start_timing(&format!("plan_step_{}", window.year), OperationCategory::Planning);
    let year = window.year;
    let settlements = table.settlements();

    let projections = project_table(table, config, growth, year, parallel);
    let techs = StepTechnologies::for_step(config, window);
    let off_grid = techs.off_grid_costs(table, &projections, parallel);

    // Settlements already on the grid only pay for their growth, at distance zero
    let budget = Budget::for_step(config, window);
    let mut remaining = budget;
    let pre_electrified: Vec<Option<CostOutcome>> = {
        let _timing = logging::start_timing(
            "pre_electrification",
            OperationCategory::GridExtension { subcategory: ExtensionType::PreElectrification },
        );
        settlements
            .iter()
            .zip(&projections)
            .enumerate()
            .map(|(row, (settlement, projection))| {
                if !settlement.grid_connected_before(year) {
                    return None;
                }
                let outcome = techs.grid_cost(row, settlement, projection, 0.0);
                if outcome.is_feasible() {
                    remaining.deduct_saturating(outcome.capacity_kw, projection.new_connections);
                    Some(outcome)
                } else {
                    Some(CostOutcome { lcoe: outcome.lcoe, investment: 0.0, capacity_kw: 0.0 })
                }
            })
            .collect()
    };
    let pre_electrified_count = pre_electrified.iter().filter(|outcome| outcome.is_some()).count();
    debug!(
        "{}: {} settlements pre-electrified, budget left {:.1} kW / {:.0} connections",
        year, pre_electrified_count, remaining.capacity_kw, remaining.connections
    );

    let extension_rows: Vec<ExtensionRow> = settlements
        .iter()
        .zip(&projections)
        .zip(&off_grid)
        .zip(&pre_electrified)
        .map(|(((settlement, projection), costs), pre)| ExtensionRow {
            id: settlement.id(),
            coordinate: settlement.geography().coordinate,
            mv_distance_km: settlement.geography().mv_distance_km,
            population: projection.population,
            new_connections: projection.new_connections,
            cheapest_off_grid_lcoe: cheapest_off_grid(costs),
            connected: pre.is_some(),
            frontier_lcoe: pre.map_or(f64::INFINITY, |outcome| outcome.lcoe),
        })
        .collect();

    let extension = extend_grid(
        &extension_rows,
        |row, distance_km| techs.grid_cost(row, &settlements[row], &projections[row], distance_km),
        remaining,
        &ExtensionSettings::from_scenario(config, parallel),
        year,
    )?;

    let mut admissions = vec![None; settlements.len()];
    for admission in &extension.admissions {
        admissions[admission.row] = Some(*admission);
    }

    let selection_rows: Vec<SelectionRow> = (0..settlements.len())
        .map(|row| {
            let mut costs = off_grid[row];
            let admission = match (pre_electrified[row], admissions[row]) {
                (Some(outcome), _) => {
                    costs[TechCode::Grid] = outcome;
                    Some(GridAdmissionPath::PreElectrified)
                }
                (None, Some(admission)) => {
                    costs[TechCode::Grid] = CostOutcome {
                        lcoe: admission.lcoe,
                        investment: admission.investment,
                        capacity_kw: admission.capacity_kw,
                    };
                    Some(admission.path)
                }
                (None, None) => {
                    costs[TechCode::Grid] = CostOutcome { lcoe: extension.grid_lcoe[row], ..CostOutcome::infeasible() };
                    None
                }
            };
            SelectionRow {
                id: settlements[row].id(),
                population: projections[row].population,
                grid_distance_km: if pre_electrified[row].is_some() { 0.0 } else { extension.distances_km[row] },
                costs,
                admission,
                grid_parent: admissions[row].and_then(|admission| admission.parent),
                previous: settlements[row].technology_before(year),
            }
        })
        .collect();

    let mut choices = choose_technologies(&selection_rows);
    let (demoted, target) = enforce_target(
        &selection_rows,
        &mut choices,
        window.electrification_target,
        &config.prioritization,
    );
    for row in demoted {
        admissions[row] = None;
    }

    let states: Vec<SettlementYear> = selection_rows
        .iter()
        .zip(&choices)
        .zip(&projections)
        .enumerate()
        .map(|(row, ((selection, chosen), projection))| {
            let on_grid = *chosen == TechCode::Grid;
            let admission = admissions[row].filter(|_| on_grid);
            let path = if on_grid { selection.admission } else { None };
            let chosen_cost = if *chosen == TechCode::Unelectrified {
                CostOutcome::default()
            } else {
                selection.costs[*chosen]
            };

            let mut lcoe = TechMap::filled(f64::INFINITY);
            let mut investment_by_tech = TechMap::default();
            let mut capacity_by_tech = TechMap::default();
            for tech in TechCode::ELECTRIFYING {
                lcoe[tech] = selection.costs[tech].lcoe;
                investment_by_tech[tech] = selection.costs[tech].investment;
                capacity_by_tech[tech] = selection.costs[tech].capacity_kw;
            }

            SettlementYear {
                population: projection.population,
                households: projection.households,
                new_connections: projection.new_connections,
                new_households: projection.new_households,
                demand_per_household: projection.demand_per_household,
                energy_demand_kwh: projection.energy_demand_kwh,
                grid_distance_km: selection.grid_distance_km,
                lcoe,
                investment_by_tech,
                capacity_by_tech,
                chosen: *chosen,
                investment: chosen_cost.investment,
                new_capacity_kw: chosen_cost.capacity_kw,
                grid_connected: path.is_some(),
                admission: path,
                grid_iteration: admission.map(|a| a.iteration),
                grid_parent: admission.and_then(|a| a.parent),
            }
        })
        .collect();

    let report = StepReport {
        year,
        time_step: window.time_step,
        budget,
        remaining: extension.remaining,
        pre_electrified: pre_electrified_count,
        admitted: states
            .iter()
            .filter(|state| state.admission.map_or(false, |path| path != GridAdmissionPath::PreElectrified))
            .count(),
        extension_iterations: extension.iterations,
        stop: extension.stop,
        demoted: target.demoted,
        electrified_fraction: target.electrified_fraction,
        electrification_target: window.electrification_target,
        investment: states.iter().map(|state| state.investment).sum(),
    };
    info!(
        "Step {}: {} grid admissions, {} demoted, electrified {:.1}% (target {:.1}%), investment {:.0}",
        year,
        report.admitted,
        report.demoted,
        report.electrified_fraction * 100.0,
        report.electrification_target * 100.0,
        report.investment
    );

    Ok(StepResult { states, report })
}
