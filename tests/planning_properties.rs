//! End-to-end planning runs checked against the properties every plan must hold.

use elecplan::config::scenario_config::{PlanningStep, PrioritizationRule, ScenarioConfig};
use elecplan::data::poi::Coordinate;
use elecplan::models::settlement::{GridAdmissionPath, Settlement, SettlementGeography};
use elecplan::{run_scenario, RunOptions, ScenarioResult, SettlementTable, TechCode};

const TOLERANCE: f64 = 1e-9;

/// 6 x 6 settlements 4 km apart; the MV line runs along the south-west corner.
fn settlement_grid() -> SettlementTable {
    let settlements = (0..36u64)
        .map(|i| {
            let (col, row) = ((i % 6) as f64, (i / 6) as f64);
            let mut geography = SettlementGeography::at(Coordinate::new(col * 4.0, row * 4.0), 200.0 + ((i * 37) % 900) as f64);
            geography.urban = i % 9 == 0;
            geography.ghi_kwh_m2_year = if i % 7 == 0 { 0.0 } else { 1500.0 + ((i * 53) % 700) as f64 };
            geography.wind_speed_ms = 3.0 + (i % 5) as f64;
            geography.mv_distance_km = col * 4.0 + row * 2.0 + 0.5;
            geography.travel_hours = (i % 6) as f64;
            geography.electrified_at_start = i == 0;
            Settlement::new(100 + i, geography)
        })
        .collect();
    SettlementTable::new(settlements).unwrap()
}

fn two_step_scenario() -> ScenarioConfig {
    ScenarioConfig {
        name: "properties".to_string(),
        start_year: 2020,
        end_year: 2030,
        steps: vec![
            PlanningStep { year: 2025, electrification_target: 0.5, diesel_price: None, grid_generation_cost: None },
            PlanningStep { year: 2030, electrification_target: 1.0, diesel_price: Some(1.2), grid_generation_cost: None },
        ],
        annual_grid_capacity_limit_mw: 0.02,
        annual_grid_connections_limit: 2000.0,
        max_grid_extension_km: 10.0,
        // High demand makes short MV extensions competitive
        rural_tier: 4,
        urban_tier: 4,
        ..ScenarioConfig::default()
    }
}

fn plan(parallel: bool) -> (ScenarioConfig, ScenarioResult) {
    let config = two_step_scenario();
    let result = run_scenario(settlement_grid(), &config, &RunOptions { parallel }).unwrap();
    (config, result)
}

fn newly_admitted(path: Option<GridAdmissionPath>) -> bool {
    matches!(path, Some(GridAdmissionPath::Economic) | Some(GridAdmissionPath::Intensification))
}

fn assert_within_step_budgets(result: &ScenarioResult) {
    for report in &result.steps {
        let (capacity, connections) = result
            .table
            .settlements()
            .iter()
            .filter_map(|settlement| settlement.year(report.year))
            .filter(|state| newly_admitted(state.admission))
            .fold((0.0, 0.0), |(capacity, connections), state| {
                (capacity + state.new_capacity_kw, connections + state.new_connections)
            });
        assert!(capacity <= report.budget.capacity_kw + TOLERANCE, "{}: {} kW over budget", report.year, capacity);
        assert!(connections <= report.budget.connections + TOLERANCE);
        assert!(report.remaining.capacity_kw >= -TOLERANCE);
        assert!(report.remaining.connections >= -TOLERANCE);
    }
}

/// Every recorded grid parent is itself on the grid that year.
fn assert_grid_parents_connected(result: &ScenarioResult) {
    for settlement in result.table.settlements() {
        for (year, state) in settlement.history() {
            if let Some(parent) = state.grid_parent {
                assert!(state.grid_connected, "settlement {} has a parent but no grid in {}", settlement.id(), year);
                let parent_state = result.table.by_id(parent).and_then(|parent| parent.year(*year)).unwrap();
                assert!(
                    parent_state.grid_connected,
                    "settlement {} hangs off {} which is not connected in {}",
                    settlement.id(),
                    parent,
                    year
                );
            }
        }
    }
}

fn single_step(year: u32, electrification_target: f64) -> PlanningStep {
    PlanningStep { year, electrification_target, diesel_price: None, grid_generation_cost: None }
}

#[test]
fn every_step_is_recorded() {
    let (_, result) = plan(false);
    assert_eq!(result.table.years(), vec![2025, 2030]);
    assert_eq!(result.steps.len(), 2);
    assert_eq!(result.summary.years.len(), 2);
}

#[test]
fn grid_connections_are_never_undone() {
    let (_, result) = plan(false);
    for settlement in result.table.settlements() {
        let first = settlement.year(2025).unwrap();
        let second = settlement.year(2030).unwrap();
        if settlement.geography().electrified_at_start {
            assert!(first.grid_connected, "settlement {} lost its start connection", settlement.id());
        }
        if first.grid_connected {
            assert!(second.grid_connected, "settlement {} was disconnected", settlement.id());
            assert_eq!(second.chosen, TechCode::Grid);
        }
    }
}

#[test]
fn admissions_fit_the_step_budget() {
    let (_, result) = plan(false);
    assert_within_step_budgets(&result);
    assert_grid_parents_connected(&result);
}

#[test]
fn later_steps_are_uncapped_unless_configured() {
    let (config, result) = plan(false);
    let first_step_kw = config.annual_grid_capacity_limit_mw * 1000.0 * 5.0;
    assert!((result.steps[0].budget.capacity_kw - first_step_kw).abs() < 1e-9);
    assert!(result.steps[1].budget.capacity_kw.is_infinite());
    assert!(result.steps[1].budget.connections.is_infinite());

    let capped = ScenarioConfig {
        limit_budget_after_first_step: true,
        ..two_step_scenario()
    };
    let capped_result = run_scenario(settlement_grid(), &capped, &RunOptions::default()).unwrap();
    assert!((capped_result.steps[1].budget.capacity_kw - first_step_kw).abs() < 1e-9);
    assert!((capped_result.steps[1].budget.connections - config.annual_grid_connections_limit * 5.0).abs() < 1e-9);
    assert_within_step_budgets(&capped_result);

    // A tighter second step can only connect fewer people
    let connected = |result: &ScenarioResult| {
        result
            .table
            .settlements()
            .iter()
            .filter(|settlement| settlement.year(2030).map_or(false, |state| state.grid_connected))
            .count()
    };
    assert!(connected(&capped_result) <= connected(&result));
}

#[test]
fn economic_admissions_respect_distance_and_cost() {
    let (config, result) = plan(false);
    let mut economic = 0;
    for settlement in result.table.settlements() {
        for state in settlement.history().values() {
            if state.admission != Some(GridAdmissionPath::Economic) {
                continue;
            }
            economic += 1;
            assert!(state.grid_distance_km <= config.max_grid_extension_km + TOLERANCE);
            let cheapest_off_grid = TechCode::OFF_GRID
                .iter()
                .map(|tech| state.lcoe[*tech])
                .fold(f64::INFINITY, f64::min);
            assert!(state.lcoe[TechCode::Grid] <= cheapest_off_grid + TOLERANCE);
            assert_eq!(state.chosen, TechCode::Grid);
        }
    }
    assert!(economic > 0, "fixture should admit at least one settlement economically");
}

#[test]
fn electrified_share_never_exceeds_target() {
    let (_, result) = plan(false);
    for report in &result.steps {
        assert!(report.electrified_fraction <= report.electrification_target + TOLERANCE);
        let summary = result.summary.year(report.year).unwrap();
        assert!((summary.electrified_fraction() - report.electrified_fraction).abs() < 1e-9);

        // Demotion stops as soon as the target is met, so it undershoots by at most one settlement
        if report.demoted > 0 {
            let largest = result
                .table
                .settlements()
                .iter()
                .filter_map(|settlement| settlement.year(report.year))
                .map(|state| state.population)
                .fold(0.0, f64::max);
            let slack = largest / summary.total_population;
            assert!(report.electrified_fraction >= report.electrification_target - slack - TOLERANCE);
        }
    }
}

#[test]
fn parallel_run_matches_sequential() {
    let (_, sequential) = plan(false);
    let (_, parallel) = plan(true);
    assert_eq!(sequential.steps, parallel.steps);
    assert_eq!(sequential.summary, parallel.summary);
    for (s, p) in sequential.table.settlements().iter().zip(parallel.table.settlements()) {
        assert_eq!(s.history(), p.history(), "settlement {} differs", s.id());
    }
}

#[test]
fn remote_sunny_settlement_goes_off_grid() {
    let mut geography = SettlementGeography::at(Coordinate::new(0.0, 0.0), 500.0);
    geography.mv_distance_km = 500.0;
    geography.ghi_kwh_m2_year = 2100.0;
    let table = SettlementTable::new(vec![Settlement::new(1, geography)]).unwrap();
    let config = ScenarioConfig {
        start_year: 2020,
        end_year: 2030,
        steps: vec![PlanningStep { year: 2030, electrification_target: 1.0, diesel_price: None, grid_generation_cost: None }],
        ..ScenarioConfig::default()
    };

    let result = run_scenario(table, &config, &RunOptions::default()).unwrap();
    let state = result.table.settlements()[0].year(2030).unwrap();
    assert!(state.is_electrified());
    assert!(state.chosen.is_off_grid());
    assert!(!state.grid_connected);
    assert_eq!(state.admission, None);
    assert_eq!(state.chosen, TechCode::SaPv);
    for tech in TechCode::OFF_GRID {
        assert!(state.lcoe[TechCode::SaPv] <= state.lcoe[tech], "{} is cheaper than SA PV", tech);
    }
    // The mini-grid pays for its own LV network
    assert!(state.lcoe[TechCode::MgPv] > state.lcoe[TechCode::SaPv]);
}

#[test]
fn grid_reaches_past_the_mv_limit_through_a_connected_settlement() {
    // Neither settlement has sun, wind or hydro, so diesel is the only off-grid option
    let mut served = SettlementGeography::at(Coordinate::new(0.0, 0.0), 1000.0);
    served.mv_distance_km = 0.0;
    served.electrified_at_start = true;
    let mut neighbour = SettlementGeography::at(Coordinate::new(3.0, 0.0), 2000.0);
    neighbour.mv_distance_km = 100.0;
    let table = SettlementTable::new(vec![Settlement::new(1, served), Settlement::new(2, neighbour)]).unwrap();
    let config = ScenarioConfig {
        start_year: 2020,
        end_year: 2030,
        steps: vec![PlanningStep { year: 2030, electrification_target: 1.0, diesel_price: None, grid_generation_cost: None }],
        ..ScenarioConfig::default()
    };

    let result = run_scenario(table, &config, &RunOptions::default()).unwrap();
    let served = result.table.settlements()[0].year(2030).unwrap();
    assert_eq!(served.admission, Some(GridAdmissionPath::PreElectrified));
    assert_eq!(served.grid_distance_km, 0.0);

    let neighbour = result.table.settlements()[1].year(2030).unwrap();
    assert_eq!(neighbour.chosen, TechCode::Grid);
    assert_eq!(neighbour.admission, Some(GridAdmissionPath::Economic));
    assert_eq!(neighbour.grid_parent, Some(1));
    assert_eq!(neighbour.grid_iteration, Some(1));
    assert!((neighbour.grid_distance_km - 3.0).abs() < 1e-12);
    assert_eq!(result.steps[0].pre_electrified, 1);
    assert_eq!(result.steps[0].admitted, 1);
}

#[test]
fn demoted_settlement_never_strands_its_grid_children() {
    // A reaches the MV line over 3 km, B only reaches the grid through A
    let mut a = SettlementGeography::at(Coordinate::new(0.0, 0.0), 2000.0);
    a.mv_distance_km = 3.0;
    let mut b = SettlementGeography::at(Coordinate::new(1.0, 0.0), 2000.0);
    b.mv_distance_km = 100.0;
    let table = SettlementTable::new(vec![Settlement::new(1, a), Settlement::new(2, b)]).unwrap();
    let config = ScenarioConfig {
        start_year: 2020,
        end_year: 2030,
        steps: vec![single_step(2030, 0.8)],
        prioritization: PrioritizationRule::Distance,
        ..ScenarioConfig::default()
    };

    let result = run_scenario(table, &config, &RunOptions::default()).unwrap();
    assert_eq!(result.steps[0].demoted, 1);

    // A ranks last on distance but B depends on it, so B goes
    let a = result.table.settlements()[0].year(2030).unwrap();
    assert_eq!(a.chosen, TechCode::Grid);
    assert!(a.grid_connected);
    assert_eq!(a.admission, Some(GridAdmissionPath::Economic));

    let b = result.table.settlements()[1].year(2030).unwrap();
    assert_eq!(b.chosen, TechCode::Unelectrified);
    assert!(!b.grid_connected);
    assert_eq!(b.grid_parent, None);
    assert!(result.steps[0].electrified_fraction <= 0.8 + TOLERANCE);
    assert_grid_parents_connected(&result);
}

#[test]
fn intensification_connects_cheaper_off_grid_settlements_nearby() {
    let mut served = SettlementGeography::at(Coordinate::new(0.0, 0.0), 1000.0);
    served.mv_distance_km = 0.0;
    served.electrified_at_start = true;
    // Small and sunny: stand-alone PV beats a 3 km line
    let mut infill = SettlementGeography::at(Coordinate::new(3.0, 0.0), 50.0);
    infill.mv_distance_km = 100.0;
    infill.ghi_kwh_m2_year = 2100.0;
    let mut remote = infill.clone();
    remote.coordinate = Coordinate::new(30.0, 0.0);
    let table = SettlementTable::new(vec![
        Settlement::new(1, served),
        Settlement::new(2, infill),
        Settlement::new(3, remote),
    ])
    .unwrap();
    let config = ScenarioConfig {
        start_year: 2020,
        end_year: 2030,
        steps: vec![single_step(2025, 1.0), single_step(2030, 1.0)],
        max_grid_extension_km: 2.0,
        auto_intensification_km: 5.0,
        ..ScenarioConfig::default()
    };

    let result = run_scenario(table, &config, &RunOptions::default()).unwrap();

    let infill = result.table.settlements()[1].year(2025).unwrap();
    assert_eq!(infill.admission, Some(GridAdmissionPath::Intensification));
    assert_eq!(infill.chosen, TechCode::Grid);
    assert_eq!(infill.grid_parent, Some(1));
    assert!(infill.grid_distance_km > config.max_grid_extension_km);
    assert!(infill.grid_distance_km <= config.auto_intensification_km);
    let cheapest_off_grid = TechCode::OFF_GRID.iter().map(|tech| infill.lcoe[*tech]).fold(f64::INFINITY, f64::min);
    assert!(infill.lcoe[TechCode::Grid] > cheapest_off_grid);

    let later = result.table.settlements()[1].year(2030).unwrap();
    assert!(later.grid_connected);
    assert_eq!(later.admission, Some(GridAdmissionPath::PreElectrified));

    for year in [2025, 2030] {
        let remote = result.table.settlements()[2].year(year).unwrap();
        assert!(!remote.grid_connected);
        assert_eq!(remote.chosen, TechCode::SaPv);
    }

    // Only the override may exceed the extension limit
    for settlement in result.table.settlements() {
        for state in settlement.history().values() {
            match state.admission {
                Some(GridAdmissionPath::Economic) => {
                    assert!(state.grid_distance_km <= config.max_grid_extension_km + TOLERANCE)
                }
                Some(GridAdmissionPath::Intensification) => {
                    assert!(state.grid_distance_km <= config.auto_intensification_km + TOLERANCE)
                }
                _ => {}
            }
        }
    }
    assert_within_step_budgets(&result);
    assert_grid_parents_connected(&result);
}
