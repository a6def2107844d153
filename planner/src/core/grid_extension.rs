//! Budget-constrained greedy growth of the grid within one planning step.
//!
//! The frontier starts from every connected settlement plus the existing MV
//! network. Each iteration ranks the settlements that pass the candidate gate,
//! admits them in rank order while the step budgets allow, and relaxes the
//! distances of their neighbours through the spatial index. Only settlements
//! whose distance changed are re-costed.
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap};
use tracing::{debug, info, warn};

use crate::config::scenario_config::{PrioritizationRule, ScenarioConfig, StepWindow};
use crate::data::poi::{Coordinate, POI};
use crate::models::cost_model::CostOutcome;
use crate::models::settlement::GridAdmissionPath;
use crate::utils::error::{PlanningError, Result};
use crate::utils::logging::{self, ExtensionType, OperationCategory};
use crate::utils::spatial_index::SpatialIndex;

/// What is left to spend in one planning step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub capacity_kw: f64,
    /// New connections, in people.
    pub connections: f64,
    pub max_distance_km: f64,
}

impl Budget {
    /// Annual budgets scaled by the length of the step.
    ///
    /// Only the first step is capped unless the scenario limits every step.
    pub fn for_step(config: &ScenarioConfig, window: &StepWindow) -> Self {
        if !window.first_step && !config.limit_budget_after_first_step {
            return Self::unlimited(config.max_grid_extension_km);
        }
        let years = window.time_step as f64;
        Self {
            capacity_kw: config.annual_grid_capacity_limit_mw * 1000.0 * years,
            connections: config.annual_grid_connections_limit * years,
            max_distance_km: config.max_grid_extension_km,
        }
    }

    pub fn unlimited(max_distance_km: f64) -> Self {
        Self {
            capacity_kw: f64::INFINITY,
            connections: f64::INFINITY,
            max_distance_km,
        }
    }

    pub fn fits(&self, capacity_kw: f64, connections: f64) -> bool {
        capacity_kw <= self.capacity_kw && connections <= self.connections
    }

    fn consume(&mut self, capacity_kw: f64, connections: f64) {
        self.capacity_kw -= capacity_kw;
        self.connections -= connections;
    }

    /// Deduct committed connections, stopping at zero. Returns false when the budget ran short.
    pub fn deduct_saturating(&mut self, capacity_kw: f64, connections: f64) -> bool {
        let fits = self.fits(capacity_kw, connections);
        self.capacity_kw = (self.capacity_kw - capacity_kw).max(0.0);
        self.connections = (self.connections - connections).max(0.0);
        if !fits {
            warn!(
                "Committed connections exceed the step budget ({:.1} kW, {:.0} connections); remaining budget clamped to zero",
                capacity_kw, connections
            );
        }
        fits
    }
}

/// Why admission ended for the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtensionStop {
    /// An iteration produced no candidates.
    FixedPoint,
    /// The best remaining candidate did not fit the budgets.
    BudgetExhausted,
}

/// Rule-independent attributes a candidate is ranked on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankInput {
    pub id: u64,
    pub distance_km: f64,
    pub lcoe: f64,
    pub population: f64,
}

/// Ranking score of every input under `rule`; lower ranks first.
///
/// Composite scores normalise each attribute by its maximum within the batch.
pub fn priority_scores(rule: &PrioritizationRule, inputs: &[RankInput]) -> Vec<f64> {
    match rule {
        PrioritizationRule::Distance => inputs.iter().map(|input| input.distance_km).collect(),
        PrioritizationRule::Lcoe => inputs.iter().map(|input| input.lcoe).collect(),
        PrioritizationRule::Population => inputs.iter().map(|input| -input.population).collect(),
        PrioritizationRule::Composite { weights } => {
            let max_of = |value: fn(&RankInput) -> f64| {
                inputs
                    .iter()
                    .map(value)
                    .filter(|v| v.is_finite())
                    .fold(0.0_f64, f64::max)
            };
            let ratio = |value: f64, max: f64| if max > 0.0 { value / max } else { 0.0 };
            let max_distance = max_of(|input| input.distance_km);
            let max_lcoe = max_of(|input| input.lcoe);
            let max_population = max_of(|input| input.population);

            inputs
                .iter()
                .map(|input| {
                    weights.distance * ratio(input.distance_km, max_distance)
                        + weights.lcoe * ratio(input.lcoe, max_lcoe)
                        + weights.population * (1.0 - ratio(input.population, max_population))
                })
                .collect()
        }
    }
}

/// Positions of `inputs` in rank order (score, then id).
pub fn rank_order(rule: &PrioritizationRule, inputs: &[RankInput]) -> Vec<usize> {
    let scores = priority_scores(rule, inputs);
    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, u64, usize)>> = scores
        .iter()
        .zip(inputs)
        .enumerate()
        .map(|(position, (score, input))| Reverse((OrderedFloat(*score), input.id, position)))
        .collect();

    let mut order = Vec::with_capacity(heap.len());
    while let Some(Reverse((_, _, position))) = heap.pop() {
        order.push(position);
    }
    order
}

/// One settlement as seen by the extension engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtensionRow {
    pub id: u64,
    pub coordinate: Coordinate,
    pub mv_distance_km: f64,
    pub population: f64,
    /// People connected if the settlement is admitted.
    pub new_connections: f64,
    pub cheapest_off_grid_lcoe: f64,
    /// Already on the frontier at the start of the step.
    pub connected: bool,
    /// Grid LCOE of a frontier settlement, used to break distance ties between parents.
    pub frontier_lcoe: f64,
}

impl POI for ExtensionRow {
    fn get_coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    fn get_id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtensionSettings {
    pub auto_intensification_km: f64,
    pub prioritization: PrioritizationRule,
    pub parallel: bool,
}

impl ExtensionSettings {
    pub fn from_scenario(config: &ScenarioConfig, parallel: bool) -> Self {
        Self {
            auto_intensification_km: config.auto_intensification_km,
            prioritization: config.prioritization,
            parallel,
        }
    }
}

/// A settlement connected during the step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Admission {
    pub row: usize,
    pub id: u64,
    pub distance_km: f64,
    pub lcoe: f64,
    pub investment: f64,
    pub capacity_kw: f64,
    pub connections: f64,
    pub iteration: u32,
    /// Settlement the line was extended from; `None` for the MV network.
    pub parent: Option<u64>,
    pub path: GridAdmissionPath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridExtensionOutcome {
    pub admissions: Vec<Admission>,
    /// Distance to the frontier per row at the end of the step (0 for settlements connected before).
    pub distances_km: Vec<f64>,
    /// Last grid LCOE costed per row; +inf for rows never costed.
    pub grid_lcoe: Vec<f64>,
    pub total_investment: f64,
    pub total_capacity_kw: f64,
    pub total_connections: f64,
    pub remaining: Budget,
    pub stop: ExtensionStop,
    /// Iterations that admitted at least one settlement.
    pub iterations: u32,
}

impl GridExtensionOutcome {
    pub fn admission_of(&self, row: usize) -> Option<&Admission> {
        self.admissions.iter().find(|admission| admission.row == row)
    }
}

/// Shortest known route to the frontier.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Reach {
    distance_km: f64,
    parent: Option<usize>,
    parent_lcoe: f64,
    parent_id: u64,
}

impl Reach {
    fn mv_line(distance_km: f64) -> Self {
        Self {
            distance_km,
            parent: None,
            parent_lcoe: 0.0,
            parent_id: 0,
        }
    }

    /// Shorter wins; on equal distance the MV line, then the cheaper parent, then the lower id.
    fn cmp_preference(&self, other: &Reach) -> Ordering {
        self.distance_km
            .total_cmp(&other.distance_km)
            .then_with(|| self.parent.is_some().cmp(&other.parent.is_some()))
            .then_with(|| self.parent_lcoe.total_cmp(&other.parent_lcoe))
            .then_with(|| self.parent_id.cmp(&other.parent_id))
    }
}

#[derive(Debug, Clone, Copy)]
struct Evaluation {
    outcome: CostOutcome,
    path: Option<GridAdmissionPath>,
}

struct Frontier<'a> {
    rows: &'a [ExtensionRow],
    index: SpatialIndex,
    radius_km: f64,
    connected: Vec<bool>,
    frontier_lcoe: Vec<f64>,
    reach: Vec<Reach>,
    dirty: BTreeSet<usize>,
}

impl<'a> Frontier<'a> {
    fn new(rows: &'a [ExtensionRow], radius_km: f64) -> Self {
        let connected: Vec<bool> = rows.iter().map(|row| row.connected).collect();
        let reach = rows
            .iter()
            .map(|row| Reach::mv_line(if row.connected { 0.0 } else { row.mv_distance_km }))
            .collect();
        let dirty = (0..rows.len()).filter(|&row| !connected[row]).collect();

        let mut frontier = Self {
            rows,
            index: SpatialIndex::from_pois(rows),
            radius_km,
            connected,
            frontier_lcoe: rows.iter().map(|row| row.frontier_lcoe).collect(),
            reach,
            dirty,
        };
        for row in 0..rows.len() {
            if frontier.connected[row] {
                frontier.relax_from(row);
            }
        }
        frontier
    }

    fn relax_from(&mut self, source: usize) {
        let origin = self.rows[source].coordinate;
        for target in self.index.within_radius(&origin, self.radius_km) {
            if self.connected[target] {
                continue;
            }
            let offer = Reach {
                distance_km: origin.distance_to(&self.rows[target].coordinate),
                parent: Some(source),
                parent_lcoe: self.frontier_lcoe[source],
                parent_id: self.rows[source].id,
            };
            if offer.cmp_preference(&self.reach[target]) == Ordering::Less {
                self.reach[target] = offer;
                self.dirty.insert(target);
            }
        }
    }

    fn connect(&mut self, row: usize, lcoe: f64) {
        self.connected[row] = true;
        self.frontier_lcoe[row] = lcoe;
        self.dirty.remove(&row);
    }
}

fn gate(
    settings: &ExtensionSettings,
    max_distance_km: f64,
    distance_km: f64,
    outcome: &CostOutcome,
    cheapest_off_grid_lcoe: f64,
) -> Option<GridAdmissionPath> {
    if !outcome.is_feasible() {
        return None;
    }
    if distance_km <= max_distance_km && outcome.lcoe <= cheapest_off_grid_lcoe {
        Some(GridAdmissionPath::Economic)
    } else if settings.auto_intensification_km > 0.0 && distance_km <= settings.auto_intensification_km {
        Some(GridAdmissionPath::Intensification)
    } else {
        None
    }
}

/// Grow the grid for `year` under `budget`.
///
/// `grid_cost(row, distance_km)` prices connecting a row over that much new line.
pub fn extend_grid<F>(
    rows: &[ExtensionRow],
    grid_cost: F,
    budget: Budget,
    settings: &ExtensionSettings,
    year: u32,
) -> Result<GridExtensionOutcome>
where
    F: Fn(usize, f64) -> CostOutcome + Sync,
{
    let _timing = logging::start_timing(
        "extend_grid",
        OperationCategory::GridExtension { subcategory: ExtensionType::Frontier },
    );

    let radius_km = budget.max_distance_km.max(settings.auto_intensification_km).max(0.0);
    let mut frontier = Frontier::new(rows, radius_km);
    let mut evaluations: Vec<Option<Evaluation>> = vec![None; rows.len()];
    let mut remaining = budget;
    let mut admissions = Vec::new();
    let mut iterations = 0u32;
    let mut stop = None;
    let bound = u32::try_from(rows.len()).unwrap_or(u32::MAX).saturating_add(1);

    for iteration in 1..=bound {
        // Re-cost only rows whose route to the frontier changed
        let dirty: Vec<usize> = std::mem::take(&mut frontier.dirty).into_iter().collect();
        let evaluate = |row: usize| {
            let distance_km = frontier.reach[row].distance_km;
            let outcome = grid_cost(row, distance_km);
            let path = gate(settings, budget.max_distance_km, distance_km, &outcome, rows[row].cheapest_off_grid_lcoe);
            (row, Evaluation { outcome, path })
        };
        let fresh: Vec<(usize, Evaluation)> = if settings.parallel {
            dirty.par_iter().map(|&row| evaluate(row)).collect()
        } else {
            dirty.iter().map(|&row| evaluate(row)).collect()
        };
        for (row, evaluation) in fresh {
            evaluations[row] = Some(evaluation);
        }

        let candidates: Vec<usize> = (0..rows.len())
            .filter(|&row| !frontier.connected[row])
            .filter(|&row| evaluations[row].map_or(false, |evaluation| evaluation.path.is_some()))
            .collect();
        if candidates.is_empty() {
            stop = Some(ExtensionStop::FixedPoint);
            break;
        }

        let rank_inputs: Vec<RankInput> = candidates
            .iter()
            .map(|&row| RankInput {
                id: rows[row].id,
                distance_km: frontier.reach[row].distance_km,
                lcoe: evaluations[row].map_or(f64::INFINITY, |evaluation| evaluation.outcome.lcoe),
                population: rows[row].population,
            })
            .collect();

        let _admission_timing = logging::start_timing(
            "admit_candidates",
            OperationCategory::GridExtension { subcategory: ExtensionType::Admission },
        );
        let mut admitted = Vec::new();
        for position in rank_order(&settings.prioritization, &rank_inputs) {
            let row = candidates[position];
            let (outcome, path) = match evaluations[row] {
                Some(Evaluation { outcome, path: Some(path) }) => (outcome, path),
                _ => continue,
            };
            let connections = rows[row].new_connections;
            if !remaining.fits(outcome.capacity_kw, connections) {
                stop = Some(ExtensionStop::BudgetExhausted);
                break;
            }
            remaining.consume(outcome.capacity_kw, connections);

            let reach = frontier.reach[row];
            admissions.push(Admission {
                row,
                id: rows[row].id,
                distance_km: reach.distance_km,
                lcoe: outcome.lcoe,
                investment: outcome.investment,
                capacity_kw: outcome.capacity_kw,
                connections,
                iteration,
                parent: reach.parent.map(|parent| rows[parent].id),
                path,
            });
            frontier.connect(row, outcome.lcoe);
            admitted.push(row);
        }

        if !admitted.is_empty() {
            iterations = iteration;
            debug!("Grid extension {} iteration {}: admitted {} settlements", year, iteration, admitted.len());
        }
        if stop.is_some() {
            break;
        }
        for row in admitted {
            frontier.relax_from(row);
        }
    }

    let stop = stop.ok_or(PlanningError::NonConvergence { year, iterations: bound })?;

    let outcome = GridExtensionOutcome {
        total_investment: admissions.iter().map(|a| a.investment).sum(),
        total_capacity_kw: admissions.iter().map(|a| a.capacity_kw).sum(),
        total_connections: admissions.iter().map(|a| a.connections).sum(),
        distances_km: frontier.reach.iter().map(|reach| reach.distance_km).collect(),
        grid_lcoe: evaluations
            .iter()
            .map(|evaluation| evaluation.map_or(f64::INFINITY, |evaluation| evaluation.outcome.lcoe))
            .collect(),
        admissions,
        remaining,
        stop,
        iterations,
    };
    info!(
        "Grid extension {}: {} settlements in {} iterations, {:.1} kW, stopped on {:?}",
        year,
        outcome.admissions.len(),
        outcome.iterations,
        outcome.total_capacity_kw,
        outcome.stop
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::scenario_config::CompositeWeights;
    use approx::assert_abs_diff_eq;

    fn row(id: u64, x: f64, mv_distance_km: f64) -> ExtensionRow {
        ExtensionRow {
            id,
            coordinate: Coordinate::new(x, 0.0),
            mv_distance_km,
            population: 100.0,
            new_connections: 100.0,
            cheapest_off_grid_lcoe: 1.0,
            connected: false,
            frontier_lcoe: 0.0,
        }
    }

    fn settings(rule: PrioritizationRule) -> ExtensionSettings {
        ExtensionSettings {
            auto_intensification_km: 0.0,
            prioritization: rule,
            parallel: false,
        }
    }

    /// LCOE rises with distance; each admission needs 1 MW.
    fn linear_cost(_row: usize, distance_km: f64) -> CostOutcome {
        CostOutcome {
            lcoe: 0.2 + 0.01 * distance_km,
            investment: 1000.0 + 100.0 * distance_km,
            capacity_kw: 1000.0,
        }
    }

    #[test]
    fn grid_hops_through_newly_connected_settlements() {
        // A is 2 km from the MV line, B is 1 km from A but 10 km from the line
        let rows = vec![row(1, 0.0, 2.0), row(2, 1.0, 10.0)];
        let outcome = extend_grid(&rows, linear_cost, Budget::unlimited(5.0), &settings(PrioritizationRule::Distance), 2025).unwrap();

        assert_eq!(outcome.stop, ExtensionStop::FixedPoint);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.admissions.len(), 2);
        let a = outcome.admission_of(0).unwrap();
        let b = outcome.admission_of(1).unwrap();
        assert_eq!((a.iteration, a.parent), (1, None));
        assert_eq!((b.iteration, b.parent), (2, Some(1)));
        assert_abs_diff_eq!(b.distance_km, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn capacity_budget_admits_top_ranked_only() {
        let rows: Vec<ExtensionRow> = (1..=5).map(|id| row(id, 100.0 * id as f64, 1.0)).collect();
        let budget = Budget {
            capacity_kw: 3000.0,
            connections: f64::INFINITY,
            max_distance_km: 5.0,
        };
        let outcome = extend_grid(&rows, linear_cost, budget, &settings(PrioritizationRule::Distance), 2025).unwrap();

        assert_eq!(outcome.stop, ExtensionStop::BudgetExhausted);
        let ids: Vec<u64> = outcome.admissions.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_abs_diff_eq!(outcome.total_capacity_kw, 3000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(outcome.remaining.capacity_kw, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn connection_budget_stops_admission() {
        let rows: Vec<ExtensionRow> = (1..=3).map(|id| row(id, 100.0 * id as f64, 1.0)).collect();
        let budget = Budget {
            capacity_kw: f64::INFINITY,
            connections: 150.0,
            max_distance_km: 5.0,
        };
        let outcome = extend_grid(&rows, linear_cost, budget, &settings(PrioritizationRule::Distance), 2025).unwrap();
        assert_eq!(outcome.admissions.len(), 1);
        assert!(outcome.total_connections <= 150.0);
        assert_eq!(outcome.stop, ExtensionStop::BudgetExhausted);
    }

    #[test]
    fn distance_and_cost_gates_reject() {
        let mut expensive = row(2, 500.0, 1.0);
        expensive.cheapest_off_grid_lcoe = 0.1;
        let rows = vec![row(1, 0.0, 50.0), expensive];
        let outcome = extend_grid(&rows, linear_cost, Budget::unlimited(5.0), &settings(PrioritizationRule::Distance), 2025).unwrap();
        assert!(outcome.admissions.is_empty());
        assert_eq!(outcome.stop, ExtensionStop::FixedPoint);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.distances_km, vec![50.0, 1.0]);
    }

    #[test]
    fn intensification_bypasses_cost_and_distance_gates() {
        let mut expensive = row(1, 0.0, 8.0);
        expensive.cheapest_off_grid_lcoe = 0.1;
        let rows = vec![expensive];
        let mut settings = settings(PrioritizationRule::Distance);
        settings.auto_intensification_km = 10.0;
        let outcome = extend_grid(&rows, linear_cost, Budget::unlimited(5.0), &settings, 2025).unwrap();
        assert_eq!(outcome.admissions.len(), 1);
        assert_eq!(outcome.admissions[0].path, GridAdmissionPath::Intensification);
    }

    #[test]
    fn infeasible_grid_is_never_admitted() {
        let rows = vec![row(1, 0.0, 1.0)];
        let mut settings = settings(PrioritizationRule::Distance);
        settings.auto_intensification_km = 10.0;
        let outcome = extend_grid(&rows, |_, _| CostOutcome::infeasible(), Budget::unlimited(5.0), &settings, 2025).unwrap();
        assert!(outcome.admissions.is_empty());
    }

    #[test]
    fn equal_distance_prefers_mv_line_then_cheaper_parent() {
        let mut cheap = row(7, -1.0, 0.0);
        cheap.connected = true;
        cheap.frontier_lcoe = 0.1;
        let mut dear = row(3, 1.0, 0.0);
        dear.connected = true;
        dear.frontier_lcoe = 0.3;
        let between = row(9, 0.0, 5.0);
        let outcome = extend_grid(
            &[dear, cheap, between],
            linear_cost,
            Budget::unlimited(5.0),
            &settings(PrioritizationRule::Distance),
            2025,
        )
        .unwrap();
        assert_eq!(outcome.admission_of(2).unwrap().parent, Some(7));

        let on_line = row(9, 0.0, 1.0);
        let outcome = extend_grid(
            &[dear, cheap, on_line],
            linear_cost,
            Budget::unlimited(5.0),
            &settings(PrioritizationRule::Distance),
            2025,
        )
        .unwrap();
        assert_eq!(outcome.admission_of(2).unwrap().parent, None);
        assert_eq!(outcome.distances_km[0], 0.0);
    }

    #[test]
    fn population_rule_ranks_largest_first() {
        let mut rows: Vec<ExtensionRow> = (1..=3).map(|id| row(id, 100.0 * id as f64, 1.0)).collect();
        rows[2].population = 500.0;
        let budget = Budget {
            capacity_kw: 1000.0,
            connections: f64::INFINITY,
            max_distance_km: 5.0,
        };
        let outcome = extend_grid(&rows, linear_cost, budget, &settings(PrioritizationRule::Population), 2025).unwrap();
        assert_eq!(outcome.admissions.len(), 1);
        assert_eq!(outcome.admissions[0].id, 3);
    }

    #[test]
    fn composite_scores_are_normalised_within_batch() {
        let inputs = [
            RankInput { id: 1, distance_km: 4.0, lcoe: 0.2, population: 100.0 },
            RankInput { id: 2, distance_km: 2.0, lcoe: 0.4, population: 400.0 },
        ];
        let rule = PrioritizationRule::Composite {
            weights: CompositeWeights { distance: 1.0, lcoe: 1.0, population: 1.0 },
        };
        let scores = priority_scores(&rule, &inputs);
        assert_abs_diff_eq!(scores[0], 1.0 + 0.5 + 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(scores[1], 0.5 + 1.0 + 0.0, epsilon = 1e-12);
        assert_eq!(rank_order(&rule, &inputs), vec![1, 0]);
    }

    #[test]
    fn ties_rank_by_id() {
        let inputs = [
            RankInput { id: 9, distance_km: 1.0, lcoe: 0.2, population: 100.0 },
            RankInput { id: 4, distance_km: 1.0, lcoe: 0.2, population: 100.0 },
        ];
        assert_eq!(rank_order(&PrioritizationRule::Distance, &inputs), vec![1, 0]);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let rows: Vec<ExtensionRow> = (0..40)
            .map(|i| row(i, (i % 8) as f64 * 1.5, if i % 5 == 0 { 1.0 } else { 30.0 }))
            .collect();
        let sequential = extend_grid(&rows, linear_cost, Budget::unlimited(2.0), &settings(PrioritizationRule::Lcoe), 2025).unwrap();
        let mut parallel_settings = settings(PrioritizationRule::Lcoe);
        parallel_settings.parallel = true;
        let parallel = extend_grid(&rows, linear_cost, Budget::unlimited(2.0), &parallel_settings, 2025).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn only_the_first_step_is_capped_by_default() {
        let mut config = ScenarioConfig::default();
        let windows = config.step_windows();

        let first = Budget::for_step(&config, &windows[0]);
        assert_abs_diff_eq!(first.capacity_kw, config.annual_grid_capacity_limit_mw * 1000.0 * 7.0, epsilon = 1e-9);
        assert_abs_diff_eq!(first.connections, config.annual_grid_connections_limit * 7.0, epsilon = 1e-9);

        let later = Budget::for_step(&config, &windows[1]);
        assert_eq!(later, Budget::unlimited(config.max_grid_extension_km));

        config.limit_budget_after_first_step = true;
        let later = Budget::for_step(&config, &windows[1]);
        assert_abs_diff_eq!(later.capacity_kw, config.annual_grid_capacity_limit_mw * 1000.0 * 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(later.connections, config.annual_grid_connections_limit * 5.0, epsilon = 1e-9);
    }

    #[test]
    fn saturating_deduction_never_goes_negative() {
        let mut budget = Budget {
            capacity_kw: 100.0,
            connections: 50.0,
            max_distance_km: 5.0,
        };
        assert!(budget.deduct_saturating(40.0, 10.0));
        assert!(!budget.deduct_saturating(100.0, 10.0));
        assert_eq!(budget.capacity_kw, 0.0);
        assert_eq!(budget.connections, 30.0);
    }
}
