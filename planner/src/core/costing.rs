//! Per-step technology instances and the settlement-level cost requests built from them.
use rayon::prelude::*;
use tracing::debug;

use crate::config::scenario_config::{ScenarioConfig, StepWindow};
use crate::config::tech_type::{TechCode, TechMap};
use crate::core::projection::Projection;
use crate::models::cost_model::{
    CostModel, CostOutcome, CostRequest, FuelTechnology, HybridTechnology, StandardTechnology,
};
use crate::models::settlement::Settlement;
use crate::models::settlement_table::SettlementTable;
use crate::utils::logging::{self, CostingType, OperationCategory};

/// Every technology priced for one planning step.
#[derive(Debug, Clone)]
pub struct StepTechnologies {
    pub grid: StandardTechnology,
    pub sa_diesel: FuelTechnology,
    pub sa_pv: StandardTechnology,
    pub mg_diesel: FuelTechnology,
    pub mg_pv: StandardTechnology,
    pub mg_wind: StandardTechnology,
    pub mg_hydro: StandardTechnology,
    pub hybrid_renewable_share: f64,
    pub max_hydro_distance_km: f64,
    pub investment_year: u32,
}

impl StepTechnologies {
    pub fn for_step(config: &ScenarioConfig, window: &StepWindow) -> Self {
        let ctx = config.economic_context();
        let catalog = &config.technologies;

        let mut grid = catalog.grid.clone();
        grid.energy_price_per_kwh = window.grid_generation_cost;

        Self {
            grid: StandardTechnology::new(TechCode::Grid, grid, ctx),
            sa_diesel: FuelTechnology::new(
                TechCode::SaDiesel,
                catalog.sa_diesel.clone(),
                ctx,
                window.diesel_price,
                catalog.sa_diesel_fuel,
            ),
            sa_pv: StandardTechnology::new(
                TechCode::SaPv,
                catalog.sa_pv.clone().with_capital_cost_multiplier(config.pv_capital_cost_adjust),
                ctx,
            ),
            mg_diesel: FuelTechnology::new(
                TechCode::MgDiesel,
                catalog.mg_diesel.clone(),
                ctx,
                window.diesel_price,
                catalog.mg_diesel_fuel,
            ),
            mg_pv: StandardTechnology::new(
                TechCode::MgPv,
                catalog.mg_pv.clone().with_capital_cost_multiplier(config.pv_capital_cost_adjust),
                ctx,
            ),
            mg_wind: StandardTechnology::new(TechCode::MgWind, catalog.mg_wind.clone(), ctx),
            mg_hydro: StandardTechnology::new(TechCode::MgHydro, catalog.mg_hydro.clone(), ctx),
            hybrid_renewable_share: config.hybrid_renewable_share,
            max_hydro_distance_km: config.max_hydro_distance_km,
            investment_year: window.year.saturating_sub(window.time_step),
        }
    }

    fn base_request(&self, row: usize, projection: &Projection) -> CostRequest {
        CostRequest::new(row, projection.energy_demand_kwh, projection.new_households, self.investment_year)
    }

    /// Grid cost of connecting `row` over `distance_km` of new MV line.
    pub fn grid_cost(&self, row: usize, settlement: &Settlement, projection: &Projection, distance_km: f64) -> CostOutcome {
        if !distance_km.is_finite() {
            return CostOutcome::infeasible();
        }
        let request = self
            .base_request(row, projection)
            .with_mv_extension(distance_km, settlement.geography().grid_penalty_ratio);
        self.grid.evaluate(&request)
    }

    fn hydro_cost(&self, request: &CostRequest, settlement: &Settlement) -> CostOutcome {
        let geography = settlement.geography();
        let (distance, power) = match (geography.hydro_distance_km, geography.hydro_power_kw) {
            (Some(distance), Some(power)) => (distance, power),
            _ => return CostOutcome::infeasible(),
        };
        if !(distance <= self.max_hydro_distance_km) {
            return CostOutcome::infeasible();
        }
        let outcome = self.mg_hydro.evaluate(&request.with_mv_extension(distance, 1.0));
        if outcome.capacity_kw > power {
            CostOutcome::infeasible()
        } else {
            outcome
        }
    }

    /// Off-grid costs of one settlement, hybrid excluded; also returns the hybrid blend.
    fn off_grid_row(&self, row: usize, settlement: &Settlement, projection: &Projection) -> (TechMap<CostOutcome>, CostOutcome) {
        let base = self.base_request(row, projection);
        let pv = base.with_capacity_factor(settlement.pv_capacity_factor());
        let wind = base.with_capacity_factor(settlement.wind_capacity_factor());
        let diesel = base.with_travel_hours(settlement.geography().travel_hours);

        let mut costs = TechMap::filled(CostOutcome::infeasible());
        costs[TechCode::SaDiesel] = self.sa_diesel.evaluate(&diesel);
        costs[TechCode::SaPv] = self.sa_pv.evaluate(&pv);
        costs[TechCode::MgDiesel] = self.mg_diesel.evaluate(&diesel);
        costs[TechCode::MgPv] = self.mg_pv.evaluate(&pv);
        costs[TechCode::MgWind] = self.mg_wind.evaluate(&wind);
        costs[TechCode::MgHydro] = self.hydro_cost(&base, settlement);

        let hybrid = HybridTechnology::blend((&self.mg_pv, &pv), (&self.mg_diesel, &diesel), self.hybrid_renewable_share);
        (costs, hybrid)
    }

    /// Off-grid costs of every settlement, in row order. The grid slot stays infeasible.
    pub fn off_grid_costs(&self, table: &SettlementTable, projections: &[Projection], parallel: bool) -> Vec<TechMap<CostOutcome>> {
        let rows: Vec<(TechMap<CostOutcome>, CostOutcome)> = {
            let _timing = logging::start_timing(
                "off_grid_costs",
                OperationCategory::Costing { subcategory: CostingType::OffGrid },
            );
            let settlements = table.settlements();
            if parallel {
                settlements
                    .par_iter()
                    .zip(projections.par_iter())
                    .enumerate()
                    .map(|(row, (settlement, projection))| self.off_grid_row(row, settlement, projection))
                    .collect()
            } else {
                settlements
                    .iter()
                    .zip(projections)
                    .enumerate()
                    .map(|(row, (settlement, projection))| self.off_grid_row(row, settlement, projection))
                    .collect()
            }
        };

        let _timing = logging::start_timing(
            "hybrid_series",
            OperationCategory::Costing { subcategory: CostingType::Hybrid },
        );
        let (mut costs, series): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        let hybrid = HybridTechnology::new(series);
        for (row, (row_costs, projection)) in costs.iter_mut().zip(projections).enumerate() {
            row_costs[TechCode::MgHybrid] = hybrid.evaluate(&self.base_request(row, projection));
        }

        debug!(
            "Costed {} settlements off-grid for investment year {}",
            costs.len(),
            self.investment_year
        );
        costs
    }
}

/// Cheapest off-grid LCOE of a row, or +inf when nothing is feasible.
pub fn cheapest_off_grid(costs: &TechMap<CostOutcome>) -> f64 {
    TechCode::OFF_GRID
        .iter()
        .map(|tech| costs[*tech].lcoe)
        .fold(f64::INFINITY, f64::min)
}
