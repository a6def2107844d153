//! Discounted cash flow and LCOE for every technology kind.
//!
//! Standard technologies (grid, PV, wind, hydro) pay a fixed energy price per
//! generated kWh (zero for renewables), fuel technologies derive theirs from
//! delivery logistics, and hybrids replay a series blended outside the model.
use serde::{Deserialize, Serialize};

use crate::config::const_funcs::{calc_fuel_cost_per_kwh, clip_capacity_factor};
use crate::config::constants::{HOURS_PER_YEAR, INFEASIBLE_LCOE};
use crate::config::tech_type::TechCode;
use crate::models::technology::{EconomicContext, FuelLogistics, TechnologyParams};

/// What a technology needs to know about one settlement to cost it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostRequest {
    pub row: usize,
    /// Annual consumption of the new connections (kWh/year).
    pub energy_kwh: f64,
    pub new_households: f64,
    /// Resource-dependent capacity factor; the technology default applies when absent.
    pub capacity_factor: Option<f64>,
    pub additional_mv_km: f64,
    pub grid_penalty_ratio: f64,
    pub travel_hours: f64,
    pub investment_year: u32,
}

impl CostRequest {
    pub fn new(row: usize, energy_kwh: f64, new_households: f64, investment_year: u32) -> Self {
        Self {
            row,
            energy_kwh,
            new_households,
            capacity_factor: None,
            additional_mv_km: 0.0,
            grid_penalty_ratio: 1.0,
            travel_hours: 0.0,
            investment_year,
        }
    }

    pub fn with_capacity_factor(mut self, capacity_factor: f64) -> Self {
        self.capacity_factor = Some(capacity_factor);
        self
    }

    pub fn with_mv_extension(mut self, additional_mv_km: f64, grid_penalty_ratio: f64) -> Self {
        self.additional_mv_km = additional_mv_km;
        self.grid_penalty_ratio = grid_penalty_ratio;
        self
    }

    pub fn with_travel_hours(mut self, travel_hours: f64) -> Self {
        self.travel_hours = travel_hours;
        self
    }

    pub fn with_energy(mut self, energy_kwh: f64) -> Self {
        self.energy_kwh = energy_kwh;
        self
    }
}

/// Cost of serving one settlement with one technology.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostOutcome {
    pub lcoe: f64,
    pub investment: f64,
    pub capacity_kw: f64,
}

impl CostOutcome {
    pub fn infeasible() -> Self {
        Self {
            lcoe: INFEASIBLE_LCOE,
            investment: 0.0,
            capacity_kw: 0.0,
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.lcoe.is_finite()
    }
}

/// Annual cash flow of an installation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashFlow {
    pub investment: f64,
    pub annual_om: f64,
    pub annual_fuel: f64,
    pub delivered_energy_kwh: f64,
    pub tech_life: u32,
}

/// Levelized cost of the delivered energy of `cash`, installed in `investment_year`.
///
/// The horizon runs from the base year to the later of the planning end year and
/// the investment year. The installation is renewed every `tech_life` years and
/// the unused life of the last one is credited back at the end of the horizon.
pub fn discounted_lcoe(cash: &CashFlow, ctx: &EconomicContext, investment_year: u32) -> f64 {
    if cash.delivered_energy_kwh <= 0.0 {
        return INFEASIBLE_LCOE;
    }

    let base_year = ctx.base_year.min(investment_year);
    let horizon_end = ctx.end_year.max(investment_year);
    let project_life = horizon_end - base_year + 1;
    let step = investment_year - base_year;
    let tech_life = cash.tech_life.max(1);

    let mut discounted_costs = 0.0;
    let mut discounted_energy = 0.0;
    for t in step..project_life {
        let discount_factor = (1.0 + ctx.discount_rate).powi(t as i32);
        let since_install = t - step;

        let mut cost = cash.annual_om + cash.annual_fuel;
        if since_install % tech_life == 0 {
            cost += cash.investment;
        }
        if t == project_life - 1 {
            let used_life = (since_install % tech_life + 1) as f64;
            cost -= cash.investment * (1.0 - used_life / tech_life as f64);
        }

        discounted_costs += cost / discount_factor;
        discounted_energy += cash.delivered_energy_kwh / discount_factor;
    }

    discounted_costs / discounted_energy
}

/// Common interface of every technology kind.
pub trait CostModel: Send + Sync {
    fn tech(&self) -> TechCode;

    fn evaluate(&self, request: &CostRequest) -> CostOutcome;
}

/// Technology with a fixed price per generated kWh (the grid) or none (renewables).
#[derive(Debug, Clone)]
pub struct StandardTechnology {
    tech: TechCode,
    params: TechnologyParams,
    ctx: EconomicContext,
}

impl StandardTechnology {
    pub fn new(tech: TechCode, params: TechnologyParams, ctx: EconomicContext) -> Self {
        Self { tech, params, ctx }
    }

    /// Full costing with an explicit fuel (or purchased energy) cost per generated kWh.
    pub fn evaluate_with_fuel(&self, request: &CostRequest, fuel_cost_per_kwh: f64) -> CostOutcome {
        if !(request.energy_kwh > 0.0) || !(request.new_households > 0.0) {
            return CostOutcome::infeasible();
        }
        let capacity_factor = match clip_capacity_factor(request.capacity_factor.unwrap_or(self.params.capacity_factor)) {
            Some(cf) => cf,
            None => return CostOutcome::infeasible(),
        };
        let base_to_peak = self.params.base_to_peak_load_ratio;
        let losses = self.params.distribution_losses;
        if !(base_to_peak > 0.0) || !(losses < 1.0) {
            return CostOutcome::infeasible();
        }

        let generation = request.energy_kwh / (1.0 - losses);
        let peak_load = generation / HOURS_PER_YEAR / base_to_peak;
        let capacity_kw = peak_load / capacity_factor;

        let cost_per_kw = self.params.cost_per_kw(capacity_kw / request.new_households);
        let network = self
            .params
            .distribution_network
            .map_or(0.0, |network| network.investment(request.new_households, peak_load));
        let td_investment = (self.params.connection_cost_per_hh * request.new_households
            + self.params.mv_line_cost_per_km * request.additional_mv_km.max(0.0)
            + network)
            * request.grid_penalty_ratio;
        let capital = (cost_per_kw + self.params.grid_capacity_investment_per_kw) * capacity_kw;
        let investment = td_investment + capital;

        let cash = CashFlow {
            investment,
            annual_om: self.params.om_of_td_lines * td_investment + self.params.om_costs * cost_per_kw * capacity_kw,
            annual_fuel: fuel_cost_per_kwh * generation,
            delivered_energy_kwh: request.energy_kwh,
            tech_life: self.params.tech_life,
        };

        CostOutcome {
            lcoe: discounted_lcoe(&cash, &self.ctx, request.investment_year),
            investment,
            capacity_kw,
        }
    }
}

impl CostModel for StandardTechnology {
    fn tech(&self) -> TechCode {
        self.tech
    }

    fn evaluate(&self, request: &CostRequest) -> CostOutcome {
        self.evaluate_with_fuel(request, self.params.energy_price_per_kwh)
    }
}

/// Diesel technology: fuel cost depends on how far the fuel travels.
#[derive(Debug, Clone)]
pub struct FuelTechnology {
    base: StandardTechnology,
    fuel_price_per_l: f64,
    logistics: FuelLogistics,
}

impl FuelTechnology {
    pub fn new(
        tech: TechCode,
        params: TechnologyParams,
        ctx: EconomicContext,
        fuel_price_per_l: f64,
        logistics: FuelLogistics,
    ) -> Self {
        Self {
            base: StandardTechnology::new(tech, params, ctx),
            fuel_price_per_l,
            logistics,
        }
    }

    pub fn fuel_cost_per_kwh(&self, travel_hours: f64) -> f64 {
        calc_fuel_cost_per_kwh(
            self.fuel_price_per_l,
            travel_hours,
            self.logistics.truck_consumption_l_per_h,
            self.logistics.truck_volume_l,
            self.logistics.efficiency,
        )
    }
}

impl CostModel for FuelTechnology {
    fn tech(&self) -> TechCode {
        self.base.tech
    }

    fn evaluate(&self, request: &CostRequest) -> CostOutcome {
        if !(self.logistics.efficiency > 0.0) {
            return CostOutcome::infeasible();
        }
        self.base.evaluate_with_fuel(request, self.fuel_cost_per_kwh(request.travel_hours))
    }
}

/// Renewable mini-grid backed by diesel, costed from an externally blended series.
#[derive(Debug, Clone, Default)]
pub struct HybridTechnology {
    series: Vec<CostOutcome>,
}

impl HybridTechnology {
    pub fn new(series: Vec<CostOutcome>) -> Self {
        Self { series }
    }

    /// Blend a renewable technology carrying `renewable_share` of the energy with a
    /// back-up sized for the residual.
    ///
    /// Each part is costed with its own request (capacity factor, travel time); the
    /// total energy is taken from the renewable request. The LCOE is the
    /// energy-weighted mean of both parts; investment and capacity add up.
    pub fn blend(
        renewable: (&dyn CostModel, &CostRequest),
        backup: (&dyn CostModel, &CostRequest),
        renewable_share: f64,
    ) -> CostOutcome {
        let total_energy = renewable.1.energy_kwh;
        if !(total_energy > 0.0) {
            return CostOutcome::infeasible();
        }
        let share = renewable_share.clamp(0.0, 1.0);
        let renewable_energy = total_energy * share;
        let backup_energy = total_energy - renewable_energy;

        let mut blended = CostOutcome::default();
        for ((model, request), energy) in [(renewable, renewable_energy), (backup, backup_energy)] {
            if energy <= 0.0 {
                continue;
            }
            let part = model.evaluate(&request.with_energy(energy));
            if !part.is_feasible() {
                return CostOutcome::infeasible();
            }
            blended.lcoe += part.lcoe * energy / total_energy;
            blended.investment += part.investment;
            blended.capacity_kw += part.capacity_kw;
        }
        blended
    }
}

impl CostModel for HybridTechnology {
    fn tech(&self) -> TechCode {
        TechCode::MgHybrid
    }

    fn evaluate(&self, request: &CostRequest) -> CostOutcome {
        self.series
            .get(request.row)
            .copied()
            .unwrap_or_else(CostOutcome::infeasible)
    }
}
