use serde::{Deserialize, Serialize};

use crate::config::const_funcs::calc_tier_demand;
use crate::config::constants::*;
use crate::models::technology::{EconomicContext, TechnologyCatalog};
use crate::utils::error::{PlanningError, Result};

/// Order in which grid candidates are admitted (and newly electrified settlements kept).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PrioritizationRule {
    /// Closest to the network first.
    Distance,
    /// Cheapest grid LCOE first.
    Lcoe,
    /// Most populated first.
    Population,
    /// Weighted sum of normalised distance, LCOE and (inverse) population; lowest first.
    Composite { weights: CompositeWeights },
}

impl Default for PrioritizationRule {
    fn default() -> Self {
        PrioritizationRule::Distance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    pub distance: f64,
    pub lcoe: f64,
    pub population: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            distance: 1.0 / 3.0,
            lcoe: 1.0 / 3.0,
            population: 1.0 / 3.0,
        }
    }
}

/// One intermediate planning year and its access target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningStep {
    pub year: u32,
    pub electrification_target: f64,
    #[serde(default)]
    pub diesel_price: Option<f64>,
    #[serde(default)]
    pub grid_generation_cost: Option<f64>,
}

/// A planning step resolved against its predecessor and the scenario prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepWindow {
    pub year: u32,
    pub time_step: u32,
    /// The step that starts at the scenario start year.
    pub first_step: bool,
    pub electrification_target: f64,
    pub diesel_price: f64,
    pub grid_generation_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: String,
    pub start_year: u32,
    pub end_year: u32,
    pub steps: Vec<PlanningStep>,
    /// New grid connections per year, in people.
    pub annual_grid_connections_limit: f64,
    pub annual_grid_capacity_limit_mw: f64,
    /// Apply the annual limits to every step; by default only the first step is capped.
    pub limit_budget_after_first_step: bool,
    pub max_grid_extension_km: f64,
    pub auto_intensification_km: f64,
    pub prioritization: PrioritizationRule,
    /// Cost of grid generation per kWh.
    pub grid_generation_cost: f64,
    pub diesel_price: f64,
    pub pv_capital_cost_adjust: f64,
    pub discount_rate: f64,
    pub people_per_household_urban: f64,
    pub people_per_household_rural: f64,
    pub urban_tier: u8,
    pub rural_tier: u8,
    /// Extra demand for productive uses, as a share of residential demand.
    pub productive_demand_share: f64,
    pub urban_growth_rate: f64,
    pub rural_growth_rate: f64,
    /// National population at the end year; overrides the growth rates when set.
    pub end_year_population: Option<f64>,
    pub hybrid_renewable_share: f64,
    pub max_hydro_distance_km: f64,
    pub technologies: TechnologyCatalog,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: "baseline".to_string(),
            start_year: DEFAULT_START_YEAR,
            end_year: DEFAULT_END_YEAR,
            steps: vec![
                PlanningStep {
                    year: DEFAULT_INTERMEDIATE_YEAR,
                    electrification_target: 0.8,
                    diesel_price: None,
                    grid_generation_cost: None,
                },
                PlanningStep {
                    year: DEFAULT_END_YEAR,
                    electrification_target: 1.0,
                    diesel_price: None,
                    grid_generation_cost: None,
                },
            ],
            annual_grid_connections_limit: DEFAULT_ANNUAL_CONNECTIONS_LIMIT,
            annual_grid_capacity_limit_mw: DEFAULT_ANNUAL_CAPACITY_LIMIT_MW,
            limit_budget_after_first_step: false,
            max_grid_extension_km: DEFAULT_MAX_GRID_EXTENSION_KM,
            auto_intensification_km: DEFAULT_AUTO_INTENSIFICATION_KM,
            prioritization: PrioritizationRule::default(),
            grid_generation_cost: DEFAULT_GRID_GENERATION_COST,
            diesel_price: DEFAULT_DIESEL_PRICE,
            pv_capital_cost_adjust: 1.0,
            discount_rate: DEFAULT_DISCOUNT_RATE,
            people_per_household_urban: DEFAULT_PEOPLE_PER_HH_URBAN,
            people_per_household_rural: DEFAULT_PEOPLE_PER_HH_RURAL,
            urban_tier: 3,
            rural_tier: 2,
            productive_demand_share: 0.0,
            urban_growth_rate: 0.02,
            rural_growth_rate: 0.02,
            end_year_population: None,
            hybrid_renewable_share: DEFAULT_HYBRID_RENEWABLE_SHARE,
            max_hydro_distance_km: DEFAULT_MAX_HYDRO_DISTANCE_KM,
            technologies: TechnologyCatalog::default(),
        }
    }
}

fn require(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(PlanningError::Configuration(message()))
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    require(value >= 0.0, || format!("{} must be non-negative, got {}", name, value))
}

fn fraction(name: &str, value: f64) -> Result<()> {
    require((0.0..=1.0).contains(&value), || format!("{} must lie in [0, 1], got {}", name, value))
}

impl ScenarioConfig {
    /// Check every parameter before any year is planned.
    pub fn validate(&self) -> Result<()> {
        require(!self.name.trim().is_empty(), || "scenario name is empty".to_string())?;
        // The name becomes part of the output file names
        require(
            !self.name.contains(&['/', '\\'][..]) && self.name != "." && self.name != "..",
            || format!("scenario name '{}' must not contain path separators", self.name),
        )?;
        require(self.start_year <= self.end_year, || {
            format!("start year {} is after end year {}", self.start_year, self.end_year)
        })?;
        require(!self.steps.is_empty(), || "no planning steps".to_string())?;

        let mut previous = self.start_year;
        for step in &self.steps {
            require(step.year > previous, || {
                format!("planning step {} must come after {}", step.year, previous)
            })?;
            require(step.year <= self.end_year, || {
                format!("planning step {} is after the end year {}", step.year, self.end_year)
            })?;
            fraction(&format!("electrification target for {}", step.year), step.electrification_target)?;
            if let Some(price) = step.diesel_price {
                non_negative(&format!("diesel price for {}", step.year), price)?;
            }
            if let Some(cost) = step.grid_generation_cost {
                non_negative(&format!("grid generation cost for {}", step.year), cost)?;
            }
            previous = step.year;
        }

        non_negative("annual grid connections limit", self.annual_grid_connections_limit)?;
        non_negative("annual grid capacity limit", self.annual_grid_capacity_limit_mw)?;
        non_negative("max grid extension distance", self.max_grid_extension_km)?;
        non_negative("auto intensification distance", self.auto_intensification_km)?;
        non_negative("grid generation cost", self.grid_generation_cost)?;
        non_negative("diesel price", self.diesel_price)?;
        non_negative("max hydro distance", self.max_hydro_distance_km)?;
        non_negative("productive demand share", self.productive_demand_share)?;
        require(self.pv_capital_cost_adjust > 0.0, || {
            format!("PV capital cost adjustment must be positive, got {}", self.pv_capital_cost_adjust)
        })?;
        require(self.discount_rate > -1.0, || {
            format!("discount rate must exceed -100%, got {}", self.discount_rate)
        })?;
        require(self.people_per_household_urban > 0.0 && self.people_per_household_rural > 0.0, || {
            "people per household must be positive".to_string()
        })?;
        require(calc_tier_demand(self.urban_tier).is_some(), || {
            format!("urban tier {} outside {}..={}", self.urban_tier, MIN_TIER, MAX_TIER)
        })?;
        require(calc_tier_demand(self.rural_tier).is_some(), || {
            format!("rural tier {} outside {}..={}", self.rural_tier, MIN_TIER, MAX_TIER)
        })?;
        require(self.urban_growth_rate > -1.0 && self.rural_growth_rate > -1.0, || {
            "growth rates must exceed -100%".to_string()
        })?;
        if let Some(population) = self.end_year_population {
            non_negative("end year population", population)?;
        }
        fraction("hybrid renewable share", self.hybrid_renewable_share)?;

        if let PrioritizationRule::Composite { weights } = self.prioritization {
            non_negative("composite distance weight", weights.distance)?;
            non_negative("composite LCOE weight", weights.lcoe)?;
            non_negative("composite population weight", weights.population)?;
        }

        for (name, params) in self.technologies.iter() {
            fraction(&format!("{} distribution losses", name), params.distribution_losses)?;
            require(params.distribution_losses < 1.0, || format!("{} losses must be below 1", name))?;
            require(params.base_to_peak_load_ratio > 0.0, || {
                format!("{} base to peak load ratio must be positive", name)
            })?;
            require(params.tech_life > 0, || format!("{} technical life must be positive", name))?;
            non_negative(&format!("{} connection cost", name), params.connection_cost_per_hh)?;
            for tier in &params.capital_cost {
                non_negative(&format!("{} capital cost", name), tier.cost_per_kw)?;
            }
            if let Some(network) = &params.distribution_network {
                non_negative(&format!("{} LV line length", name), network.lv_line_km_per_household)?;
                non_negative(&format!("{} LV line cost", name), network.lv_line_cost_per_km)?;
                non_negative(&format!("{} transformer cost", name), network.service_transformer_cost)?;
                require(
                    network.service_transformer_kva > 0.0
                        && network.max_households_per_transformer > 0.0
                        && network.power_factor > 0.0
                        && network.power_factor <= 1.0,
                    || format!("{} transformer sizing must be positive with a power factor in (0, 1]", name),
                )?;
            }
        }
        for (name, fuel) in [
            ("mg_diesel", &self.technologies.mg_diesel_fuel),
            ("sa_diesel", &self.technologies.sa_diesel_fuel),
        ] {
            require(fuel.efficiency > 0.0 && fuel.efficiency <= 1.0, || {
                format!("{} efficiency must lie in (0, 1], got {}", name, fuel.efficiency)
            })?;
            require(fuel.truck_volume_l > 0.0, || format!("{} truck volume must be positive", name))?;
            non_negative(&format!("{} truck consumption", name), fuel.truck_consumption_l_per_h)?;
        }
        Ok(())
    }

    pub fn economic_context(&self) -> EconomicContext {
        EconomicContext {
            base_year: self.start_year,
            end_year: self.end_year,
            discount_rate: self.discount_rate,
        }
    }

    /// Planning steps with their time step and resolved prices.
    pub fn step_windows(&self) -> Vec<StepWindow> {
        let mut previous = self.start_year;
        self.steps
            .iter()
            .map(|step| {
                let window = StepWindow {
                    year: step.year,
                    time_step: step.year.saturating_sub(previous),
                    first_step: previous == self.start_year,
                    electrification_target: step.electrification_target,
                    diesel_price: step.diesel_price.unwrap_or(self.diesel_price),
                    grid_generation_cost: step.grid_generation_cost.unwrap_or(self.grid_generation_cost),
                };
                previous = step.year;
                window
            })
            .collect()
    }

    pub fn people_per_household(&self, urban: bool) -> f64 {
        if urban {
            self.people_per_household_urban
        } else {
            self.people_per_household_rural
        }
    }

    /// Household demand (kWh/year) of the target tier, productive uses included.
    pub fn household_demand(&self, urban: bool) -> f64 {
        let tier = if urban { self.urban_tier } else { self.rural_tier };
        calc_tier_demand(tier).unwrap_or(0.0) * (1.0 + self.productive_demand_share)
    }
}
