use serde::{Deserialize, Serialize};

use crate::config::constants::*;

/// One step of a tiered capital cost schedule.
///
/// Applies to installations whose capacity per household is at most
/// `max_kw_per_household`; `None` means no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalCostTier {
    pub max_kw_per_household: Option<f64>,
    pub cost_per_kw: f64,
}

impl CapitalCostTier {
    pub fn unbounded(cost_per_kw: f64) -> Self {
        Self { max_kw_per_household: None, cost_per_kw }
    }

    pub fn up_to(max_kw_per_household: f64, cost_per_kw: f64) -> Self {
        Self { max_kw_per_household: Some(max_kw_per_household), cost_per_kw }
    }
}

/// Low-voltage network and service transformers built inside a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionNetwork {
    pub lv_line_km_per_household: f64,
    pub lv_line_cost_per_km: f64,
    pub service_transformer_cost: f64,
    pub service_transformer_kva: f64,
    pub max_households_per_transformer: f64,
    pub power_factor: f64,
}

impl Default for DistributionNetwork {
    fn default() -> Self {
        Self {
            lv_line_km_per_household: DEFAULT_LV_LINE_KM_PER_HOUSEHOLD,
            lv_line_cost_per_km: DEFAULT_LV_LINE_COST_PER_KM,
            service_transformer_cost: DEFAULT_SERVICE_TRANSFORMER_COST,
            service_transformer_kva: DEFAULT_SERVICE_TRANSFORMER_KVA,
            max_households_per_transformer: DEFAULT_MAX_HOUSEHOLDS_PER_TRANSFORMER,
            power_factor: DEFAULT_POWER_FACTOR,
        }
    }
}

impl DistributionNetwork {
    /// Service transformers needed for `households` drawing `peak_load_kw`.
    ///
    /// Whichever of household count and load needs more transformers decides.
    pub fn transformers(&self, households: f64, peak_load_kw: f64) -> f64 {
        let ratio = |value: f64, per_unit: f64| if per_unit > 0.0 { value / per_unit } else { 0.0 };
        let by_households = ratio(households, self.max_households_per_transformer);
        let by_load = ratio(peak_load_kw, self.service_transformer_kva * self.power_factor);
        by_households.max(by_load).ceil()
    }

    pub fn investment(&self, households: f64, peak_load_kw: f64) -> f64 {
        let lv_lines = self.lv_line_km_per_household * households * self.lv_line_cost_per_km;
        lv_lines + self.transformers(households, peak_load_kw) * self.service_transformer_cost
    }
}

/// Economic parameters of one technology variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyParams {
    pub om_of_td_lines: f64,
    pub distribution_losses: f64,
    pub connection_cost_per_hh: f64,
    pub base_to_peak_load_ratio: f64,
    pub capacity_factor: f64,
    pub tech_life: u32,
    pub om_costs: f64,
    pub capital_cost: Vec<CapitalCostTier>,
    pub grid_capacity_investment_per_kw: f64,
    pub mv_line_cost_per_km: f64,
    pub energy_price_per_kwh: f64,
    /// Network the technology builds to reach households; stand-alone systems have none.
    pub distribution_network: Option<DistributionNetwork>,
}

impl Default for TechnologyParams {
    fn default() -> Self {
        Self {
            om_of_td_lines: 0.0,
            distribution_losses: 0.0,
            connection_cost_per_hh: 0.0,
            base_to_peak_load_ratio: 0.0,
            capacity_factor: 0.9,
            tech_life: 0,
            om_costs: 0.0,
            capital_cost: Vec::new(),
            grid_capacity_investment_per_kw: 0.0,
            mv_line_cost_per_km: 0.0,
            energy_price_per_kwh: 0.0,
            distribution_network: None,
        }
    }
}

impl TechnologyParams {
    /// Capital cost per kW for an installation sized at `kw_per_household`.
    ///
    /// Picks the tier with the smallest bound that still covers the ratio;
    /// an unbounded tier covers everything. Falls back to the largest bounded
    /// tier when nothing covers the ratio.
    pub fn cost_per_kw(&self, kw_per_household: f64) -> f64 {
        let covering = self
            .capital_cost
            .iter()
            .filter(|tier| tier.max_kw_per_household.map_or(true, |max| max >= kw_per_household))
            .min_by(|a, b| {
                let a = a.max_kw_per_household.unwrap_or(f64::INFINITY);
                let b = b.max_kw_per_household.unwrap_or(f64::INFINITY);
                a.total_cmp(&b)
            });

        match covering {
            Some(tier) => tier.cost_per_kw,
            None => self
                .capital_cost
                .iter()
                .max_by(|a, b| {
                    let a = a.max_kw_per_household.unwrap_or(f64::INFINITY);
                    let b = b.max_kw_per_household.unwrap_or(f64::INFINITY);
                    a.total_cmp(&b)
                })
                .map(|tier| tier.cost_per_kw)
                .unwrap_or(0.0),
        }
    }

    pub fn with_capital_cost_multiplier(mut self, multiplier: f64) -> Self {
        for tier in &mut self.capital_cost {
            tier.cost_per_kw *= multiplier;
        }
        self
    }
}

/// Truck delivery and conversion parameters of a diesel technology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuelLogistics {
    pub efficiency: f64,
    pub truck_consumption_l_per_h: f64,
    pub truck_volume_l: f64,
}

/// Run-wide economic parameters handed to every technology constructor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EconomicContext {
    pub base_year: u32,
    pub end_year: u32,
    pub discount_rate: f64,
}

/// Parameters of every technology a scenario can deploy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyCatalog {
    pub grid: TechnologyParams,
    pub mg_hydro: TechnologyParams,
    pub mg_wind: TechnologyParams,
    pub mg_pv: TechnologyParams,
    pub sa_pv: TechnologyParams,
    pub mg_diesel: TechnologyParams,
    pub sa_diesel: TechnologyParams,
    pub mg_diesel_fuel: FuelLogistics,
    pub sa_diesel_fuel: FuelLogistics,
}

impl Default for TechnologyCatalog {
    fn default() -> Self {
        let mini_grid = TechnologyParams {
            om_of_td_lines: 0.02,
            distribution_losses: 0.05,
            connection_cost_per_hh: 100.0,
            base_to_peak_load_ratio: 0.85,
            distribution_network: Some(DistributionNetwork::default()),
            ..TechnologyParams::default()
        };

        Self {
            grid: TechnologyParams {
                om_of_td_lines: 0.02,
                distribution_losses: DEFAULT_GRID_LOSSES,
                connection_cost_per_hh: 125.0,
                base_to_peak_load_ratio: 0.8,
                capacity_factor: 1.0,
                tech_life: 30,
                grid_capacity_investment_per_kw: DEFAULT_GRID_CAPACITY_INVESTMENT,
                mv_line_cost_per_km: DEFAULT_MV_LINE_COST_PER_KM,
                ..TechnologyParams::default()
            },
            mg_hydro: TechnologyParams {
                capacity_factor: 0.5,
                tech_life: 30,
                capital_cost: vec![CapitalCostTier::unbounded(3000.0)],
                om_costs: 0.03,
                ..mini_grid.clone()
            },
            mg_wind: TechnologyParams {
                capital_cost: vec![CapitalCostTier::unbounded(3750.0)],
                om_costs: 0.02,
                tech_life: 20,
                ..mini_grid.clone()
            },
            mg_pv: TechnologyParams {
                tech_life: 20,
                om_costs: 0.015,
                capital_cost: vec![CapitalCostTier::unbounded(2950.0)],
                ..mini_grid.clone()
            },
            sa_pv: TechnologyParams {
                base_to_peak_load_ratio: 0.9,
                tech_life: 15,
                om_costs: 0.02,
                capital_cost: vec![
                    CapitalCostTier::up_to(0.020, 9620.0),
                    CapitalCostTier::up_to(0.050, 8780.0),
                    CapitalCostTier::up_to(0.100, 6380.0),
                    CapitalCostTier::up_to(1.0, 4470.0),
                    CapitalCostTier::unbounded(6950.0),
                ],
                ..TechnologyParams::default()
            },
            mg_diesel: TechnologyParams {
                capacity_factor: 0.7,
                tech_life: 15,
                om_costs: 0.1,
                capital_cost: vec![CapitalCostTier::unbounded(721.0)],
                ..mini_grid
            },
            sa_diesel: TechnologyParams {
                base_to_peak_load_ratio: 0.9,
                capacity_factor: 0.5,
                tech_life: 10,
                om_costs: 0.1,
                capital_cost: vec![CapitalCostTier::unbounded(938.0)],
                ..TechnologyParams::default()
            },
            mg_diesel_fuel: FuelLogistics {
                efficiency: 0.33,
                truck_consumption_l_per_h: 33.7,
                truck_volume_l: 15000.0,
            },
            sa_diesel_fuel: FuelLogistics {
                efficiency: 0.28,
                truck_consumption_l_per_h: 14.0,
                truck_volume_l: 300.0,
            },
        }
    }
}

impl TechnologyCatalog {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &TechnologyParams)> {
        [
            ("grid", &self.grid),
            ("mg_hydro", &self.mg_hydro),
            ("mg_wind", &self.mg_wind),
            ("mg_pv", &self.mg_pv),
            ("sa_pv", &self.sa_pv),
            ("mg_diesel", &self.mg_diesel),
            ("sa_diesel", &self.sa_diesel),
        ]
        .into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallest_covering_tier_wins() {
        let sa_pv = TechnologyCatalog::default().sa_pv;
        assert_eq!(sa_pv.cost_per_kw(0.010), 9620.0);
        assert_eq!(sa_pv.cost_per_kw(0.020), 9620.0);
        assert_eq!(sa_pv.cost_per_kw(0.030), 8780.0);
        assert_eq!(sa_pv.cost_per_kw(0.5), 4470.0);
        assert_eq!(sa_pv.cost_per_kw(3.0), 6950.0);
    }

    #[test]
    fn bounded_schedule_falls_back_to_largest_tier() {
        let params = TechnologyParams {
            capital_cost: vec![CapitalCostTier::up_to(0.1, 500.0), CapitalCostTier::up_to(1.0, 300.0)],
            ..TechnologyParams::default()
        };
        assert_eq!(params.cost_per_kw(5.0), 300.0);
        assert_eq!(TechnologyParams::default().cost_per_kw(1.0), 0.0);
    }

    #[test]
    fn only_mini_grids_build_a_distribution_network() {
        let catalog = TechnologyCatalog::default();
        for params in [&catalog.mg_pv, &catalog.mg_diesel, &catalog.mg_wind, &catalog.mg_hydro] {
            assert_eq!(params.distribution_network, Some(DistributionNetwork::default()));
        }
        for params in [&catalog.grid, &catalog.sa_pv, &catalog.sa_diesel] {
            assert_eq!(params.distribution_network, None);
        }
    }

    #[test]
    fn transformers_follow_households_or_load() {
        let network = DistributionNetwork::default();
        assert_eq!(network.transformers(100.0, 5.0), 1.0);
        assert_eq!(network.transformers(601.0, 5.0), 3.0);
        // 45 kW per transformer at a 0.9 power factor
        assert_eq!(network.transformers(10.0, 100.0), 3.0);
        assert_eq!(network.investment(100.0, 5.0), 0.025 * 100.0 * 10000.0 + 4250.0);
    }

    #[test]
    fn multiplier_scales_every_tier() {
        let sa_pv = TechnologyCatalog::default().sa_pv.with_capital_cost_multiplier(0.5);
        assert_eq!(sa_pv.cost_per_kw(0.010), 4810.0);
        assert_eq!(sa_pv.cost_per_kw(3.0), 3475.0);
    }
}
