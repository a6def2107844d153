use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::const_funcs::{calc_growth_rate, calc_population};
use crate::config::scenario_config::ScenarioConfig;
use crate::models::settlement::Settlement;
use crate::models::settlement_table::SettlementTable;
use crate::utils::logging::{self, CostingType, OperationCategory};

/// Annual population growth by land class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthRates {
    pub urban: f64,
    pub rural: f64,
}

impl GrowthRates {
    /// Scenario growth rates, or one uniform rate reaching `end_year_population` when it is set.
    pub fn for_scenario(config: &ScenarioConfig, table: &SettlementTable) -> Self {
        match config.end_year_population {
            Some(end_population) => {
                let start_population: f64 = table.settlements().iter().map(Settlement::start_population).sum();
                let rate = calc_growth_rate(
                    start_population,
                    end_population,
                    config.end_year.saturating_sub(config.start_year),
                );
                debug!("Uniform growth rate {:.4} to reach {:.0} people by {}", rate, end_population, config.end_year);
                Self { urban: rate, rural: rate }
            }
            None => Self {
                urban: config.urban_growth_rate,
                rural: config.rural_growth_rate,
            },
        }
    }

    pub fn rate(&self, urban: bool) -> f64 {
        if urban {
            self.urban
        } else {
            self.rural
        }
    }
}

/// Demand-side state of one settlement in one planning year.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Projection {
    pub population: f64,
    pub households: f64,
    /// People who need a new connection this step.
    pub new_connections: f64,
    pub new_households: f64,
    pub demand_per_household: f64,
    /// Annual consumption of the new connections (kWh/year).
    pub energy_demand_kwh: f64,
}

pub fn project_settlement(
    settlement: &Settlement,
    config: &ScenarioConfig,
    growth: &GrowthRates,
    year: u32,
) -> Projection {
    let urban = settlement.is_urban();
    let population = calc_population(
        settlement.start_population(),
        growth.rate(urban),
        year.saturating_sub(config.start_year),
    );
    let previous_population = settlement
        .previous(year)
        .map(|(_, state)| state.population)
        .unwrap_or_else(|| settlement.start_population());

    // Served settlements only connect their growth
    let new_connections = if settlement.electrified_before(year) {
        (population - previous_population).max(0.0)
    } else {
        population
    };

    let people_per_household = config.people_per_household(urban);
    let new_households = new_connections / people_per_household;
    let demand_per_household = config.household_demand(urban);

    Projection {
        population,
        households: population / people_per_household,
        new_connections,
        new_households,
        demand_per_household,
        energy_demand_kwh: new_households * demand_per_household,
    }
}

/// Project every settlement for `year`, in row order.
pub fn project_table(
    table: &SettlementTable,
    config: &ScenarioConfig,
    growth: &GrowthRates,
    year: u32,
    parallel: bool,
) -> Vec<Projection> {
    let _timing = logging::start_timing(
        "project_table",
        OperationCategory::Costing { subcategory: CostingType::Projection },
    );

    let settlements = table.settlements();
    if parallel {
        settlements
            .par_iter()
            .map(|settlement| project_settlement(settlement, config, growth, year))
            .collect()
    } else {
        settlements
            .iter()
            .map(|settlement| project_settlement(settlement, config, growth, year))
            .collect()
    }
}
