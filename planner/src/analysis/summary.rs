use serde::{Deserialize, Serialize};

use crate::config::tech_type::{TechCode, TechMap};
use crate::models::settlement_table::SettlementTable;
use crate::utils::logging::{self, OperationCategory, SelectionType};

/// Per-technology totals of one planning year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: u32,
    pub total_population: f64,
    /// Population served by each technology.
    pub population: TechMap<f64>,
    /// People newly connected by each technology this step.
    pub new_connections: TechMap<f64>,
    /// Capacity added by each technology (kW).
    pub capacity_kw: TechMap<f64>,
    pub investment: TechMap<f64>,
}

impl YearSummary {
    pub fn electrified_population(&self) -> f64 {
        TechCode::ELECTRIFYING.iter().map(|tech| self.population[*tech]).sum()
    }

    pub fn electrified_fraction(&self) -> f64 {
        if self.total_population > 0.0 {
            self.electrified_population() / self.total_population
        } else {
            0.0
        }
    }

    pub fn total_investment(&self) -> f64 {
        TechCode::ELECTRIFYING.iter().map(|tech| self.investment[*tech]).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub years: Vec<YearSummary>,
}

impl ScenarioSummary {
    pub fn year(&self, year: u32) -> Option<&YearSummary> {
        self.years.iter().find(|summary| summary.year == year)
    }

    /// Labelled rows of the summary table, one value per year.
    pub fn rows(&self) -> Vec<(String, Vec<f64>)> {
        let mut rows = Vec::with_capacity(SummaryMetric::ALL.len() * TechCode::ELECTRIFYING.len());
        for metric in SummaryMetric::ALL {
            for tech in TechCode::ELECTRIFYING {
                let values = self.years.iter().map(|summary| metric.totals(summary)[tech]).collect();
                rows.push((format!("{}{}", metric.prefix(), tech.display_name()), values));
            }
        }
        rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMetric {
    Population,
    NewConnections,
    Capacity,
    Investment,
}

impl SummaryMetric {
    pub const ALL: [SummaryMetric; 4] = [
        SummaryMetric::Population,
        SummaryMetric::NewConnections,
        SummaryMetric::Capacity,
        SummaryMetric::Investment,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            SummaryMetric::Population => "1.Population_",
            SummaryMetric::NewConnections => "2.New_Connections_",
            SummaryMetric::Capacity => "3.Capacity_",
            SummaryMetric::Investment => "4.Investment_",
        }
    }

    pub fn totals<'a>(&self, summary: &'a YearSummary) -> &'a TechMap<f64> {
        match self {
            SummaryMetric::Population => &summary.population,
            SummaryMetric::NewConnections => &summary.new_connections,
            SummaryMetric::Capacity => &summary.capacity_kw,
            SummaryMetric::Investment => &summary.investment,
        }
    }
}

/// Aggregate every recorded year of `table` by chosen technology.
pub fn summarize(table: &SettlementTable) -> ScenarioSummary {
    let _timing = logging::start_timing(
        "summarize",
        OperationCategory::Selection { subcategory: SelectionType::Summary },
    );

    let years = table
        .years()
        .into_iter()
        .map(|year| {
            let mut summary = YearSummary {
                year,
                total_population: 0.0,
                population: TechMap::default(),
                new_connections: TechMap::default(),
                capacity_kw: TechMap::default(),
                investment: TechMap::default(),
            };
            for state in table.settlements().iter().filter_map(|s| s.year(year)) {
                summary.total_population += state.population;
                if !state.is_electrified() {
                    continue;
                }
                let tech = state.chosen;
                summary.population[tech] += state.population;
                summary.new_connections[tech] += state.new_connections;
                summary.capacity_kw[tech] += state.new_capacity_kw;
                summary.investment[tech] += state.investment;
            }
            summary
        })
        .collect();

    ScenarioSummary { years }
}
