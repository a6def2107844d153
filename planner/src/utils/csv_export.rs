use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::tech_type::TechCode;
use crate::core::planning::ScenarioResult;
use crate::models::settlement::SettlementYear;
use crate::utils::error::Result;
use crate::utils::logging::{self, FileIOType, OperationCategory};

const GEOGRAPHY_COLUMNS: [&str; 17] = [
    "id",
    "x_km",
    "y_km",
    "population",
    "urban",
    "elevation_m",
    "ghi_kwh_m2_year",
    "wind_speed_ms",
    "mv_distance_km",
    "road_distance_km",
    "substation_distance_km",
    "transformer_distance_km",
    "night_lights",
    "hydro_distance_km",
    "hydro_power_kw",
    "travel_hours",
    "electrified_at_start",
];

const YEAR_COLUMNS: [&str; 12] = [
    "Population",
    "NewConnections",
    "EnergyDemand",
    "GridDistance",
    "ElecStatus",
    "FinalElecCode",
    "MinimumOverallLCOE",
    "InvestmentCost",
    "NewCapacity",
    "AdmissionPath",
    "GridIteration",
    "GridParent",
];

/// Writes planned scenarios into a timestamped run directory.
pub struct CsvExporter {
    output_dir: PathBuf,
    timestamp: String,
}

impl CsvExporter {
    /// Create `<output_dir>/<timestamp>`.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let full_path = output_dir.as_ref().join(&timestamp);
        std::fs::create_dir_all(&full_path)?;

        Ok(Self {
            output_dir: full_path,
            timestamp,
        })
    }

    /// Write straight into `output_dir`, without a timestamped subdirectory.
    pub fn in_dir(output_dir: impl AsRef<Path>) -> Result<Self> {
        std::fs::create_dir_all(output_dir.as_ref())?;
        Ok(Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            timestamp: String::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Write `<name>_results.csv` and `<name>_summary.csv`; returns both paths.
    pub fn export_scenario(&self, result: &ScenarioResult) -> Result<(PathBuf, PathBuf)> {
        let _timing = logging::start_timing(
            "export_scenario",
            OperationCategory::FileIO { subcategory: FileIOType::ResultsSave },
        );

        let results_path = self.output_dir.join(format!("{}_results.csv", result.name));
        let summary_path = self.output_dir.join(format!("{}_summary.csv", result.name));
        self.export_results(result, &results_path)?;
        self.export_summary(result, &summary_path)?;

        info!("Wrote scenario '{}' to {}", result.name, self.output_dir.display());
        Ok((results_path, summary_path))
    }

    /// One row per settlement: geography, then one column group per planned year.
    fn export_results(&self, result: &ScenarioResult, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let years = result.table.years();

        let mut header: Vec<String> = GEOGRAPHY_COLUMNS.iter().map(|c| c.to_string()).collect();
        for year in &years {
            header.extend(YEAR_COLUMNS.iter().map(|c| format!("{}{}", c, year)));
            header.extend(TechCode::ELECTRIFYING.iter().map(|tech| format!("Lcoe_{}_{}", tech, year)));
        }
        writer.write_record(&header)?;

        for settlement in result.table.settlements() {
            let g = settlement.geography();
            let optional = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
            let mut record = vec![
                settlement.id().to_string(),
                g.coordinate.x.to_string(),
                g.coordinate.y.to_string(),
                g.population.to_string(),
                g.urban.to_string(),
                g.elevation_m.to_string(),
                g.ghi_kwh_m2_year.to_string(),
                g.wind_speed_ms.to_string(),
                g.mv_distance_km.to_string(),
                g.road_distance_km.to_string(),
                g.substation_distance_km.to_string(),
                g.transformer_distance_km.to_string(),
                g.night_lights.to_string(),
                optional(g.hydro_distance_km),
                optional(g.hydro_power_kw),
                g.travel_hours.to_string(),
                g.electrified_at_start.to_string(),
            ];
            for year in &years {
                match settlement.year(*year) {
                    Some(state) => record.extend(year_fields(state)),
                    None => record.extend(std::iter::repeat(String::new()).take(YEAR_COLUMNS.len() + TechCode::ELECTRIFYING.len())),
                }
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Summary rows (`1.Population_Grid`, ...) with one column per year.
    fn export_summary(&self, result: &ScenarioResult, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec!["Indicator".to_string()];
        header.extend(result.summary.years.iter().map(|summary| summary.year.to_string()));
        writer.write_record(&header)?;

        for (label, values) in result.summary.rows() {
            let mut record = vec![label];
            record.extend(values.iter().map(|value| format!("{:.4}", value)));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn year_fields(state: &SettlementYear) -> Vec<String> {
    let chosen_lcoe = if state.is_electrified() { state.lcoe[state.chosen] } else { f64::INFINITY };
    let mut fields = vec![
        state.population.to_string(),
        state.new_connections.to_string(),
        state.energy_demand_kwh.to_string(),
        state.grid_distance_km.to_string(),
        u8::from(state.grid_connected).to_string(),
        state.chosen.code().to_string(),
        chosen_lcoe.to_string(),
        state.investment.to_string(),
        state.new_capacity_kw.to_string(),
        state.admission.map(|path| format!("{:?}", path)).unwrap_or_default(),
        state.grid_iteration.map(|i| i.to_string()).unwrap_or_default(),
        state.grid_parent.map(|id| id.to_string()).unwrap_or_default(),
    ];
    fields.extend(TechCode::ELECTRIFYING.iter().map(|tech| state.lcoe[*tech].to_string()));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::scenario_config::{PlanningStep, ScenarioConfig};
    use crate::core::planning::{run_scenario, RunOptions};
    use crate::data::poi::Coordinate;
    use crate::models::settlement::{Settlement, SettlementGeography};
    use crate::models::settlement_table::SettlementTable;

    #[test]
    fn writes_results_and_summary() {
        let mut geography = SettlementGeography::at(Coordinate::new(0.0, 0.0), 500.0);
        geography.ghi_kwh_m2_year = 2000.0;
        let table = SettlementTable::new(vec![Settlement::new(7, geography)]).unwrap();
        let config = ScenarioConfig {
            name: "solar".to_string(),
            start_year: 2020,
            end_year: 2025,
            steps: vec![PlanningStep {
                year: 2025,
                electrification_target: 1.0,
                diesel_price: None,
                grid_generation_cost: None,
            }],
            ..ScenarioConfig::default()
        };
        let result = run_scenario(table, &config, &RunOptions::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::in_dir(dir.path()).unwrap();
        let (results_path, summary_path) = exporter.export_scenario(&result).unwrap();

        let mut results = csv::Reader::from_path(&results_path).unwrap();
        let headers = results.headers().unwrap().clone();
        assert!(headers.iter().any(|h| h == "FinalElecCode2025"));
        let rows: Vec<csv::StringRecord> = results.records().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "7");

        let mut summary = csv::Reader::from_path(&summary_path).unwrap();
        assert_eq!(summary.headers().unwrap().iter().collect::<Vec<_>>(), vec!["Indicator", "2025"]);
        assert_eq!(summary.records().count(), 32);
    }

    #[test]
    fn timestamped_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();
        assert!(exporter.output_dir().is_dir());
        assert!(exporter.output_dir().ends_with(exporter.timestamp()));
    }
}
