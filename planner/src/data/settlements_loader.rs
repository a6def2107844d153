use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use super::poi::Coordinate;
use crate::models::settlement::{Settlement, SettlementGeography};
use crate::models::settlement_table::SettlementTable;
use crate::utils::error::{PlanningError, Result};
use crate::utils::logging::{self, FileIOType, OperationCategory};

fn default_penalty_ratio() -> f64 {
    1.0
}

/// One line of the settlements CSV.
#[derive(Debug, Clone, Deserialize)]
struct SettlementRecord {
    id: u64,
    x_km: f64,
    y_km: f64,
    population: f64,
    #[serde(default, deserialize_with = "flag")]
    urban: bool,
    #[serde(default)]
    elevation_m: f64,
    #[serde(default)]
    ghi_kwh_m2_year: f64,
    #[serde(default)]
    wind_speed_ms: f64,
    #[serde(default)]
    mv_distance_km: Option<f64>,
    #[serde(default)]
    road_distance_km: f64,
    #[serde(default)]
    substation_distance_km: f64,
    #[serde(default)]
    transformer_distance_km: f64,
    #[serde(default)]
    night_lights: f64,
    #[serde(default)]
    hydro_distance_km: Option<f64>,
    #[serde(default)]
    hydro_power_kw: Option<f64>,
    #[serde(default)]
    travel_hours: f64,
    #[serde(default = "default_penalty_ratio")]
    grid_penalty_ratio: f64,
    #[serde(default, deserialize_with = "flag")]
    electrified_at_start: bool,
}

/// Accept `1`/`0` as well as `true`/`false`; empty reads as false.
fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        other => Err(serde::de::Error::custom(format!("expected a boolean flag, got '{}'", other))),
    }
}

impl SettlementRecord {
    fn into_settlement(self, row: usize) -> Result<Settlement> {
        let invalid = |reason: String| PlanningError::InvalidSettlement { row, reason };

        if !self.x_km.is_finite() || !self.y_km.is_finite() {
            return Err(invalid(format!("coordinates must be finite, got ({}, {})", self.x_km, self.y_km)));
        }
        for (name, value) in [
            ("ghi_kwh_m2_year", self.ghi_kwh_m2_year),
            ("wind_speed_ms", self.wind_speed_ms),
            ("travel_hours", self.travel_hours),
        ] {
            if !(value >= 0.0) {
                return Err(invalid(format!("{} must be non-negative, got {}", name, value)));
            }
        }

        // A missing MV distance means no reachable network
        let mv_distance_km = match self.mv_distance_km {
            Some(distance) if !(distance >= 0.0) => {
                return Err(invalid(format!("mv_distance_km must be non-negative, got {}", distance)))
            }
            Some(distance) => distance,
            None => f64::INFINITY,
        };
        let hydro_power_kw = self.hydro_power_kw.filter(|power| *power > 0.0);

        let geography = SettlementGeography {
            coordinate: Coordinate::new(self.x_km, self.y_km),
            population: self.population,
            urban: self.urban,
            elevation_m: self.elevation_m,
            ghi_kwh_m2_year: self.ghi_kwh_m2_year,
            wind_speed_ms: self.wind_speed_ms,
            mv_distance_km,
            road_distance_km: self.road_distance_km,
            substation_distance_km: self.substation_distance_km,
            transformer_distance_km: self.transformer_distance_km,
            night_lights: self.night_lights,
            hydro_distance_km: self.hydro_distance_km.filter(|_| hydro_power_kw.is_some()),
            hydro_power_kw,
            travel_hours: self.travel_hours,
            grid_penalty_ratio: self.grid_penalty_ratio,
            electrified_at_start: self.electrified_at_start,
        };
        Ok(Settlement::new(self.id, geography))
    }
}

/// Load a settlements CSV into a validated table, keeping file order as row order.
pub fn load_settlements(csv_path: impl AsRef<Path>) -> Result<SettlementTable> {
    let _timing = logging::start_timing(
        "load_settlements",
        OperationCategory::FileIO { subcategory: FileIOType::DataLoad },
    );
    let csv_path = csv_path.as_ref();

    let mut file = File::open(csv_path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let table = parse_settlements(&contents)?;

    info!("Loaded {} settlements from {}", table.len(), csv_path.display());
    Ok(table)
}

/// Parse settlements CSV text.
pub fn parse_settlements(contents: &str) -> Result<SettlementTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let mut settlements = Vec::new();
    for (row, result) in reader.deserialize::<SettlementRecord>().enumerate() {
        let record = result.map_err(|e| PlanningError::InvalidSettlement { row, reason: e.to_string() })?;
        settlements.push(record.into_settlement(row)?);
    }

    if settlements.is_empty() {
        warn!("Settlements file has no rows");
    }
    SettlementTable::new(settlements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "id,x_km,y_km,population,urban,ghi_kwh_m2_year,mv_distance_km,hydro_distance_km,hydro_power_kw,electrified_at_start";

    #[test]
    fn parses_rows_in_file_order() {
        let text = format!(
            "{}\n10,0,0,500,1,2000,3.5,,,1\n4,2.5,1,120,0,1800,,4,0,false\n",
            HEADER
        );
        let table = parse_settlements(&text).unwrap();
        assert_eq!(table.len(), 2);

        let first = &table.settlements()[0];
        assert_eq!(first.id(), 10);
        assert!(first.geography().urban);
        assert!(first.geography().electrified_at_start);
        assert_eq!(first.geography().mv_distance_km, 3.5);
        assert_eq!(first.geography().grid_penalty_ratio, 1.0);

        let second = &table.settlements()[1];
        assert_eq!(second.id(), 4);
        assert!(second.geography().mv_distance_km.is_infinite());
        // zero hydro power means no site at all
        assert_eq!(second.geography().hydro_power_kw, None);
        assert_eq!(second.geography().hydro_distance_km, None);
    }

    #[test]
    fn bad_value_reports_row() {
        let text = format!("{}\n1,0,0,100,0,2000,1,,,0\n2,0,0,abc,0,2000,1,,,0\n", HEADER);
        match parse_settlements(&text) {
            Err(PlanningError::InvalidSettlement { row, .. }) => assert_eq!(row, 1),
            other => panic!("expected invalid settlement, got {:?}", other),
        }
    }

    #[test]
    fn negative_population_rejected() {
        let text = format!("{}\n1,0,0,-5,0,2000,1,,,0\n", HEADER);
        assert!(matches!(
            parse_settlements(&text),
            Err(PlanningError::InvalidSettlement { row: 0, .. })
        ));
    }

    #[test]
    fn unreadable_mv_distance_rejected() {
        for distance in ["NaN", "-2"] {
            let text = format!("{}\n1,0,0,5,0,2000,{},,,0\n", HEADER, distance);
            assert!(
                matches!(parse_settlements(&text), Err(PlanningError::InvalidSettlement { row: 0, .. })),
                "mv distance {} accepted",
                distance
            );
        }
    }

    #[test]
    fn duplicate_ids_rejected() {
        let text = format!("{}\n1,0,0,5,0,2000,1,,,0\n1,3,0,5,0,2000,1,,,0\n", HEADER);
        assert!(matches!(
            parse_settlements(&text),
            Err(PlanningError::InvalidSettlement { row: 1, .. })
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "1,0,0,250,0,1900,2,,,0").unwrap();
        let table = load_settlements(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.settlements()[0].geography().population, 250.0);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_settlements("/nonexistent/settlements.csv"),
            Err(PlanningError::Io(_))
        ));
    }
}
