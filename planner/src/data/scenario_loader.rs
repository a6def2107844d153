use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::config::scenario_config::ScenarioConfig;
use crate::utils::error::{PlanningError, Result};
use crate::utils::logging::{self, FileIOType, OperationCategory};

/// A scenarios file holds either a list under `scenarios` or one bare scenario.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScenarioFile {
    Set { scenarios: Vec<ScenarioConfig> },
    Single(ScenarioConfig),
}

/// Load and validate every scenario in a JSON file.
pub fn load_scenarios(json_path: impl AsRef<Path>) -> Result<Vec<ScenarioConfig>> {
    let _timing = logging::start_timing(
        "load_scenarios",
        OperationCategory::FileIO { subcategory: FileIOType::ScenarioLoad },
    );
    let json_path = json_path.as_ref();
    let contents = std::fs::read_to_string(json_path)?;
    let scenarios = parse_scenarios(&contents)?;
    info!("Loaded {} scenarios from {}", scenarios.len(), json_path.display());
    Ok(scenarios)
}

pub fn parse_scenarios(contents: &str) -> Result<Vec<ScenarioConfig>> {
    let scenarios = match serde_json::from_str::<ScenarioFile>(contents)? {
        ScenarioFile::Set { scenarios } => scenarios,
        ScenarioFile::Single(scenario) => vec![scenario],
    };
    if scenarios.is_empty() {
        return Err(PlanningError::config("scenarios file lists no scenarios"));
    }

    let mut names = std::collections::HashSet::new();
    for scenario in &scenarios {
        if !names.insert(scenario.name.as_str()) {
            return Err(PlanningError::config(format!("duplicate scenario name '{}'", scenario.name)));
        }
        scenario
            .validate()
            .map_err(|e| PlanningError::config(format!("scenario '{}': {}", scenario.name, e)))?;
    }
    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::scenario_config::PrioritizationRule;
    use std::io::Write;

    #[test]
    fn reads_scenario_list() {
        let text = r#"{
            "scenarios": [
                {"name": "low", "annual_grid_capacity_limit_mw": 5.0},
                {"name": "high", "prioritization": {"rule": "population"}}
            ]
        }"#;
        let scenarios = parse_scenarios(text).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].annual_grid_capacity_limit_mw, 5.0);
        assert_eq!(scenarios[1].prioritization, PrioritizationRule::Population);
    }

    #[test]
    fn reads_single_scenario() {
        let scenarios = parse_scenarios(r#"{"name": "only", "max_grid_extension_km": 25.0}"#).unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].name, "only");
        assert_eq!(scenarios[0].max_grid_extension_km, 25.0);
    }

    #[test]
    fn duplicate_names_rejected() {
        let text = r#"{"scenarios": [{"name": "a"}, {"name": "a"}]}"#;
        assert!(matches!(parse_scenarios(text), Err(PlanningError::Configuration(_))));
    }

    #[test]
    fn invalid_scenario_rejected() {
        let text = r#"{"scenarios": [{"name": "a", "annual_grid_connections_limit": -1.0}]}"#;
        assert!(matches!(parse_scenarios(text), Err(PlanningError::Configuration(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"scenarios": [{{"name": "file"}}]}}"#).unwrap();
        let scenarios = load_scenarios(file.path()).unwrap();
        assert_eq!(scenarios[0].name, "file");
    }
}
