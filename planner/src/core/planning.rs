use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::summary::{summarize, ScenarioSummary};
use crate::config::scenario_config::ScenarioConfig;
use crate::core::iteration::{run_step, StepReport};
use crate::core::projection::GrowthRates;
use crate::models::settlement_table::SettlementTable;
use crate::utils::error::Result;
use crate::utils::logging::{self, OperationCategory};

/// Runtime switches that do not change results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunOptions {
    /// Cost settlements and candidates on the rayon pool.
    pub parallel: bool,
}

/// A fully planned scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    pub table: SettlementTable,
    pub steps: Vec<StepReport>,
    pub summary: ScenarioSummary,
}

/// Plan every step of `config` over `table`, appending one year of history per step.
pub fn run_scenario(mut table: SettlementTable, config: &ScenarioConfig, options: &RunOptions) -> Result<ScenarioResult> {
    let _timing = logging::start_timing("run_scenario", OperationCategory::Planning);
    config.validate()?;

    info!(
        "Planning scenario '{}' for {} settlements, {} to {}",
        config.name,
        table.len(),
        config.start_year,
        config.end_year
    );

    let growth = GrowthRates::for_scenario(config, &table);
    let mut steps = Vec::with_capacity(config.steps.len());
    for window in config.step_windows() {
        let step = run_step(&table, config, &window, &growth, options.parallel)?;
        table.commit_year(window.year, step.states)?;
        steps.push(step.report);
    }

    let summary = summarize(&table);
    info!("Scenario '{}' planned over {} steps", config.name, steps.len());

    Ok(ScenarioResult {
        name: config.name.clone(),
        table,
        steps,
        summary,
    })
}
