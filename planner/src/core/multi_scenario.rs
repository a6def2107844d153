use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

use crate::config::scenario_config::ScenarioConfig;
use crate::core::planning::{run_scenario, RunOptions, ScenarioResult};
use crate::models::settlement_table::SettlementTable;
use crate::utils::csv_export::CsvExporter;
use crate::utils::error::PlanningError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MultiScenarioOptions {
    /// Plan scenarios concurrently instead of one after another.
    pub parallel_scenarios: bool,
    pub run: RunOptions,
    pub show_progress: bool,
}

/// Outcome of one scenario in a batch; a failure does not stop the others.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub name: String,
    pub result: Result<ScenarioResult, PlanningError>,
    /// Results and summary files, when an exporter was given and the run succeeded.
    pub outputs: Option<(PathBuf, PathBuf)>,
}

impl ScenarioOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} scenarios {msg}") {
        bar.set_style(style);
    }
    bar
}

fn plan_one(
    table: &SettlementTable,
    config: &ScenarioConfig,
    options: &MultiScenarioOptions,
    exporter: Option<&CsvExporter>,
    bar: &ProgressBar,
) -> ScenarioOutcome {
    let mut outputs = None;
    let result = run_scenario(table.clone(), config, &options.run).and_then(|result| {
        outputs = exporter.map(|exporter| exporter.export_scenario(&result)).transpose()?;
        Ok(result)
    });
    if let Err(e) = &result {
        error!("Scenario '{}' failed: {}", config.name, e);
    }
    bar.inc(1);
    bar.set_message(config.name.clone());

    ScenarioOutcome {
        name: config.name.clone(),
        result,
        outputs,
    }
}

/// Plan every scenario over its own copy of `table`, in input order.
pub fn run_multi_scenario(
    table: &SettlementTable,
    scenarios: &[ScenarioConfig],
    options: &MultiScenarioOptions,
    exporter: Option<&CsvExporter>,
) -> Vec<ScenarioOutcome> {
    info!(
        "Planning {} scenarios ({})",
        scenarios.len(),
        if options.parallel_scenarios { "parallel" } else { "sequential" }
    );
    let bar = progress_bar(scenarios.len(), options.show_progress);

    let outcomes: Vec<ScenarioOutcome> = if options.parallel_scenarios {
        scenarios
            .par_iter()
            .map(|config| plan_one(table, config, options, exporter, &bar))
            .collect()
    } else {
        scenarios
            .iter()
            .map(|config| plan_one(table, config, options, exporter, &bar))
            .collect()
    };

    let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
    bar.finish_with_message(format!("{} failed", failed));
    info!("Planned {} scenarios, {} failed", outcomes.len(), failed);
    outcomes
}
