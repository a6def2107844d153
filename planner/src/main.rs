use anyhow::{bail, Context, Result};
use clap::Parser;

use elecplan::analysis::reporting::print_scenario_summary;
use elecplan::cli::cli::Args;
use elecplan::config::scenario_config::ScenarioConfig;
use elecplan::core::multi_scenario::{run_multi_scenario, MultiScenarioOptions};
use elecplan::core::planning::RunOptions;
use elecplan::data::scenario_loader::load_scenarios;
use elecplan::data::settlements_loader::load_settlements;
use elecplan::utils::csv_export::CsvExporter;
use elecplan::utils::logging;

fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_logging(args.enable_timing(), args.debug_logging())
        .context("failed to initialise logging")?;

    println!("Electrification Planner");
    println!(
        "Parallel costing: {}, parallel scenarios: {}, timing: {}",
        if args.parallel() { "enabled" } else { "disabled" },
        if args.parallel_scenarios() { "enabled" } else { "disabled" },
        if args.enable_timing() { "enabled" } else { "disabled" }
    );

    let table = load_settlements(args.settlements())
        .with_context(|| format!("failed to load settlements from {}", args.settlements()))?;
    let scenarios = match args.scenarios() {
        Some(path) => load_scenarios(path).with_context(|| format!("failed to load scenarios from {}", path))?,
        None => vec![ScenarioConfig::default()],
    };

    let exporter = if args.no_export() {
        None
    } else {
        Some(
            CsvExporter::new(args.output_dir())
                .with_context(|| format!("failed to create output directory under {}", args.output_dir()))?,
        )
    };

    let options = MultiScenarioOptions {
        parallel_scenarios: args.parallel_scenarios(),
        run: RunOptions { parallel: args.parallel() },
        show_progress: !args.quiet(),
    };
    let outcomes = run_multi_scenario(&table, &scenarios, &options, exporter.as_ref());

    let mut failed = Vec::new();
    for outcome in &outcomes {
        match &outcome.result {
            Ok(result) => {
                if !args.quiet() {
                    print_scenario_summary(result);
                }
                if let Some((results, summary)) = &outcome.outputs {
                    println!("Results: {}\nSummary: {}", results.display(), summary.display());
                }
            }
            Err(e) => {
                eprintln!("Scenario '{}' failed: {}", outcome.name, e);
                failed.push(outcome.name.as_str());
            }
        }
    }

    if logging::is_timing_enabled() {
        logging::print_timing_report();
    }

    if !failed.is_empty() {
        bail!("{} of {} scenarios failed: {}", failed.len(), outcomes.len(), failed.join(", "));
    }
    Ok(())
}
