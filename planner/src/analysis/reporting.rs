use crate::analysis::summary::YearSummary;
use crate::config::tech_type::TechCode;
use crate::core::iteration::StepReport;
use crate::core::planning::ScenarioResult;

pub fn print_step_summary(report: &StepReport, summary: &YearSummary) {
    println!("\nYear {} Summary (step of {} years)", report.year, report.time_step);
    println!("----------------------------------------");
    println!("Population: {:.0}", summary.total_population);
    println!(
        "Electrified: {:.1}% (target {:.1}%)",
        summary.electrified_fraction() * 100.0,
        report.electrification_target * 100.0
    );
    println!("Grid Extension:");
    println!("  Pre-electrified settlements: {}", report.pre_electrified);
    println!("  Admitted settlements: {} in {} iterations", report.admitted, report.extension_iterations);
    println!("  Stopped on: {:?}", report.stop);
    if report.budget.capacity_kw.is_finite() {
        println!(
            "  Capacity budget: {:.1} of {:.1} MW left",
            report.remaining.capacity_kw / 1000.0,
            report.budget.capacity_kw / 1000.0
        );
    } else {
        println!("  Capacity budget: unlimited");
    }
    if report.budget.connections.is_finite() {
        println!(
            "  Connection budget: {:.0} of {:.0} people left",
            report.remaining.connections, report.budget.connections
        );
    } else {
        println!("  Connection budget: unlimited");
    }
    if report.demoted > 0 {
        println!("  Demoted to meet target: {}", report.demoted);
    }
    println!("Technologies:");
    for tech in TechCode::ELECTRIFYING {
        if summary.population[tech] <= 0.0 {
            continue;
        }
        println!(
            "  {}: population={:.0}, new connections={:.0}, capacity={:.1} kW, investment={:.0}",
            tech,
            summary.population[tech],
            summary.new_connections[tech],
            summary.capacity_kw[tech],
            summary.investment[tech]
        );
    }
    println!("Total Investment: {:.0}", summary.total_investment());
}

pub fn print_scenario_summary(result: &ScenarioResult) {
    println!("\nScenario '{}'", result.name);
    println!("========================================");
    for report in &result.steps {
        if let Some(summary) = result.summary.year(report.year) {
            print_step_summary(report, summary);
        }
    }
    let total: f64 = result.summary.years.iter().map(YearSummary::total_investment).sum();
    println!("----------------------------------------");
    println!("Scenario Investment: {:.0}", total);
}
