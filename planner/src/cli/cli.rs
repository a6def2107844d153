use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Least-cost electrification planning over a settlements table", long_about = None)]
pub struct Args {
    #[arg(short, long, help = "Settlements CSV file")]
    settlements: String,

    #[arg(short = 'c', long, help = "Scenarios JSON file; the default scenario is used when omitted")]
    scenarios: Option<String>,

    #[arg(short, long, default_value = "results")]
    output_dir: String,

    #[arg(short, long, default_value_t = false, help = "Cost settlements on all cores")]
    parallel: bool,

    #[arg(long, default_value_t = false, help = "Plan scenarios concurrently")]
    parallel_scenarios: bool,

    #[arg(long, default_value_t = false)]
    no_export: bool,

    #[arg(long, default_value_t = false)]
    quiet: bool,

    #[arg(long, default_value_t = false)]
    enable_timing: bool,

    #[arg(long, default_value_t = false)]
    debug_logging: bool,
}

impl Args {
    pub fn settlements(&self) -> &str {
        &self.settlements
    }

    pub fn scenarios(&self) -> Option<&str> {
        self.scenarios.as_deref()
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    pub fn parallel_scenarios(&self) -> bool {
        self.parallel_scenarios
    }

    pub fn no_export(&self) -> bool {
        self.no_export
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    pub fn enable_timing(&self) -> bool {
        self.enable_timing
    }

    pub fn debug_logging(&self) -> bool {
        self.debug_logging
    }
}
