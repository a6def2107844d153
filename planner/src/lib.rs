// Main module declarations for the electrification planner

// Planning pipeline
pub mod core {
    pub mod projection;
    pub mod costing;
    pub mod grid_extension;
    pub mod selection;
    pub mod iteration;
    pub mod planning;
    pub mod multi_scenario;
}

// Configuration modules
pub mod config {
    pub mod constants;
    pub mod const_funcs;
    pub mod scenario_config;
    pub mod tech_type;
}

// Model definitions
pub mod models {
    pub mod settlement;
    pub mod settlement_table;
    pub mod technology;
    pub mod cost_model;
}

// Data loaders
pub mod data {
    pub mod settlements_loader;
    pub mod scenario_loader;
    pub mod poi;
}

// Summaries and console reports
pub mod analysis {
    pub mod summary;
    pub mod reporting;
}

// Utility functions
pub mod utils {
    pub mod error;
    pub mod spatial_index;
    pub mod logging;
    pub mod csv_export;
}

// CLI interface
pub mod cli {
    pub mod cli;
}

// Re-export commonly used items
pub use crate::config::scenario_config::ScenarioConfig;
pub use crate::config::tech_type::{TechCode, TechMap};
pub use crate::core::planning::{run_scenario, RunOptions, ScenarioResult};
pub use crate::models::settlement_table::SettlementTable;
pub use crate::utils::error::{PlanningError, Result};
