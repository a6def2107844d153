//! Error types for planning runs.

use thiserror::Error;

/// Result type for planning operations.
pub type Result<T> = std::result::Result<T, PlanningError>;

/// Errors that abort a scenario run.
///
/// Infeasible technologies and exhausted budgets are not errors: the first is a
/// sentinel LCOE, the second a normal stop reason of the grid extension.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// Missing or invalid scenario parameter, raised before any year runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A settlement row that cannot be planned.
    #[error("invalid settlement at row {row}: {reason}")]
    InvalidSettlement { row: usize, reason: String },

    /// The grid extension kept admitting settlements past the iteration bound.
    #[error("grid extension for {year} did not converge after {iterations} iterations")]
    NonConvergence { year: u32, iterations: u32 },

    /// Internal state broke one of the planning invariants.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlanningError {
    pub fn config(message: impl Into<String>) -> Self {
        PlanningError::Configuration(message.into())
    }
}
