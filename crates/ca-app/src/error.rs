//! Error types for the ca-app service layer.

use ca_adapter::AdapterError;
use ca_schema::ConfigError;

/// Application error shared by the session runner and the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unknown adapter '{name}' (available: {available})")]
    UnknownAdapter { name: String, available: String },

    #[error("Invalid session script: {what}")]
    Script { what: String },

    #[error("Step {index} at t={time} failed: {source}")]
    Step {
        index: usize,
        time: u64,
        source: AdapterError,
    },

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ca-app operations.
pub type AppResult<T> = Result<T, AppError>;
