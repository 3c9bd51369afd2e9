//! Error types for CLI operations.

use contracts::ContractError;
use sync_engine::EngineError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Captor could not be built from its config entry
    #[error("Failed to build captor: {0}")]
    Captor(#[from] ContractError),

    /// Synchronizer assembly or capture misuse
    #[error("Synchronizer error: {0}")]
    Engine(#[from] EngineError),

    /// Invalid run option
    #[error("Invalid option '{option}': {message}")]
    InvalidOption { option: String, message: String },

    /// Background task failed
    #[error("Pipeline task failed: {message}")]
    Task { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_option(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            message: message.into(),
        }
    }

    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }
}
