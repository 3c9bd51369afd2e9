//! Sync engine error types
//!
//! Capture outcomes (`State`) are not errors. These cover assembling a
//! synchronizer and calling it with the wrong outputs.

use contracts::Role;
use thiserror::Error;

/// Sync engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Captor placed in a slot its policy does not fit
    #[error("stream '{stream}' has a {actual} policy but is used as {expected}")]
    RoleMismatch {
        stream: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Same captor registered twice
    #[error("stream '{stream}' is registered more than once")]
    DuplicateCaptor { stream: String },

    /// Captor already owned by another live synchronizer
    #[error("stream '{stream}' already belongs to another synchronizer")]
    CaptorInUse { stream: String },

    /// Output slots do not line up with driver + followers
    #[error("expected {expected} outputs (driver + followers), got {actual}")]
    OutputMismatch { expected: usize, actual: usize },

    /// Invalid configuration (from contract)
    #[error("config error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl EngineError {
    pub fn role_mismatch(stream: impl Into<String>, expected: Role, actual: Role) -> Self {
        Self::RoleMismatch {
            stream: stream.into(),
            expected: expected.as_str(),
            actual: actual.as_str(),
        }
    }
}

/// Sync engine Result 类型别名
pub type Result<T> = std::result::Result<T, EngineError>;
