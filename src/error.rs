//! Error types for Cogtrain

use thiserror::Error;

/// Errors that can occur while configuring or driving a training session
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Invalid sequence parameters: {0}")]
    InvalidSequenceParams(String),

    #[error("Invalid difficulty level: {0}")]
    InvalidLevel(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors reported by external profile / session-log collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected: {0}")]
    Rejected(String),
}
