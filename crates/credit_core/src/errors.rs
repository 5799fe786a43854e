//! Error types for the credit scoring core

use thiserror::Error;

/// Errors that can occur while training, scoring or persisting a credit model
#[derive(Error, Debug)]
pub enum CreditError {
    /// Prediction or export requested before any model was trained or loaded
    #[error("Model not trained: call train() or load() first")]
    NotTrained,

    /// Degenerate or malformed input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model artifact is corrupt, truncated or from an unsupported format
    #[error("Invalid model artifact: {0}")]
    Artifact(String),

    /// Configuration could not be parsed or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<bincode::Error> for CreditError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for CreditError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for credit scoring operations
pub type Result<T> = std::result::Result<T, CreditError>;
