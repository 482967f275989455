//! Error types for the deeptab model-definition crate

use thiserror::Error;

/// Result type alias for deeptab operations
pub type Result<T> = std::result::Result<T, DeeptabError>;

/// Main error type for the deeptab crate
#[derive(Error, Debug)]
pub enum DeeptabError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),
}

impl From<polars::error::PolarsError> for DeeptabError {
    fn from(err: polars::error::PolarsError) -> Self {
        DeeptabError::DataError(err.to_string())
    }
}
