//! Error types for the tabprep preprocessing engine

use thiserror::Error;

/// Result type alias for tabprep operations
pub type Result<T> = std::result::Result<T, PrepError>;

/// Main error type for the preprocessing engine
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl PrepError {
    /// Shorthand for a malformed value attached to a step declaration.
    pub(crate) fn invalid_step(key: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        PrepError::InvalidParameter {
            name: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error stems from the feature configuration rather than the data.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PrepError::ConfigError(_) | PrepError::InvalidParameter { .. }
        )
    }
}

impl From<polars::error::PolarsError> for PrepError {
    fn from(err: polars::error::PolarsError) -> Self {
        PrepError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        PrepError::SerializationError(err.to_string())
    }
}
