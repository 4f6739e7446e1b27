//! Error types for the Bee Atlas pipeline

use thiserror::Error;

/// Result type alias for atlas operations
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Main error type for the Bee Atlas pipeline
#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Declared column '{column}' missing from table")]
    MissingColumn { column: String },

    #[error("Column '{column}': cannot parse '{value}' as {expected}")]
    InvalidValue {
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AtlasError {
    /// Shorthand for a network error with a formatted message.
    pub fn network(msg: impl Into<String>) -> Self {
        AtlasError::Network(msg.into())
    }

    /// Shorthand for an export error with a formatted message.
    pub fn export(msg: impl Into<String>) -> Self {
        AtlasError::Export(msg.into())
    }
}
