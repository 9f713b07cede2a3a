//! Domain error types

use thiserror::Error;

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    ReadError(String),

    #[error("Failed to parse settings file: {0}")]
    ParseError(String),

    #[error("Failed to write settings file: {0}")]
    WriteError(String),

    #[error("Invalid setting '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Settings file already exists at: {0}")]
    AlreadyExists(String),
}
