//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building, loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file extension is not handled by any enabled format feature.
    #[error("Unsupported or disabled configuration file format: .{0}")]
    UnsupportedFormat(String),

    /// A configuration source could not be read or parsed.
    #[error("Failed to extract configuration: {0}")]
    Extract(#[from] figment::Error),

    /// A setter was used with a name that is not a recognized option.
    #[error("Unknown configuration option: {0}")]
    UnknownOption(String),

    /// A resolved value has the wrong type for its option.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },

    /// Missing required field.
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// The configured `log_file` cannot be opened.
    #[error("Cannot open log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: tracing_appender::rolling::InitError,
    },
}

impl ConfigError {
    /// Creates a validation error with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
