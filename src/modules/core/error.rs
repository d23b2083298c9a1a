//! Error types for layerconf

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for configuration composition
#[derive(Error, Debug)]
pub enum ConfigError {
    /// General configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required configuration file is missing
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A configuration file could not be parsed
    #[error("Failed to parse '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A file was added whose extension has no registered format
    #[error("Unsupported file extension '{extension}' for '{}'", path.display())]
    UnsupportedExtension { extension: String, path: PathBuf },

    /// A provider selector of an unsupported type was supplied
    #[error("Invalid operation: {0}")]
    InvalidSelector(String),

    /// A required argument was missing or blank
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Command-line arguments could not be mapped to keys
    #[error("Command line error: {0}")]
    CommandLine(String),

    /// A configuration subtree could not be bound to a typed value
    #[error("Binding error: {0}")]
    Bind(String),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConfigError {
    /// Shorthand for a parse failure on a given file
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error was caused by the caller's input rather than
    /// by the environment
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ConfigError::InvalidSelector(_)
                | ConfigError::InvalidArgument(_)
                | ConfigError::CommandLine(_)
                | ConfigError::Bind(_)
        )
    }

    /// Process exit code used by the command-line tool
    pub fn exit_code(&self) -> i32 {
        match self {
            _ if self.is_user_error() => 2,
            ConfigError::FileNotFound(_) | ConfigError::Io(_) => 3,
            ConfigError::Parse { .. } | ConfigError::Json(_) => 4,
            _ => 1,
        }
    }
}

/// Result type alias using ConfigError
pub type Result<T> = std::result::Result<T, ConfigError>;
