//! CLI Error types and handling

use std::fmt;

use rollcall::config::ConfigError;
use rollcall::leadership::ElectionError;
use rollcall::logging::LoggingError;
use rollcall::storage::StorageError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub enum CliError {
    NoCommand,
    UnknownCommand(String),
    ConfigurationError(String),
    StorageError(String),
    ElectionError(String),
    ParseError { field: String, message: String },
    IoError(String),
    Unhealthy(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NoCommand => {
                write!(f, "No command provided. Use --help to see available commands")
            }
            CliError::UnknownCommand(cmd) => {
                write!(f, "Unknown command '{}'. Use --help to see available commands", cmd)
            }
            CliError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            CliError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            CliError::ElectionError(msg) => write!(f, "Election error: {}", msg),
            CliError::ParseError { field, message } => {
                write!(f, "Parse error ({}): {}", field, message)
            }
            CliError::IoError(msg) => write!(f, "IO error: {}", msg),
            CliError::Unhealthy(msg) => write!(f, "Unhealthy: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::IoError(err.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::ConfigurationError(err.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(err: LoggingError) -> Self {
        CliError::ConfigurationError(err.to_string())
    }
}

impl From<StorageError> for CliError {
    fn from(err: StorageError) -> Self {
        CliError::StorageError(err.to_string())
    }
}

impl From<ElectionError> for CliError {
    fn from(err: ElectionError) -> Self {
        CliError::ElectionError(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::IoError(err.to_string())
    }
}
