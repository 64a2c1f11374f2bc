//! Log backend setup.
//!
//! The crate logs through the `log` facade; binaries call [`init`] once to
//! route records to stdout and/or a file with `simplelog`.

use log::LevelFilter;
use simplelog::{CombinedLogger, Config, SharedLogger, SimpleLogger, WriteLogger};
use std::fs::OpenOptions;
use std::path::Path;
use thiserror::Error;

use crate::config::LoggingConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },

    #[error("a logger is already installed")]
    AlreadyInitialized(#[from] log::SetLoggerError),
}

/// Maps a configured level name to a filter. Unknown names fall back to info.
pub fn level_filter(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let level = level_filter(&config.level);
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    if config.console_output {
        loggers.push(SimpleLogger::new(level, Config::default()));
    }

    if !config.file_path.is_empty() {
        let path = Path::new(&config.file_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| LoggingError::File {
                    path: config.file_path.clone(),
                    source,
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LoggingError::File {
                path: config.file_path.clone(),
                source,
            })?;
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }

    CombinedLogger::init(loggers)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter("debug"), LevelFilter::Debug);
        assert_eq!(level_filter("WARN"), LevelFilter::Warn);
        assert_eq!(level_filter("error"), LevelFilter::Error);
        assert_eq!(level_filter("chatty"), LevelFilter::Info);
    }

    #[test]
    fn test_unwritable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: "info".to_string(),
            console_output: false,
            // A directory can't be opened for appending.
            file_path: dir.path().to_string_lossy().into_owned(),
        };
        assert!(matches!(init(&config), Err(LoggingError::File { .. })));
    }
}
