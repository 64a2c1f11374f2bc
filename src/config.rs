use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::storage::{SqlProvider, StorageType};

/// Shortest heartbeat interval accepted by validation.
pub const MIN_HEARTBEAT_INTERVAL_MS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("unsupported config extension: {0}")]
    UnsupportedFormat(String),

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ServiceConfig {
    pub leadership: LeadershipConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub health: HealthConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LeadershipConfig {
    pub heartbeat_interval_ms: u64,
}

impl Default for LeadershipConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 60_000,
        }
    }
}

impl LeadershipConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    pub provider: Option<SqlProvider>,
    pub config: StorageOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StorageOptions {
    /// Database file for sqlite.
    pub path: Option<String>,
    /// Replicate the membership table across `regions`.
    pub global: bool,
    pub region: Option<String>,
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub console_output: bool,
    /// Empty disables file output.
    pub file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthConfig {
    /// Ping the store as part of every health check.
    pub check_storage: bool,
    /// HTTP endpoints that must answer below 400 for the node to be healthy.
    pub dependencies: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_storage: true,
            dependencies: Vec::new(),
            timeout_ms: 5_000,
        }
    }
}

impl HealthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// HTTP endpoint serving `/health` and `/metrics` while `start` runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. `127.0.0.1:9464`. Unset disables the endpoint.
    pub listen: Option<String>,
}

impl ServiceConfig {
    /// Loads `path` (or the defaults), applies environment overrides and
    /// validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => load_config_from_path(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override configuration from `ROLLCALL_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(interval) = lookup("ROLLCALL_HEARTBEAT_INTERVAL") {
            match interval.parse() {
                Ok(ms) => self.leadership.heartbeat_interval_ms = ms,
                Err(_) => warn!("ignoring ROLLCALL_HEARTBEAT_INTERVAL={}", interval),
            }
        }

        if let Some(storage_type) = lookup("ROLLCALL_STORAGE_TYPE") {
            match storage_type.parse() {
                Ok(storage_type) => self.storage.storage_type = storage_type,
                Err(e) => warn!("ignoring ROLLCALL_STORAGE_TYPE: {}", e),
            }
        }

        if let Some(provider) = lookup("ROLLCALL_STORAGE_PROVIDER") {
            match provider.parse() {
                Ok(provider) => self.storage.provider = Some(provider),
                Err(e) => warn!("ignoring ROLLCALL_STORAGE_PROVIDER: {}", e),
            }
        }

        if let Some(path) = lookup("ROLLCALL_STORAGE_PATH") {
            self.storage.config.path = Some(path);
        }

        if let Some(check) = lookup("ROLLCALL_HEALTH_CHECK_STORAGE") {
            match check.parse() {
                Ok(check) => self.health.check_storage = check,
                Err(_) => warn!("ignoring ROLLCALL_HEALTH_CHECK_STORAGE={}", check),
            }
        }

        if let Some(dependencies) = lookup("ROLLCALL_HEALTH_DEPENDENCIES") {
            self.health.dependencies = dependencies
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(listen) = lookup("ROLLCALL_SERVER_LISTEN") {
            self.server.listen = Some(listen).filter(|listen| !listen.is_empty());
        }

        if let Some(level) = lookup("ROLLCALL_LOG_LEVEL") {
            self.logging.level = match level.to_lowercase().as_str() {
                "debug" => "debug".to_string(),
                "info" => "info".to_string(),
                "warn" => "warn".to_string(),
                "error" => "error".to_string(),
                _ => self.logging.level.clone(),
            };
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.leadership.heartbeat_interval_ms < MIN_HEARTBEAT_INTERVAL_MS {
            errors.push(format!(
                "Heartbeat interval must be at least {}ms",
                MIN_HEARTBEAT_INTERVAL_MS
            ));
        }

        if self.storage.storage_type == StorageType::Sql {
            match self.storage.provider {
                None => errors.push("SQL storage requires a provider".to_string()),
                Some(SqlProvider::Sqlite) if self.storage.config.path.is_none() => {
                    errors.push("SQLite storage requires a path".to_string())
                }
                Some(_) => {}
            }
        }

        let options = &self.storage.config;
        if options.global {
            if options.region.is_none() {
                errors.push("Global storage requires a region".to_string());
            }
            if options.regions.is_empty() {
                errors.push("Global storage requires at least one region in regions".to_string());
            }
        }

        for url in &self.health.dependencies {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(format!("Health dependency must be an http(s) URL: {}", url));
            }
        }

        if self.health.timeout_ms == 0 {
            errors.push("Health check timeout must be greater than 0".to_string());
        }

        if matches!(&self.server.listen, Some(listen) if listen.trim().is_empty()) {
            errors.push("Server listen address cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

/// Load configuration from file path by extension (toml/yaml/json)
pub fn load_config_from_path(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "toml" => toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string())),
        "yaml" | "yml" => {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        "json" => serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string())),
        _ => Err(ConfigError::UnsupportedFormat(ext)),
    }
}
