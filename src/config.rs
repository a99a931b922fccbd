//! Configuration module
//!
//! Loaded from a TOML file. Every section and field has a default, so an
//! empty or partial file is valid.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::usage::default_cost_per_call;
use crate::application::{PageLimits, RateBudgetConfig};
use crate::infrastructure::DatabaseConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "LINKDB_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `[server]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `[logging]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `linkdb=debug,tower_http=info`
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// `[usage]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Decimal string, e.g. `"0.001"`
    pub cost_per_call: String,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            cost_per_call: default_cost_per_call().to_string(),
        }
    }
}

impl UsageConfig {
    pub fn rate(&self) -> Result<Decimal, ConfigError> {
        let rate = Decimal::from_str(self.cost_per_call.trim()).map_err(|e| {
            ConfigError::Invalid(format!(
                "usage.cost_per_call {:?}: {}",
                self.cost_per_call, e
            ))
        })?;
        if rate.is_sign_negative() {
            return Err(ConfigError::Invalid(
                "usage.cost_per_call must not be negative".to_string(),
            ));
        }
        Ok(rate)
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub rate_limit: RateBudgetConfig,
    pub query: PageLimits,
    pub usage: UsageConfig,
}

impl AppConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`AppConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.usage.rate()?;
        if self.query.max_limit == 0 {
            return Err(ConfigError::Invalid(
                "query.max_limit must be at least 1".to_string(),
            ));
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url is empty".to_string()));
        }
        if !matches!(
            self.logging.format.to_ascii_lowercase().as_str(),
            "pretty" | "json"
        ) {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be `pretty` or `json`, got {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// `$LINKDB_CONFIG`, else `<config dir>/linkdb/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("linkdb")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("linkdb-config-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn empty_file_yields_defaults() {
        let path = write_temp("");
        let config = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.query.default_limit, 50);
        assert_eq!(config.usage.rate().unwrap(), Decimal::new(1, 3));
        assert_eq!(config.rate_limit.requests_per_window, 120);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let path = write_temp(
            r#"
            [server]
            port = 9100

            [database]
            url = "postgres://linkdb@localhost/linkdb"
            statement_timeout_ms = 250

            [rate_limit]
            requests_per_window = 10

            [usage]
            cost_per_call = "0.25"
            "#,
        );
        let config = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.statement_timeout_ms, 250);
        assert_eq!(config.database.pool.max_connections, 16);
        assert_eq!(config.rate_limit.requests_per_window, 10);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.usage.rate().unwrap(), Decimal::new(25, 2));
    }

    #[test]
    fn rejects_bad_values() {
        let path = write_temp("[usage]\ncost_per_call = \"cheap\"\n");
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Invalid(_))));
        std::fs::remove_file(&path).ok();

        let path = write_temp("[logging]\nformat = \"xml\"\n");
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Invalid(_))));
        std::fs::remove_file(&path).ok();

        let path = write_temp("[server\nport = 1");
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse { .. })));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_falls_back_only_when_asked() {
        let path = std::env::temp_dir().join("linkdb-config-does-not-exist.toml");
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Read { .. })));
        assert_eq!(AppConfig::load_or_default(&path).unwrap().server.port, 8080);
    }

    #[test]
    fn defaults_survive_a_toml_round_trip() {
        let rendered = AppConfig::default().to_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.usage.cost_per_call, "0.001");
    }
}
