//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::compare::ComparatorConfig;
use crate::fetch::{DataSource, DirDataSource, FetchError, HttpDataSource, HttpSourceConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Failed to build data source: {0}")]
    SourceError(#[from] FetchError),
}

/// Where entity data comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Results API over HTTP
    Http,
    /// JSON files on disk
    #[default]
    Dir,
}

/// Data source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    /// Base URL of the results API (http only)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Root of `drivers/` and `teams/` JSON files (dir only)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Per-entity fetch timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Response cache directory (http only, unset disables caching)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_user_agent() -> String {
    format!("race-analytics/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            base_url: None,
            data_dir: Some(PathBuf::from("./data")),
            timeout_seconds: default_timeout(),
            cache_dir: None,
            cache_ttl_seconds: default_cache_ttl(),
            user_agent: default_user_agent(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Set the fetch timeout. Only whole, non-zero seconds are accepted.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), ConfigError> {
        if timeout.is_zero() || timeout.subsec_nanos() != 0 {
            return Err(ConfigError::ValidationError(format!(
                "timeout must be a whole number of seconds, got {:?}",
                timeout
            )));
        }
        self.timeout_seconds = timeout.as_secs();
        Ok(())
    }

    /// Build the configured data source.
    pub fn build(&self) -> Result<Arc<dyn DataSource>, ConfigError> {
        match self.kind {
            SourceKind::Http => {
                let base_url = self.parsed_base_url()?;
                let mut config = HttpSourceConfig::new(base_url);
                config.cache_dir = self.cache_dir.clone();
                config.cache_ttl = Duration::from_secs(self.cache_ttl_seconds);
                config.timeout = self.timeout();
                config.user_agent = self.user_agent.clone();
                Ok(Arc::new(HttpDataSource::new(config)?))
            }
            SourceKind::Dir => {
                let data_dir = self.data_dir.clone().ok_or_else(|| {
                    ConfigError::ValidationError("dir source requires data_dir".to_string())
                })?;
                Ok(Arc::new(DirDataSource::new(data_dir)))
            }
        }
    }

    fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        let raw = self.base_url.as_deref().ok_or_else(|| {
            ConfigError::ValidationError("http source requires base_url".to_string())
        })?;
        Url::parse(raw)
            .map_err(|e| ConfigError::ValidationError(format!("invalid base_url {}: {}", raw, e)))
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub source: SourceConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            source: SourceConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Source timeout must be greater than 0".to_string(),
            ));
        }

        match self.source.kind {
            SourceKind::Http => {
                self.source.parsed_base_url()?;
            }
            SourceKind::Dir => {
                if self.source.data_dir.is_none() {
                    return Err(ConfigError::ValidationError(
                        "dir source requires data_dir".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Orchestrator settings derived from the source section.
    pub fn comparator(&self) -> ComparatorConfig {
        ComparatorConfig {
            fetch_timeout: self.source.timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.source.kind, SourceKind::Dir);
        assert_eq!(config.source.data_dir, Some(PathBuf::from("./data")));
        assert_eq!(config.source.timeout_seconds, 30);
        assert_eq!(config.comparator().fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.source.timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_set_timeout() {
        let mut source = SourceConfig::default();

        source.set_timeout(Duration::from_secs(90)).unwrap();
        assert_eq!(source.timeout_seconds, 90);

        assert!(source.set_timeout(Duration::from_millis(250)).is_err());
        assert!(source.set_timeout(Duration::from_millis(1500)).is_err());
        assert!(source.set_timeout(Duration::ZERO).is_err());
        assert_eq!(source.timeout_seconds, 90);
    }

    #[test]
    fn test_http_requires_base_url() {
        let mut config = AppConfig::default();
        config.source.kind = SourceKind::Http;
        assert!(config.validate().is_err());

        config.source.base_url = Some("not a url".to_string());
        assert!(config.validate().is_err());

        config.source.base_url = Some("https://results.example.com/api".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dir_requires_data_dir() {
        let mut config = AppConfig::default();
        config.source.data_dir = None;

        assert!(config.validate().is_err());
        assert!(config.source.build().is_err());
    }

    #[test]
    fn test_parse_http_source() {
        let config: AppConfig = toml::from_str(
            r#"
            log_level = "debug"

            [source]
            kind = "http"
            base_url = "https://results.example.com/api"
            timeout_seconds = 10
            cache_dir = "/tmp/race-cache"
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.source.kind, SourceKind::Http);
        assert_eq!(config.source.cache_ttl_seconds, 3600);

        let source = config.source.build().unwrap();
        assert_eq!(source.name(), "http");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[source]\nkind = \"dir\"\ndata_dir = \"fixtures\"\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.source.data_dir, Some(PathBuf::from("fixtures")));
        assert_eq!(config.source.build().unwrap().name(), "dir");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        // Should be parseable
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.source.data_dir, parsed.source.data_dir);
    }
}
