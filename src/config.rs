//! Configuration module for newswire.

use serde::Deserialize;
use std::path::Path;

use crate::{NewswireError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer token required by the on-demand refresh endpoint.
    ///
    /// When unset the refresh endpoint is disabled (403 for every caller).
    #[serde(default)]
    pub operator_token: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            operator_token: None,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/newswire.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/newswire.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Ingestion configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Fetch cycle period in seconds.
    #[serde(default = "default_cycle_interval")]
    pub interval_secs: u64,
    /// Total per-fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed document size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Retention horizon in days; items fetched earlier are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// Retention sweep period in seconds.
    #[serde(default = "default_retention_interval")]
    pub retention_sweep_interval_secs: u64,
}

fn default_cycle_interval() -> u64 {
    600 // 10 minutes
}

fn default_fetch_timeout() -> u64 {
    15
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_retention_days() -> i64 {
    30
}

fn default_retention_interval() -> u64 {
    3600 // 1 hour
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cycle_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            retention_days: default_retention_days(),
            retention_sweep_interval_secs: default_retention_interval(),
        }
    }
}

/// One configured feed source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Stable, operator-assigned source identifier. Doubles as the
    /// broadcast channel name.
    pub name: String,
    /// Feed URL.
    pub url: String,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Ingestion configuration.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Configured feed sources.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(NewswireError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| NewswireError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `NEWSWIRE_OPERATOR_TOKEN`: Override the refresh endpoint token
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("NEWSWIRE_OPERATOR_TOKEN") {
            if !token.is_empty() {
                self.server.operator_token = Some(token);
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - A source has an empty name or an invalid URL
    /// - Two sources share a name
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(NewswireError::Config(format!(
                    "source with url {} has an empty name",
                    source.url
                )));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(NewswireError::Config(format!(
                    "duplicate source name: {}",
                    source.name
                )));
            }
            crate::feed::fetcher::validate_url(&source.url).map_err(|e| {
                NewswireError::Config(format!("source {}: {e}", source.name))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.ingest.interval_secs, 600);
        assert_eq!(config.ingest.fetch_timeout_secs, 15);
        assert!(config.sources.is_empty());
        assert!(config.server.operator_token.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000
operator_token = "secret"

[database]
path = "data/test.db"

[logging]
level = "debug"

[ingest]
interval_secs = 300
fetch_timeout_secs = 10
retention_days = 7

[[sources]]
name = "marketwatch-top"
url = "https://example.com/marketwatch.xml"

[[sources]]
name = "wires"
url = "https://example.com/wires.xml"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.operator_token.as_deref(), Some("secret"));
        assert_eq!(config.database.path, "data/test.db");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.ingest.interval_secs, 300);
        assert_eq!(config.ingest.retention_days, 7);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].name, "marketwatch-top");
    }

    #[test]
    fn test_parse_partial_config_uses_defaults() {
        let toml = r#"
[[sources]]
name = "wires"
url = "https://example.com/wires.xml"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.ingest.fetch_timeout_secs, 15);
        assert_eq!(config.sources.len(), 1);
    }

    #[test]
    fn test_parse_invalid_config() {
        assert!(Config::parse("this is not toml [").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_ok() {
        let toml = r#"
[[sources]]
name = "wires"
url = "https://example.com/wires.xml"
"#;
        let config = Config::parse(toml).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_duplicate_source_name() {
        let toml = r#"
[[sources]]
name = "wires"
url = "https://example.com/a.xml"

[[sources]]
name = "wires"
url = "https://example.com/b.xml"
"#;
        let config = Config::parse(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate source name"));
    }

    #[test]
    fn test_validate_empty_source_name() {
        let toml = r#"
[[sources]]
name = "  "
url = "https://example.com/a.xml"
"#;
        let config = Config::parse(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_source_url() {
        let toml = r#"
[[sources]]
name = "wires"
url = "ftp://example.com/a.xml"
"#;
        let config = Config::parse(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override_operator_token() {
        let mut config = Config::default();
        std::env::set_var("NEWSWIRE_OPERATOR_TOKEN", "from-env");
        config.apply_env_overrides();
        std::env::remove_var("NEWSWIRE_OPERATOR_TOKEN");
        assert_eq!(config.server.operator_token.as_deref(), Some("from-env"));
    }
}
