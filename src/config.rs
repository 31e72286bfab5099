//! Configuration
//!
//! Command-line arguments and the TOML file describing cleaning units.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// keysweep - reclaim expired keys from Redis-protocol stores
#[derive(Parser, Debug)]
#[command(name = "keysweep", author, version, about)]
#[command(long_about = "Scan keys by pattern and delete those whose TTL has run out.")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, env = "KEYSWEEP_CONFIG", default_value = "config/keysweep.toml")]
    pub config: PathBuf,

    /// Log level or filter directive, overrides the config file
    #[arg(long, env = "KEYSWEEP_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log format, overrides the config file
    #[arg(long, env = "KEYSWEEP_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Cleaning units, swept in order
    #[serde(rename = "cleaner", default)]
    pub units: Vec<UnitConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One store endpoint
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// `host:port`
    pub addr: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Logical database, selected when non-zero
    #[serde(default)]
    pub db: u32,
    /// Bound on connect and on every request round trip
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

impl EndpointConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            username: None,
            password: None,
            db: 0,
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_db(mut self, db: u32) -> Self {
        self.db = db;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("addr", &self.addr)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("db", &self.db)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// One cleaning unit: where to scan, where to delete, and how hard to push
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConfig {
    /// Label used in logs, defaults to `unit-<index>`
    #[serde(default)]
    pub name: Option<String>,

    /// Endpoint used for SCAN and TTL
    pub scanner: EndpointConfig,

    /// Endpoint used for DEL, falls back to the scanner
    #[serde(default)]
    pub deleter: Option<EndpointConfig>,

    /// Glob pattern of keys to inspect
    pub pattern: String,

    /// SCAN COUNT hint
    #[serde(default = "default_count")]
    pub count: u64,

    /// Pause between batches in milliseconds
    #[serde(default)]
    pub interval_ms: u64,

    /// Extra attempts at a failed scan step before the walk is abandoned
    #[serde(default = "default_scan_retries")]
    pub scan_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_count() -> u64 {
    1000
}

fn default_scan_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

impl UnitConfig {
    pub fn new(pattern: impl Into<String>, scanner: EndpointConfig) -> Self {
        Self {
            name: None,
            scanner,
            deleter: None,
            pattern: pattern.into(),
            count: default_count(),
            interval_ms: 0,
            scan_retries: default_scan_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_deleter(mut self, deleter: EndpointConfig) -> Self {
        self.deleter = Some(deleter);
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_scan_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.scan_retries = retries;
        self.retry_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("unit-{}", index))
    }

    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let name = self.display_name(index);
        if self.pattern.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{}: pattern cannot be empty",
                name
            )));
        }
        if self.count == 0 {
            return Err(ConfigError::Validation(format!(
                "{}: count must be positive",
                name
            )));
        }
        validate_endpoint(&name, "scanner", &self.scanner)?;
        if let Some(ref deleter) = self.deleter {
            validate_endpoint(&name, "deleter", deleter)?;
        }
        Ok(())
    }
}

fn validate_endpoint(unit: &str, role: &str, endpoint: &EndpointConfig) -> Result<(), ConfigError> {
    if endpoint.addr.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{}: {}.addr cannot be empty",
            unit, role
        )));
    }
    if endpoint.timeout_ms == 0 {
        return Err(ConfigError::Validation(format!(
            "{}: {}.timeout_ms must be positive",
            unit, role
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            source: e,
        })
    }

    /// Load the file named on the command line, apply overrides and validate
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(&args.config)?;
        config.apply_cli_overrides(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
        if let Some(format) = args.log_format {
            self.logging.format = format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.units.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [[cleaner]] unit is required".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation(
                "logging.level cannot be empty".to_string(),
            ));
        }
        for (index, unit) in self.units.iter().enumerate() {
            unit.validate(index)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [[cleaner]]
            pattern = "session:*"

            [cleaner.scanner]
            addr = "127.0.0.1:6379"
        "#;

        let config = Config::from_toml(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.units.len(), 1);

        let unit = &config.units[0];
        assert_eq!(unit.pattern, "session:*");
        assert_eq!(unit.count, 1000);
        assert_eq!(unit.interval(), Duration::ZERO);
        assert_eq!(unit.scan_retries, 3);
        assert!(unit.deleter.is_none());
        assert_eq!(unit.scanner.timeout(), Duration::from_secs(5));
        assert_eq!(unit.display_name(0), "unit-0");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [logging]
            level = "debug"
            format = "json"

            [[cleaner]]
            name = "sessions"
            pattern = "session:*"
            count = 500
            interval_ms = 250

            [cleaner.scanner]
            addr = "replica:6379"
            username = "sweeper"
            password = "hunter2"
            db = 2

            [cleaner.deleter]
            addr = "primary:6379"
            password = "hunter2"
            timeout_ms = 1000

            [[cleaner]]
            pattern = "cache:?"

            [cleaner.scanner]
            addr = "cache:6379"
        "#;

        let config = Config::from_toml(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.units.len(), 2);

        let sessions = &config.units[0];
        assert_eq!(sessions.display_name(0), "sessions");
        assert_eq!(sessions.count, 500);
        assert_eq!(sessions.interval(), Duration::from_millis(250));
        assert_eq!(sessions.scanner.db, 2);
        assert_eq!(sessions.scanner.username.as_deref(), Some("sweeper"));

        let deleter = sessions.deleter.as_ref().unwrap();
        assert_eq!(deleter.addr, "primary:6379");
        assert_eq!(deleter.timeout(), Duration::from_secs(1));

        assert_eq!(config.units[1].display_name(1), "unit-1");
    }

    #[test]
    fn test_validation_failures() {
        let empty = Config::from_toml("").unwrap();
        assert!(matches!(empty.validate(), Err(ConfigError::Validation(_))));

        let scanner = EndpointConfig::new("127.0.0.1:6379");
        let cases = [
            UnitConfig::new("", scanner.clone()),
            UnitConfig::new("k:*", scanner.clone()).with_count(0),
            UnitConfig::new("k:*", EndpointConfig::new(" ")),
            UnitConfig::new("k:*", scanner.clone()).with_deleter(EndpointConfig::new("")),
            UnitConfig::new("k:*", scanner.clone().with_timeout(Duration::ZERO)),
        ];
        for unit in cases {
            let config = Config {
                logging: LoggingConfig::default(),
                units: vec![unit],
            };
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
            [[cleaner]]
            pattern = "a*"
            match = "b*"

            [cleaner.scanner]
            addr = "127.0.0.1:6379"
        "#;
        assert!(matches!(
            Config::from_toml(toml),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [logging]
            level = "warn"

            [[cleaner]]
            pattern = "job:*"

            [cleaner.scanner]
            addr = "127.0.0.1:6379"
            "#
        )
        .unwrap();

        let args = CliArgs::parse_from([
            "keysweep",
            "--config",
            file.path().to_str().unwrap(),
            "--log-format",
            "json",
        ]);
        let config = Config::load(&args).unwrap();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.units[0].pattern, "job:*");
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/keysweep.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/keysweep.toml"));
    }

    #[test]
    fn test_password_redacted() {
        let endpoint = EndpointConfig::new("127.0.0.1:6379").with_password("hunter2");
        assert!(!format!("{:?}", endpoint).contains("hunter2"));
    }

    #[test]
    fn test_bundled_config_is_valid() {
        let config = Config::from_toml(include_str!("../config/keysweep.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.units.len(), 2);
        assert!(config.units[1].deleter.is_some());
    }
}
