//! Configuration management
//!
//! Defaults, TOML files and `ROSTER_*` environment overrides, validated before
//! use.

use crate::core_events::broadcaster::DEFAULT_BUS_CAPACITY;
use crate::core_gateway::correlating::MAX_FRAME_SIZE;
use crate::core_gateway::session::DEFAULT_RPC_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gateway call configuration
    pub rpc: RpcConfig,

    /// Event bus configuration
    pub events: EventsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Gateway call configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Time to wait for a correlated response
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Largest inbound frame accepted, in bytes
    pub max_frame_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Events buffered per subscriber before it lags
    pub bus_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,

    /// Log file path (optional)
    pub log_file: Option<PathBuf>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RPC_TIMEOUT,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
            log_file: None,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(ConfigError::Override {
                key: key.to_string(),
                value: raw,
                reason: e.to_string(),
            }),
        },
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: ROSTER_<SECTION>_<KEY>
    /// Example: ROSTER_RPC_TIMEOUT_SECS=30
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// File (if any) first, then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ROSTER_*` overrides read through `lookup`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(secs) = parse_var::<u64>(&lookup, "ROSTER_RPC_TIMEOUT_SECS")? {
            self.rpc.timeout = Duration::from_secs(secs);
        }
        if let Some(size) = parse_var(&lookup, "ROSTER_RPC_MAX_FRAME_SIZE")? {
            self.rpc.max_frame_size = size;
        }
        if let Some(capacity) = parse_var(&lookup, "ROSTER_EVENTS_BUS_CAPACITY")? {
            self.events.bus_capacity = capacity;
        }
        if let Some(level) = lookup("ROSTER_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = parse_var(&lookup, "ROSTER_LOG_JSON")? {
            self.logging.json_format = json;
        }
        if let Some(file) = lookup("ROSTER_LOG_FILE") {
            self.logging.log_file = Some(PathBuf::from(file));
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.timeout.is_zero() {
            return Err(ConfigError::ZeroLimit("rpc.timeout"));
        }

        if self.rpc.max_frame_size == 0 {
            return Err(ConfigError::ZeroLimit("rpc.max_frame_size"));
        }

        if self.events.bus_capacity == 0 {
            return Err(ConfigError::ZeroLimit("events.bus_capacity"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::UnknownLogLevel(self.logging.level.clone()));
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Render(e.to_string()))
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        let path = path.as_ref();
        std::fs::write(path, contents).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rpc.max_frame_size, 64 * 1024);
        assert_eq!(config.events.bus_capacity, DEFAULT_BUS_CAPACITY);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.rpc.timeout = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroLimit("rpc.timeout")));

        config = Config::default();
        config.events.bus_capacity = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroLimit("events.bus_capacity"))
        );

        config = Config::default();
        config.rpc.max_frame_size = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroLimit("rpc.max_frame_size"))
        );
    }

    #[test]
    fn test_log_level_validation() {
        let mut config = Config::default();

        config.logging.level = "invalid".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownLogLevel("invalid".to_string()))
        );

        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("ROSTER_RPC_TIMEOUT_SECS", "3"),
                ("ROSTER_EVENTS_BUS_CAPACITY", "32"),
                ("ROSTER_LOG_JSON", "true"),
            ]))
            .unwrap();

        assert_eq!(config.rpc.timeout, Duration::from_secs(3));
        assert_eq!(config.events.bus_capacity, 32);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_invalid_env_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("ROSTER_EVENTS_BUS_CAPACITY", "lots")]))
            .unwrap_err();
        assert!(
            matches!(&err, ConfigError::Override { key, value, .. } if key == "ROSTER_EVENTS_BUS_CAPACITY" && value == "lots"),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.toml");

        let mut config = Config::default();
        config.rpc.timeout = Duration::from_secs(42);
        config.logging.level = "debug".to_string();
        config.save_to_file(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("42s"), "{}", contents);
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[rpc]\ntimeout = \"500ms\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.rpc.timeout, Duration::from_millis(500));
        assert_eq!(config.rpc.max_frame_size, MAX_FRAME_SIZE);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_malformed_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[events]\nbus_capacity = \"many\"\n").unwrap();

        match Config::from_file(&path).unwrap_err() {
            ConfigError::Malformed { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("Expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/roster.toml").unwrap_err();
        assert!(
            matches!(&err, ConfigError::Read { path, .. } if path.ends_with("roster.toml")),
            "{:?}",
            err
        );
    }
}
