//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so the bridge runs without a config file
//! against the local apcupsd at 127.0.0.1:3551, polling every 5 seconds.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::client::DEFAULT_TIMEOUT_MS;
use crate::error::{Result, UpsBridgeError};
use crate::monitor::{DEFAULT_NIS_HOST, DEFAULT_NIS_PORT, DEFAULT_POLL_INTERVAL_MS};

/// Log levels accepted by `logging.level`
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub nis: NisConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub accessory: AccessoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// apcupsd NIS connection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NisConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Polling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PollerConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

/// Exposed battery accessory configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AccessoryConfig {
    #[serde(default = "default_accessory_name")]
    pub name: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_host() -> String { DEFAULT_NIS_HOST.to_string() }
fn default_port() -> u16 { DEFAULT_NIS_PORT }
fn default_timeout_ms() -> u64 { DEFAULT_TIMEOUT_MS }

fn default_interval_ms() -> u64 { DEFAULT_POLL_INTERVAL_MS }

fn default_accessory_name() -> String { "UPS".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for NisConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { interval_ms: default_interval_ms() }
    }
}

impl Default for AccessoryConfig {
    fn default() -> Self {
        Self { name: default_accessory_name() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl NisConfig {
    /// Per-step client timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl PollerConfig {
    /// Time between poll cycles
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ups_battery_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.nis.host.trim().is_empty() {
            return Err(invalid("nis host cannot be empty"));
        }

        if self.nis.port == 0 {
            return Err(invalid("nis port cannot be zero"));
        }

        if self.nis.timeout_ms == 0 || self.nis.timeout_ms > 60000 {
            return Err(invalid("timeout_ms must be between 1 and 60000"));
        }

        if self.poller.interval_ms < 1000 || self.poller.interval_ms > 60000 {
            return Err(invalid("interval_ms must be between 1000 and 60000"));
        }

        if self.accessory.name.trim().is_empty() {
            return Err(invalid("accessory name cannot be empty"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "log level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> UpsBridgeError {
    UpsBridgeError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio_test::{assert_err, assert_ok};

    fn load_str(toml_content: &str) -> Result<Config> {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        Config::load(temp_file.path())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_ok!(config.validate());
        assert_eq!(config.nis.host, "127.0.0.1");
        assert_eq!(config.nis.port, 3551);
        assert_eq!(config.poller.interval(), Duration::from_millis(5000));
        assert_eq!(config.nis.timeout(), Duration::from_millis(3000));
        assert_eq!(config.accessory.name, "UPS");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let config = load_str("").unwrap();
        assert_eq!(config.nis.host, default_host());
        assert_eq!(config.nis.port, default_port());
        assert_eq!(config.poller.interval_ms, default_interval_ms());
    }

    #[test]
    fn test_load_config_from_file() {
        let toml_content = r#"
[nis]
host = "192.168.1.20"
port = 3552
timeout_ms = 1500

[poller]
interval_ms = 10000

[accessory]
name = "Rack UPS"

[logging]
level = "debug"
"#;

        let config = load_str(toml_content).unwrap();
        assert_eq!(config.nis.host, "192.168.1.20");
        assert_eq!(config.nis.port, 3552);
        assert_eq!(config.nis.timeout_ms, 1500);
        assert_eq!(config.poller.interval_ms, 10000);
        assert_eq!(config.accessory.name, "Rack UPS");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_shipped_default_file_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.nis.host, default_host());
        assert_eq!(config.nis.port, default_port());
        assert_eq!(config.nis.timeout_ms, default_timeout_ms());
        assert_eq!(config.poller.interval_ms, default_interval_ms());
        assert_eq!(config.accessory.name, default_accessory_name());
        assert_eq!(config.logging.level, default_log_level());
    }

    #[test]
    fn test_load_partial_section() {
        let config = load_str("[nis]\nport = 4000\n").unwrap();
        assert_eq!(config.nis.port, 4000);
        assert_eq!(config.nis.host, "127.0.0.1");
        assert_eq!(config.nis.timeout_ms, 3000);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/ups-battery-bridge.toml");
        assert!(matches!(result, Err(UpsBridgeError::Io(_))));
    }

    #[test]
    fn test_load_malformed_toml() {
        let result = load_str("[nis\nport = ");
        assert!(matches!(result, Err(UpsBridgeError::Config(_))));
    }

    #[test]
    fn test_load_wrong_type() {
        let result = load_str("[nis]\nport = \"not a number\"\n");
        assert!(matches!(result, Err(UpsBridgeError::Config(_))));
    }

    #[test]
    fn test_load_invalid_values_fail_validation() {
        let result = load_str("[poller]\ninterval_ms = 10\n");
        match result {
            Err(UpsBridgeError::Config(e)) => {
                assert!(e.to_string().contains("interval_ms"));
            }
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    #[test]
    fn test_empty_host() {
        let mut config = Config::default();
        config.nis.host = "  ".to_string();
        assert_err!(config.validate());
    }

    #[test]
    fn test_port_zero() {
        let mut config = Config::default();
        config.nis.port = 0;
        assert_err!(config.validate());
    }

    #[test]
    fn test_timeout_ms_zero() {
        let mut config = Config::default();
        config.nis.timeout_ms = 0;
        assert_err!(config.validate());
    }

    #[test]
    fn test_timeout_ms_too_high() {
        let mut config = Config::default();
        config.nis.timeout_ms = 60001;
        assert_err!(config.validate());
    }

    #[test]
    fn test_interval_bounds() {
        let mut config = Config::default();

        config.poller.interval_ms = 999;
        assert_err!(config.validate());

        config.poller.interval_ms = 60001;
        assert_err!(config.validate());

        config.poller.interval_ms = 1000;
        assert_ok!(config.validate());

        config.poller.interval_ms = 60000;
        assert_ok!(config.validate());
    }

    #[test]
    fn test_empty_accessory_name() {
        let mut config = Config::default();
        config.accessory.name = String::new();
        assert_err!(config.validate());
    }

    #[test]
    fn test_log_levels() {
        for &level in LOG_LEVELS {
            let mut config = Config::default();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Log level {} should be valid", level);
        }

        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert_err!(config.validate());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_host(), "127.0.0.1");
        assert_eq!(default_port(), 3551);
        assert_eq!(default_timeout_ms(), 3000);
        assert_eq!(default_interval_ms(), 5000);
        assert_eq!(default_accessory_name(), "UPS");
        assert_eq!(default_log_level(), "info");
    }
}
