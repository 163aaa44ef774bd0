//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; missing values take the
//! defaults below.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TelemetryError};

/// Baud rates the LoRa receiver firmware can be flashed with
pub const ALLOWED_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Accepted `logging.level` values
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub durable_log: DurableLogConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Empty selects the only available port
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Rolling history configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

/// Durable CSV log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DurableLogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: PathBuf,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

/// Category tables sink configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TablesConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_tables_path")]
    pub path: PathBuf,
}

/// Simulated source configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

/// Frame decoder configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DecoderConfig {
    #[serde(default = "default_rejection_log_burst")]
    pub rejection_log_burst: u32,

    #[serde(default = "default_rejection_window_ms")]
    pub rejection_window_ms: u64,
}

/// Diagnostics configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily rolling log files; empty logs to stdout only
    #[serde(default)]
    pub dir: String,
}

// Default value functions
fn default_baud_rate() -> u32 { 9600 }

fn default_capacity() -> usize { 100 }

fn default_true() -> bool { true }
fn default_log_path() -> PathBuf { PathBuf::from("can_data_log.csv") }
fn default_flush_interval_ms() -> u64 { 60000 }

fn default_tables_path() -> PathBuf { PathBuf::from("telemetry_tables.jsonl") }

fn default_period_ms() -> u64 { 1000 }

fn default_rejection_log_burst() -> u32 { 10 }
fn default_rejection_window_ms() -> u64 { 10000 }

fn default_level() -> String { "info".to_string() }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl Default for DurableLogConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_log_path(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_tables_path(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            period_ms: default_period_ms(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            rejection_log_burst: default_rejection_log_burst(),
            rejection_window_ms: default_rejection_window_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: String::new(),
        }
    }
}

impl DurableLogConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl SimulationConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl DecoderConfig {
    pub fn rejection_window(&self) -> Duration {
        Duration::from_millis(self.rejection_window_ms)
    }
}

fn invalid(msg: impl std::fmt::Display) -> TelemetryError {
    TelemetryError::Config(toml::de::Error::custom(msg))
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
    /// use lora_telemetry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `Config` error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if !ALLOWED_BAUD_RATES.contains(&self.link.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of {:?}",
                ALLOWED_BAUD_RATES
            )));
        }

        if self.history.capacity == 0 || self.history.capacity > 100_000 {
            return Err(invalid("history capacity must be between 1 and 100000"));
        }

        if self.durable_log.enabled {
            if self.durable_log.path.as_os_str().is_empty() {
                return Err(invalid("durable_log path cannot be empty when enabled"));
            }
            if self.durable_log.flush_interval_ms == 0 || self.durable_log.flush_interval_ms > 3_600_000 {
                return Err(invalid("flush_interval_ms must be between 1 and 3600000"));
            }
        }

        if self.tables.enabled && self.tables.path.as_os_str().is_empty() {
            return Err(invalid("tables path cannot be empty when enabled"));
        }

        if self.simulation.period_ms == 0 || self.simulation.period_ms > 60000 {
            return Err(invalid("simulation period_ms must be between 1 and 60000"));
        }

        if self.decoder.rejection_log_burst == 0 {
            return Err(invalid("rejection_log_burst must be greater than 0"));
        }

        if self.decoder.rejection_window_ms == 0 {
            return Err(invalid("rejection_window_ms must be greater than 0"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!("logging level must be one of {:?}", LOG_LEVELS)));
        }

        Ok(())
    }
}
