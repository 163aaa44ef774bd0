//! # Error Types
//!
//! Custom error types for LoRa Telemetry using `thiserror`.

use thiserror::Error;

/// Main error type for LoRa Telemetry
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Line carries neither the payload marker nor a quoted payload
    #[error("Framing error: no payload marker or quoted payload in line")]
    Framing,

    /// Payload contains characters other than digits, '-', '.' and whitespace
    #[error("Payload charset error: {0:?}")]
    PayloadCharset(String),

    /// Payload token could not be converted to a finite number
    #[error("Numeric parse error: {0}")]
    NumericParse(String),

    /// Link endpoint could not be opened
    #[error("Failed to open link {endpoint}: {reason}")]
    LinkOpen { endpoint: String, reason: String },

    /// Durable log exists but could not be read
    #[error("Failed to read durable log: {0}")]
    RecoveryRead(String),

    /// Channel key not present in the catalog
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// History replacement with the wrong number of values
    #[error("History length mismatch: expected {expected}, got {actual}")]
    HistoryLength { expected: usize, actual: usize },

    /// Pipeline operation not allowed in the current state
    #[error("Invalid pipeline transition: cannot {action} while {state}")]
    InvalidTransition { state: String, action: &'static str },

    /// Sample sink failures
    #[error("Sink error: {0}")]
    Sink(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// CSV encoding/decoding errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for LoRa Telemetry
pub type Result<T> = std::result::Result<T, TelemetryError>;
