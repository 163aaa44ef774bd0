//! # Durable Log Record
//!
//! One row of the durable log: a second-precision timestamp followed by one
//! field per catalog channel, in catalog order.

use chrono::{Duration, Local, NaiveDateTime, Timelike};

use crate::catalog;
use crate::history::Sample;

/// Name of the first column of the durable log
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Header row: `timestamp` followed by every channel key
pub fn header() -> Vec<&'static str> {
    std::iter::once(TIMESTAMP_COLUMN).chain(catalog::keys()).collect()
}

/// Round to the nearest second, half-up, and format as ISO-8601 without fraction
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use lora_telemetry::telemetry::record::rounded_timestamp;
///
/// let t = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_milli_opt(12, 0, 59, 500).unwrap();
/// assert_eq!(rounded_timestamp(t), "2024-05-01T12:01:00");
/// ```
pub fn rounded_timestamp(time: NaiveDateTime) -> String {
    let rounded = time + Duration::milliseconds(500);
    let rounded = rounded.with_nanosecond(0).unwrap_or(rounded);
    rounded.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// A row ready to be appended to the durable log
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: String,
    pub values: Vec<f64>,
}

impl LogRecord {
    /// Record stamped with the current local time
    #[must_use]
    pub fn now(sample: &Sample) -> Self {
        Self::at(Local::now().naive_local(), sample)
    }

    #[must_use]
    pub fn at(time: NaiveDateTime, sample: &Sample) -> Self {
        Self {
            timestamp: rounded_timestamp(time),
            values: sample.values().to_vec(),
        }
    }

    /// Stringified fields in column order
    pub fn fields(&self) -> Vec<String> {
        std::iter::once(self.timestamp.clone())
            .chain(self.values.iter().map(|v| v.to_string()))
            .collect()
    }
}
