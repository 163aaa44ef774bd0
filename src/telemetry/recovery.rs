//! # History Recovery
//!
//! Rebuilds the history store from the durable log at startup so a restart
//! does not present an empty dashboard.
//!
//! Only the last `capacity` rows are used. When the log holds fewer rows, they
//! are right-aligned at the tail of every series and the older slots stay zero.
//! Fields are read positionally in catalog order; an unparseable or missing
//! field reads as 0.0.

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info, warn};

use super::record::TIMESTAMP_COLUMN;
use crate::catalog::{self, CHANNEL_COUNT};
use crate::error::{Result, TelemetryError};
use crate::history::HistoryStore;

/// Restores history from a durable log file
#[derive(Debug, Clone)]
pub struct RecoveryLoader {
    path: PathBuf,
}

impl RecoveryLoader {
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Restore history, logging and swallowing any read failure
    ///
    /// # Returns
    ///
    /// * `usize` - Number of log rows restored (0 on first run or failure)
    ///
    /// # Examples
    ///
    /// ```
    /// use lora_telemetry::history::HistoryStore;
    /// use lora_telemetry::telemetry::recovery::RecoveryLoader;
    ///
    /// let mut store = HistoryStore::new(10);
    /// let restored = RecoveryLoader::new("/nonexistent/can_data_log.csv").restore(&mut store);
    /// assert_eq!(restored, 0);
    /// assert_eq!(store.latest("velocity"), 0.0);
    /// ```
    pub fn restore(&self, store: &mut HistoryStore) -> usize {
        match self.try_restore(store) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("{}; starting with zero-filled history", e);
                0
            }
        }
    }

    /// Restore history from the log
    ///
    /// A missing file is the first-run case and restores nothing. On error the
    /// store is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RecoveryRead` if the file exists but cannot be read or parsed
    pub fn try_restore(&self, store: &mut HistoryStore) -> Result<usize> {
        if !self.path.exists() {
            debug!("No durable log at {}, nothing to recover", self.path.display());
            return Ok(0);
        }

        let rows = self.read_rows()?;
        let columns = tail_columns(&rows, store.capacity());

        for (channel, column) in catalog::fields().iter().zip(&columns) {
            store.replace(channel.key, column)?;
        }

        let restored = rows.len().min(store.capacity());
        info!(
            "Recovered {} rows from {}",
            restored,
            self.path.display()
        );
        Ok(restored)
    }

    /// Data rows of the log, header removed
    fn read_rows(&self) -> Result<Vec<StringRecord>> {
        let recovery_error =
            |e: csv::Error| TelemetryError::RecoveryRead(format!("{}: {}", self.path.display(), e));

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(recovery_error)?;

        let mut rows = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(recovery_error)?;

        let has_header = rows
            .first()
            .and_then(|row| row.get(0))
            .is_some_and(|first| first.trim().eq_ignore_ascii_case(TIMESTAMP_COLUMN));
        if has_header {
            rows.remove(0);
        }

        Ok(rows)
    }
}

/// Per-channel columns of the last `capacity` rows, right-aligned and zero-filled
fn tail_columns(rows: &[StringRecord], capacity: usize) -> Vec<Vec<f64>> {
    let recent = &rows[rows.len().saturating_sub(capacity)..];
    let start = capacity - recent.len();

    let mut columns = vec![vec![0.0; capacity]; CHANNEL_COUNT];
    for (offset, row) in recent.iter().enumerate() {
        for (j, column) in columns.iter_mut().enumerate() {
            column[start + offset] = parse_field(row.get(j + 1));
        }
    }
    columns
}

fn parse_field(field: Option<&str>) -> f64 {
    field
        .and_then(|f| f.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
