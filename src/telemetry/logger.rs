//! # Durable Log Writer
//!
//! Append-only CSV log of committed samples.
//!
//! Rows are buffered in memory and appended on a fixed period, so a crash may
//! lose up to one flush period of samples. The header is written once, when
//! the file is created.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::record::{header, LogRecord};
use crate::error::Result;
use crate::history::Sample;
use crate::pipeline::notify::SampleSink;

/// Buffered CSV appender for the durable log
#[derive(Debug)]
pub struct CsvLogger {
    path: PathBuf,
    buffer: Mutex<Vec<LogRecord>>,
}

impl CsvLogger {
    /// Open the durable log, creating it with a header row if absent
    ///
    /// # Arguments
    ///
    /// * `path` - Log file path; missing parent directories are created
    ///
    /// # Errors
    ///
    /// Returns error if the file or its header cannot be written
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lora_telemetry::telemetry::logger::CsvLogger;
    ///
    /// let logger = CsvLogger::open("can_data_log.csv")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let needs_header = match fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        if needs_header {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(header())?;
            writer.flush()?;
            info!("Created durable log at {}", path.display());
        }

        Ok(Self {
            path,
            buffer: Mutex::new(Vec::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue a record for the next flush
    pub fn push(&self, record: LogRecord) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Records waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Append all buffered records to the file
    ///
    /// The buffer is emptied even when the append fails.
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - Number of rows written
    pub fn flush(&self) -> Result<usize> {
        let records = std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner));
        if records.is_empty() {
            return Ok(0);
        }

        let file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        let mut writer = csv::Writer::from_writer(file);
        for record in &records {
            writer.write_record(record.fields())?;
        }
        writer.flush()?;

        debug!("Flushed {} rows to {}", records.len(), self.path.display());
        Ok(records.len())
    }
}

impl SampleSink for Arc<CsvLogger> {
    fn write(&mut self, latest: &Sample) -> Result<()> {
        self.push(LogRecord::now(latest));
        Ok(())
    }
}

/// Run [`CsvLogger::flush`] on the blocking thread pool
///
/// # Errors
///
/// Returns the flush error, or `Io` if the blocking task panicked
pub async fn flush_blocking(logger: Arc<CsvLogger>) -> Result<usize> {
    tokio::task::spawn_blocking(move || logger.flush())
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

/// Flush the logger every `period` until the task is aborted
pub fn spawn_flush_task(logger: Arc<CsvLogger>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = flush_blocking(logger.clone()).await {
                warn!("Failed to write durable log {}: {}", logger.path().display(), e);
            }
        }
    })
}
