//! # Category Tables Sink
//!
//! Splits every committed sample into one row per category table (vehicle,
//! battery, motor, mppt) and appends each row as a JSON line. This is the
//! hand-off format for the external relational store.
//!
//! ```text
//! {"table":"motor","timestamp":"2025-03-14T10:00:00","values":{"motor_current":10.0,...}}
//! ```

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Local;
use serde::Serialize;

use super::record::rounded_timestamp;
use crate::catalog::Category;
use crate::error::Result;
use crate::history::Sample;
use crate::pipeline::notify::SampleSink;

/// Table columns in write order; cell IDs, BMS temperature and signal
/// strength are not stored
pub const TABLE_COLUMNS: [(Category, &[&str]); 4] = [
    (Category::Vehicle, &["velocity", "distance_travelled"]),
    (
        Category::Battery,
        &[
            "battery_volt",
            "battery_current",
            "battery_cell_LOW_volt",
            "battery_cell_HIGH_volt",
            "battery_cell_AVG_volt",
            "battery_cell_LOW_temp",
            "battery_cell_HIGH_temp",
            "battery_cell_AVG_temp",
        ],
    ),
    (Category::Motor, &["motor_current", "motor_temp", "motor_controller_temp"]),
    (
        Category::Mppt,
        &["MPPT1_watt", "MPPT2_watt", "MPPT3_watt", "MPPT_total_watt"],
    ),
];

#[derive(Debug, Serialize)]
struct TableRow<'a> {
    table: Category,
    timestamp: &'a str,
    values: BTreeMap<&'static str, f64>,
}

/// JSON-lines writer of per-category table rows
#[derive(Debug)]
pub struct TableSink<W: Write> {
    writer: W,
}

impl TableSink<BufWriter<File>> {
    /// Open (or create) the table rows file for appending
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TableSink<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one row per table for a sample
    pub fn write_rows(&mut self, timestamp: &str, sample: &Sample) -> Result<()> {
        for (table, columns) in TABLE_COLUMNS {
            let values = columns
                .iter()
                .map(|&key| (key, sample.get(key).unwrap_or(0.0)))
                .collect();
            let row = TableRow {
                table,
                timestamp,
                values,
            };
            serde_json::to_writer(&mut self.writer, &row)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> SampleSink for TableSink<W> {
    fn write(&mut self, latest: &Sample) -> Result<()> {
        let timestamp = rounded_timestamp(Local::now().naive_local());
        self.write_rows(&timestamp, latest)
    }
}
