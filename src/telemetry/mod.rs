//! # Telemetry Module
//!
//! Persistence of committed samples.
//!
//! This module handles:
//! - Formatting durable log rows (second-precision timestamps)
//! - Buffered, periodically flushed CSV appends
//! - Restoring history from the durable log at startup
//! - Per-category table rows for the external store

pub mod record;
pub mod logger;
pub mod recovery;
pub mod tables;
