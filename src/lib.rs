//! # LoRa Telemetry Library
//!
//! Telemetry ingestion for a solar vehicle's LoRa radio link.
//!
//! This library turns the text frames relayed by a LoRa receiver into
//! validated channel samples, keeps a fixed-length rolling history per
//! channel, persists every committed sample to a durable CSV log and restores
//! the history from that log at startup.

pub mod catalog;
pub mod config;
pub mod error;
pub mod frame;
pub mod history;
pub mod pipeline;
pub mod serial;
pub mod telemetry;
