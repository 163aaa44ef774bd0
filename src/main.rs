//! # LoRa Telemetry
//!
//! Receive solar vehicle telemetry from a LoRa receiver on a serial port.
//!
//! This application decodes the receiver's text frames into channel samples,
//! keeps a rolling history per channel and appends every sample to a durable
//! CSV log that seeds the history on the next start.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lora_telemetry::catalog::{self, signal::SignalQuality, RSSI_KEY};
use lora_telemetry::config::{Config, LoggingConfig};
use lora_telemetry::frame::decoder::FrameDecoder;
use lora_telemetry::history::{HistoryStore, SharedHistory};
use lora_telemetry::pipeline::notify::SinkListener;
use lora_telemetry::pipeline::rejection::RejectionLog;
use lora_telemetry::pipeline::simulation::SimulatedSource;
use lora_telemetry::pipeline::{ConnectOutcome, IngestionPipeline, PipelineState};
use lora_telemetry::serial::SerialOpener;
use lora_telemetry::telemetry::logger::{flush_blocking, spawn_flush_task, CsvLogger};
use lora_telemetry::telemetry::recovery::RecoveryLoader;
use lora_telemetry::telemetry::tables::TableSink;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of committed samples between status log messages
const STATUS_INTERVAL_SAMPLES: u64 = 100;

/// Main entry point for LoRa Telemetry
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, else `config/default.toml`, else defaults)
///    - Set up logging with tracing subscriber
///    - Restore history from the durable log
///    - Register the durable log, table and status listeners
///
/// 2. **Streaming**
///    - Open the receiver (or start the simulated source)
///    - Run until Ctrl+C or until the link is lost
///
/// 3. **Graceful Shutdown**
///    - Stop the pipeline and close the port
///    - Flush buffered log rows
///
/// # Errors
///
/// Returns error if:
/// - The configuration file cannot be loaded or is invalid
/// - The durable log or table file cannot be opened
#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_source) = load_config()?;
    let _log_guard = init_tracing(&config.logging);

    info!("LoRa Telemetry v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", config_source);

    let mut store = HistoryStore::new(config.history.capacity);
    if config.durable_log.enabled {
        let restored = RecoveryLoader::new(&config.durable_log.path).restore(&mut store);
        info!("Restored {} rows of history from {}", restored, config.durable_log.path.display());
    }
    let history = SharedHistory::new(store);

    let mut pipeline = IngestionPipeline::with_config(
        history.clone(),
        FrameDecoder::default(),
        RejectionLog::new(
            config.decoder.rejection_log_burst,
            config.decoder.rejection_window(),
        ),
    );

    let durable_log = if config.durable_log.enabled {
        let logger = Arc::new(
            CsvLogger::open(&config.durable_log.path)
                .with_context(|| format!("opening {}", config.durable_log.path.display()))?,
        );
        pipeline.subscribe(Box::new(SinkListener::new("Durable log", history.clone(), logger.clone())));
        let flush_task = spawn_flush_task(logger.clone(), config.durable_log.flush_interval());
        Some((logger, flush_task))
    } else {
        None
    };

    if config.tables.enabled {
        let tables = TableSink::open(&config.tables.path)
            .with_context(|| format!("opening {}", config.tables.path.display()))?;
        pipeline.subscribe(Box::new(SinkListener::new("Tables", history.clone(), tables)));
    }

    pipeline.subscribe(Box::new(status_listener(history.clone())));

    if config.simulation.enabled {
        pipeline.start_simulation(SimulatedSource::new(), config.simulation.period())?;
    } else {
        let outcome = pipeline.connect(SerialOpener::new(config.link.baud_rate), &config.link.port)?;
        tokio::spawn(async move {
            match outcome.await {
                Ok(ConnectOutcome::Connected) => info!("Receiving telemetry"),
                Ok(ConnectOutcome::Failed(reason)) => error!("Connection failed: {}", reason),
                Ok(ConnectOutcome::Cancelled) | Err(_) => {}
            }
        });
    }

    info!("Press Ctrl+C to exit");

    let mut state = pipeline.watch_state();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = state.wait_for(|s| *s == PipelineState::Idle) => {
            warn!("No link, shutting down. Check the receiver port and restart.");
        }
    }

    pipeline.stop().await;

    if let Some((logger, flush_task)) = durable_log {
        flush_task.abort();
        match flush_blocking(logger.clone()).await {
            Ok(rows) => info!("Flushed {} rows to {}", rows, logger.path().display()),
            Err(e) => warn!("Final flush of {} failed: {}", logger.path().display(), e),
        }
    }

    info!(
        "Total samples committed: {}, frames rejected: {}",
        pipeline.committed(),
        pipeline.rejected()
    );

    Ok(())
}

/// Load configuration from the first argument or the default path
fn load_config() -> Result<(Config, String)> {
    if let Some(path) = std::env::args().nth(1) {
        let config = Config::load(&path).with_context(|| format!("loading {}", path))?;
        return Ok((config, path));
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        let config = Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("loading {}", DEFAULT_CONFIG_PATH))?;
        return Ok((config, DEFAULT_CONFIG_PATH.to_string()));
    }

    Ok((Config::default(), "built-in defaults".to_string()))
}

/// Install the stdout subscriber and, if configured, a daily rolling file
///
/// The returned guard must live until exit so buffered file output is written.
fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    if config.dir.is_empty() {
        registry.init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&config.dir, "lora-telemetry.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    registry
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Some(guard)
}

/// Listener logging a progress line every `STATUS_INTERVAL_SAMPLES` samples
fn status_listener(history: SharedHistory) -> impl FnMut() + Send {
    let mut samples: u64 = 0;

    move || {
        samples += 1;
        if samples % STATUS_INTERVAL_SAMPLES != 0 {
            return;
        }

        let latest = history.latest_sample();
        let velocity = latest.get("velocity").unwrap_or(0.0);
        let battery = latest.get("battery_volt").unwrap_or(0.0);
        let rssi = latest.get(RSSI_KEY).unwrap_or(0.0);
        info!(
            "{} samples: velocity {:.1} {}, battery {:.1} {}, signal {} ({} {})",
            samples,
            velocity,
            catalog::unit("velocity"),
            battery,
            catalog::unit("battery_volt"),
            SignalQuality::from_rssi(rssi).label(),
            rssi,
            catalog::unit(RSSI_KEY)
        );
    }
}
