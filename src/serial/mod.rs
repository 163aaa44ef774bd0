//! # Serial Communication Module
//!
//! Handles the serial link to the LoRa receiver.
//!
//! This module handles:
//! - Selecting the endpoint (configured path, or the only port present)
//! - Opening the port at the receiver baud rate (8N1, no flow control)
//! - Exposing the open port through [`SerialPortIO`] for the ingestion loop

pub mod port_trait;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{Result, TelemetryError};
pub use port_trait::{AsyncPort, LinkOpener, SerialPortIO, TokioSerialPort};

/// Baud rate of the LoRa receiver's USB serial output
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Opens LoRa receiver serial ports
#[derive(Debug, Clone, Copy)]
pub struct SerialOpener {
    baud_rate: u32,
}

impl Default for SerialOpener {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD_RATE)
    }
}

impl SerialOpener {
    #[must_use]
    pub fn new(baud_rate: u32) -> Self {
        Self { baud_rate }
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Open a specific serial port with receiver settings
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0" or "COM3")
    ///
    /// # Returns
    ///
    /// * `Result<SerialStream>` - Opened serial port
    fn open_port(&self, path: &str) -> Result<tokio_serial::SerialStream> {
        use tokio_serial::SerialPortBuilderExt;

        tokio_serial::new(path, self.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TelemetryError::LinkOpen {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl LinkOpener for SerialOpener {
    async fn open(&self, endpoint: &str) -> Result<Box<dyn SerialPortIO>> {
        let endpoint = if endpoint.is_empty() {
            select_endpoint(&available_ports())?
        } else {
            endpoint.to_string()
        };

        debug!("Trying to open serial port: {}", endpoint);
        let port = self.open_port(&endpoint)?;
        info!("Opened LoRa receiver at {} ({} baud)", endpoint, self.baud_rate);

        Ok(Box::new(TokioSerialPort::new(port)))
    }
}

/// Names of the serial ports present on this machine
pub fn available_ports() -> Vec<String> {
    match tokio_serial::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            warn!("Failed to enumerate serial ports: {}", e);
            Vec::new()
        }
    }
}

/// Pick the endpoint when none was configured
///
/// Only an unambiguous choice is made: exactly one port must be present.
///
/// # Errors
///
/// Returns `LinkOpen` if no port or several ports are available
///
/// # Examples
///
/// ```
/// use lora_telemetry::serial::select_endpoint;
///
/// assert_eq!(select_endpoint(&["/dev/ttyUSB0".to_string()]).unwrap(), "/dev/ttyUSB0");
/// assert!(select_endpoint(&[]).is_err());
/// ```
pub fn select_endpoint(available: &[String]) -> Result<String> {
    match available {
        [only] => {
            info!("Only one serial port available, auto-selecting {}", only);
            Ok(only.clone())
        }
        [] => Err(TelemetryError::LinkOpen {
            endpoint: String::new(),
            reason: "no serial port available".to_string(),
        }),
        many => Err(TelemetryError::LinkOpen {
            endpoint: String::new(),
            reason: format!("multiple serial ports available, select one of: {}", many.join(", ")),
        }),
    }
}
