//! # Frame Decoder
//!
//! Decodes one raw text line into exactly `expected` channel values.
//!
//! Framing is lenient: short frames are zero-padded at the tail and long
//! frames are truncated. Conversion is strict: one bad token replaces the whole
//! frame with zeros, so a frame is either fully parsed or all-zero.

use tracing::debug;

use super::protocol::*;
use crate::error::{Result, TelemetryError};

/// Result of decoding one line
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    /// Exactly `expected` values, aligned with the catalog order
    pub values: Vec<f64>,
    /// Signal strength found outside the payload, if any
    pub rssi: Option<f64>,
    /// True when a conversion failure forced the all-zero substitution
    pub zero_filled: bool,
}

/// Line decoder for a fixed channel count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDecoder {
    expected: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(FRAME_VALUE_COUNT)
    }
}

impl FrameDecoder {
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self { expected }
    }

    /// Number of values produced per frame
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Decode a raw line into `expected` values
    ///
    /// # Arguments
    ///
    /// * `line` - Raw line from the link, without line terminator
    ///
    /// # Returns
    ///
    /// * `Result<Vec<f64>>` - Exactly `expected` values, all-zero if any token failed to convert
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No payload marker and no quoted payload is present (`Framing`)
    /// - The payload contains characters outside the numeric charset (`PayloadCharset`)
    ///
    /// # Examples
    ///
    /// ```
    /// use lora_telemetry::frame::decoder::FrameDecoder;
    ///
    /// let decoder = FrameDecoder::new(4);
    /// assert_eq!(decoder.decode("LoRa data: 1 2.5 -3").unwrap(), vec![1.0, 2.5, -3.0, 0.0]);
    /// assert_eq!(decoder.decode("'1 - 3 4'").unwrap(), vec![0.0; 4]);
    /// assert!(decoder.decode("garbage").is_err());
    /// ```
    pub fn decode(&self, line: &str) -> Result<Vec<f64>> {
        self.decode_frame(line).map(|frame| frame.values)
    }

    /// Decode a raw line, keeping the out-of-band RSSI and substitution flag
    pub fn decode_frame(&self, line: &str) -> Result<DecodedFrame> {
        let range = locate_payload(line)?;
        let payload = line[range.clone()].trim();

        if !is_valid_payload(payload) {
            return Err(TelemetryError::PayloadCharset(payload.to_string()));
        }

        let rssi = find_rssi(&line[..range.start]).or_else(|| find_rssi(&line[range.end..]));

        let (values, zero_filled) = match self.parse_payload(payload) {
            Ok(values) => (values, false),
            Err(e) => {
                debug!("{}, substituting zero frame", e);
                (vec![0.0; self.expected], true)
            }
        };

        Ok(DecodedFrame {
            values,
            rssi,
            zero_filled,
        })
    }

    /// Convert a payload to exactly `expected` values
    ///
    /// Tokens beyond `expected` are dropped before conversion; missing tokens
    /// are zero.
    ///
    /// # Errors
    ///
    /// Returns `NumericParse` if any kept token is not a finite number
    pub fn parse_payload(&self, payload: &str) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(self.expected);

        for token in payload.split_whitespace().take(self.expected) {
            let value = token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| TelemetryError::NumericParse(format!("invalid token {:?}", token)))?;
            values.push(value);
        }

        values.resize(self.expected, 0.0);
        Ok(values)
    }
}
