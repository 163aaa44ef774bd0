//! # Frame Protocol Constants and Payload Location
//!
//! Core definitions for the text frames relayed by the LoRa receiver.
//!
//! A frame line carries its payload in one of two forms:
//!
//! ```text
//! LoRa data: 10.0 5.0 140.0 ...
//! Received packet '10.0 5.0 140.0 ...' with RSSI -61
//! ```
//!
//! The payload is a whitespace separated list of decimal tokens, positionally
//! matched to the first [`FRAME_VALUE_COUNT`] catalog channels.

use std::ops::Range;

use crate::error::{Result, TelemetryError};

/// Marker token preceding an unquoted payload
pub const LORA_DATA_MARKER: &str = "LoRa data:";

/// Delimiter around a quoted payload
pub const PAYLOAD_QUOTE: char = '\'';

/// Number of values carried by one frame (every channel except rssi)
pub const FRAME_VALUE_COUNT: usize = 20;

/// Marker for an out-of-band signal strength reading
pub const RSSI_MARKER: &str = "RSSI";

/// Longest unterminated line kept while assembling the byte stream
pub const MAX_LINE_LENGTH: usize = 4096;

/// Locate the payload within a raw line
///
/// The marker form wins over the quoted form. For the marker form the payload
/// runs to the next marker occurrence or the end of the line.
///
/// # Returns
///
/// * `Result<Range<usize>>` - Byte range of the payload within `line`
///
/// # Errors
///
/// Returns `Framing` if the line has no marker and no pair of quotes
pub fn locate_payload(line: &str) -> Result<Range<usize>> {
    if let Some(pos) = line.find(LORA_DATA_MARKER) {
        let start = pos + LORA_DATA_MARKER.len();
        let end = line[start..]
            .find(LORA_DATA_MARKER)
            .map_or(line.len(), |next| start + next);
        return Ok(start..end);
    }

    let open = line.find(PAYLOAD_QUOTE).ok_or(TelemetryError::Framing)?;
    let close = line[open + 1..]
        .find(PAYLOAD_QUOTE)
        .ok_or(TelemetryError::Framing)?;

    Ok(open + 1..open + 1 + close)
}

/// Extract the payload text, trimmed of surrounding whitespace
///
/// # Examples
///
/// ```
/// use lora_telemetry::frame::protocol::extract_payload;
///
/// assert_eq!(extract_payload("LoRa data: 1 2 3").unwrap(), "1 2 3");
/// assert_eq!(extract_payload("Received packet '4 5' with RSSI -60").unwrap(), "4 5");
/// assert!(extract_payload("").is_err());
/// ```
pub fn extract_payload(line: &str) -> Result<&str> {
    let range = locate_payload(line)?;
    Ok(line[range].trim())
}

/// Check the payload charset: digits, '-', '.' and whitespace only
///
/// An empty payload does not match.
pub fn is_valid_payload(payload: &str) -> bool {
    !payload.is_empty()
        && payload
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == '.' || c.is_ascii_whitespace())
}

/// Find an `RSSI <number>` reading in text outside the payload
///
/// Separators such as ':' or '=' between the marker and the number are skipped.
pub fn find_rssi(text: &str) -> Option<f64> {
    let pos = text.find(RSSI_MARKER)?;
    let rest = text[pos + RSSI_MARKER.len()..]
        .trim_start_matches(|c: char| c == ':' || c == '=' || c.is_whitespace());
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '-' || c == '.'))
        .unwrap_or(rest.len());

    rest[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}
