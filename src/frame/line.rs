//! Byte stream to line assembly for the link reader.

use bytes::{Buf, BytesMut};
use tracing::warn;

use super::protocol::MAX_LINE_LENGTH;

/// Accumulates raw link bytes and yields complete, trimmed lines
#[derive(Debug)]
pub struct LineAssembler {
    buffer: BytesMut,
    max_len: usize,
    /// Dropping the remainder of an overlong line until its terminator
    discarding: bool,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new(MAX_LINE_LENGTH)
    }
}

impl LineAssembler {
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_len.min(1024)),
            max_len,
            discarding: false,
        }
    }

    /// Feed bytes read from the link
    ///
    /// # Returns
    ///
    /// * `Vec<String>` - Complete non-empty lines, terminators and surrounding
    ///   whitespace removed, invalid UTF-8 replaced
    ///
    /// # Examples
    ///
    /// ```
    /// use lora_telemetry::frame::line::LineAssembler;
    ///
    /// let mut lines = LineAssembler::default();
    /// assert!(lines.push(b"LoRa data: 1 ").is_empty());
    /// assert_eq!(lines.push(b"2\r\nLoRa"), vec!["LoRa data: 1 2".to_string()]);
    /// ```
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(data);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw = self.buffer.split_to(pos + 1);
            if self.discarding {
                self.discarding = false;
                continue;
            }

            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }

        if self.buffer.len() > self.max_len {
            warn!(
                "Discarding {} bytes without line terminator",
                self.buffer.len()
            );
            self.buffer.advance(self.buffer.len());
            self.discarding = true;
        }

        lines
    }

    /// Bytes held for an incomplete line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let mut assembler = LineAssembler::default();
        assert_eq!(assembler.push(b"LoRa data: 1 2\n"), vec!["LoRa data: 1 2"]);
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_line_split_across_reads() {
        let mut assembler = LineAssembler::default();
        assert!(assembler.push(b"LoRa da").is_empty());
        assert!(assembler.push(b"ta: 1").is_empty());
        assert_eq!(assembler.push(b" 2\r\n"), vec!["LoRa data: 1 2"]);
    }

    #[test]
    fn test_multiple_lines_in_one_read() {
        let mut assembler = LineAssembler::default();
        let lines = assembler.push(b"'1'\n'2'\r\n'3'\npartial");
        assert_eq!(lines, vec!["'1'", "'2'", "'3'"]);
        assert_eq!(assembler.pending(), 7);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut assembler = LineAssembler::default();
        assert_eq!(assembler.push(b"\r\n\n  \n'1'\n"), vec!["'1'"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut assembler = LineAssembler::default();
        let lines = assembler.push(b"'1 \xff 2'\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains('\u{fffd}'));
    }

    #[test]
    fn test_overlong_line_is_discarded() {
        let mut assembler = LineAssembler::new(8);
        assert!(assembler.push(b"0123456789").is_empty());
        assert_eq!(assembler.pending(), 0);

        // Remainder of the overlong line is dropped, the next line survives
        assert_eq!(assembler.push(b"abc\n'1 2'\n"), vec!["'1 2'"]);
    }
}
