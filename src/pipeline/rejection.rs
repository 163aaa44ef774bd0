//! # Rejected Frame Log
//!
//! Rate-limited logging of frames dropped by the decoder. A noisy link can
//! reject frames continuously; only the first `burst` rejections of each
//! window are logged individually, the rest are counted and summarized when
//! the next window opens. Rejections never stop the stream.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::TelemetryError;

/// Default individually logged rejections per window
pub const DEFAULT_BURST: u32 = 10;

/// Default window length
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// What happened to a recorded rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionAction {
    Logged,
    Suppressed,
}

/// Windowed rate limiter for rejection warnings
#[derive(Debug)]
pub struct RejectionLog {
    burst: u32,
    window: Duration,
    window_start: Option<Instant>,
    logged_in_window: u32,
    suppressed: u64,
    total: u64,
}

impl Default for RejectionLog {
    fn default() -> Self {
        Self::new(DEFAULT_BURST, DEFAULT_WINDOW)
    }
}

impl RejectionLog {
    #[must_use]
    pub fn new(burst: u32, window: Duration) -> Self {
        Self {
            burst,
            window,
            window_start: None,
            logged_in_window: 0,
            suppressed: 0,
            total: 0,
        }
    }

    /// Record a rejected line now
    pub fn record(&mut self, line: &str, error: &TelemetryError) -> RejectionAction {
        self.record_at(Instant::now(), line, error)
    }

    /// Record a rejected line at a given instant
    pub fn record_at(&mut self, now: Instant, line: &str, error: &TelemetryError) -> RejectionAction {
        self.total += 1;

        let window_open = self
            .window_start
            .is_some_and(|start| now.duration_since(start) < self.window);
        if !window_open {
            self.emit_summary();
            self.window_start = Some(now);
            self.logged_in_window = 0;
        }

        if self.logged_in_window < self.burst {
            self.logged_in_window += 1;
            warn!("Rejected frame ({}): {:?}", error, line);
            RejectionAction::Logged
        } else {
            self.suppressed += 1;
            RejectionAction::Suppressed
        }
    }

    /// Log the suppressed count once its window has closed
    ///
    /// Called on the commit path, so a burst of noise followed by clean
    /// frames still gets its summary.
    ///
    /// # Returns
    ///
    /// * `Option<u64>` - The count that was logged, if any
    pub fn flush_summary(&mut self) -> Option<u64> {
        self.flush_summary_at(Instant::now())
    }

    /// [`RejectionLog::flush_summary`] at a given instant
    pub fn flush_summary_at(&mut self, now: Instant) -> Option<u64> {
        let closed = self
            .window_start
            .is_some_and(|start| now.duration_since(start) >= self.window);
        if closed {
            self.emit_summary()
        } else {
            None
        }
    }

    /// Log any pending suppressed count regardless of the window
    pub fn finish(&mut self) -> Option<u64> {
        self.emit_summary()
    }

    fn emit_summary(&mut self) -> Option<u64> {
        if self.suppressed == 0 {
            return None;
        }
        let count = std::mem::take(&mut self.suppressed);
        warn!("{} more rejected frames suppressed in the last {:?}", count, self.window);
        Some(count)
    }

    /// Rejections recorded since creation
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Rejections suppressed in the current window
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_suppress() {
        let mut log = RejectionLog::new(3, Duration::from_secs(10));
        let start = Instant::now();

        let actions: Vec<_> = (0..5)
            .map(|i| log.record_at(start + Duration::from_millis(i), "x", &TelemetryError::Framing))
            .collect();

        assert_eq!(
            actions,
            vec![
                RejectionAction::Logged,
                RejectionAction::Logged,
                RejectionAction::Logged,
                RejectionAction::Suppressed,
                RejectionAction::Suppressed,
            ]
        );
        assert_eq!(log.suppressed(), 2);
        assert_eq!(log.total(), 5);
    }

    #[test]
    fn test_new_window_resets_budget() {
        let mut log = RejectionLog::new(1, Duration::from_secs(10));
        let start = Instant::now();
        let err = TelemetryError::PayloadCharset("zz".to_string());

        assert_eq!(log.record_at(start, "a", &err), RejectionAction::Logged);
        assert_eq!(log.record_at(start + Duration::from_secs(5), "b", &err), RejectionAction::Suppressed);
        assert_eq!(log.record_at(start + Duration::from_secs(10), "c", &err), RejectionAction::Logged);
        assert_eq!(log.suppressed(), 0);
        assert_eq!(log.total(), 3);
    }

    #[test]
    fn test_summary_after_noise_ends() {
        let mut log = RejectionLog::new(3, Duration::from_secs(10));
        let start = Instant::now();
        for i in 0..50 {
            log.record_at(start + Duration::from_millis(i), "noise", &TelemetryError::Framing);
        }
        assert_eq!(log.suppressed(), 47);

        // Window still open, nothing to report yet
        assert_eq!(log.flush_summary_at(start + Duration::from_secs(5)), None);
        assert_eq!(log.suppressed(), 47);

        assert_eq!(log.flush_summary_at(start + Duration::from_secs(10)), Some(47));
        assert_eq!(log.suppressed(), 0);
        assert_eq!(log.flush_summary_at(start + Duration::from_secs(20)), None);
        assert_eq!(log.total(), 50);
    }

    #[test]
    fn test_finish_reports_open_window() {
        let mut log = RejectionLog::new(1, Duration::from_secs(3600));
        let start = Instant::now();
        log.record_at(start, "a", &TelemetryError::Framing);
        log.record_at(start, "b", &TelemetryError::Framing);

        assert_eq!(log.finish(), Some(1));
        assert_eq!(log.finish(), None);
    }

    #[test]
    fn test_flush_without_rejections() {
        let mut log = RejectionLog::default();
        assert_eq!(log.flush_summary(), None);
        assert_eq!(log.finish(), None);
    }

    #[test]
    fn test_zero_burst_suppresses_everything() {
        let mut log = RejectionLog::new(0, Duration::from_secs(1));
        assert_eq!(log.record("", &TelemetryError::Framing), RejectionAction::Suppressed);
    }
}
