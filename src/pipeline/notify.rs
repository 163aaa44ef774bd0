//! # Sample Notification
//!
//! Fan-out of the "new sample" signal to listeners registered with the
//! pipeline. Delivery is synchronous on the producer's task and follows
//! registration order.
//!
//! Listeners carry no payload; each one holds its own [`SharedHistory`] handle
//! and copies out what it needs.

use tracing::warn;

use crate::error::Result;
use crate::history::{Sample, SharedHistory};

/// Receiver of the "new sample" signal
pub trait SampleListener: Send {
    fn on_new_sample(&mut self);
}

impl<F: FnMut() + Send> SampleListener for F {
    fn on_new_sample(&mut self) {
        self()
    }
}

/// Side-effecting consumer of the latest values (log append, external store)
#[cfg_attr(test, mockall::automock)]
pub trait SampleSink: Send {
    fn write(&mut self, latest: &Sample) -> Result<()>;
}

/// Listener that hands the latest values to a sink and contains its failures
pub struct SinkListener<S> {
    name: String,
    history: SharedHistory,
    sink: S,
    failures: u64,
}

impl<S: SampleSink> SinkListener<S> {
    #[must_use]
    pub fn new(name: impl Into<String>, history: SharedHistory, sink: S) -> Self {
        Self {
            name: name.into(),
            history,
            sink,
            failures: 0,
        }
    }

    /// Writes that failed so far
    pub fn failures(&self) -> u64 {
        self.failures
    }
}

impl<S: SampleSink> SampleListener for SinkListener<S> {
    fn on_new_sample(&mut self) {
        let latest = self.history.latest_sample();
        if let Err(e) = self.sink.write(&latest) {
            self.failures += 1;
            warn!("{} sink write failed: {}", self.name, e);
        }
    }
}

/// Ordered list of listeners
#[derive(Default)]
pub struct Notifier {
    listeners: Vec<Box<dyn SampleListener>>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Box<dyn SampleListener>) {
        self.listeners.push(listener);
    }

    /// Signal every listener, in registration order
    pub fn notify(&mut self) {
        for listener in &mut self.listeners {
            listener.on_new_sample();
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
