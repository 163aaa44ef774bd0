//! # Ingestion Pipeline
//!
//! Turns link lines (or simulated samples) into committed history samples.
//!
//! This module handles:
//! - The pipeline state machine (`Idle` → `Connecting` → `Streaming` → `Stopped`)
//! - Opening the link off the caller's task with a one-shot completion signal
//! - The link read loop: byte assembly, decoding, commit, notification
//! - The timer-driven simulation source feeding the same commit path
//!
//! ## State Machine
//!
//! ```text
//! Idle ──connect──▶ Connecting ──open ok──▶ Streaming ──stop──▶ Stopped
//!  ▲                    │                      │
//!  └──── open failed ───┘                      │
//!  └──────────── link error / closed ──────────┘
//! ```
//!
//! `stop` is accepted in every state and always ends in `Stopped`. A stop
//! while `Connecting` lets the open finish, closes the port it produced and
//! completes the connect signal with [`ConnectOutcome::Cancelled`].
//!
//! Only one producer task runs at a time, so `HistoryStore::append` has a
//! single writer. The write lock is released before listeners are notified.

pub mod notify;
pub mod rejection;
pub mod simulation;

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::catalog::RSSI_KEY;
use crate::error::{Result, TelemetryError};
use crate::frame::decoder::FrameDecoder;
use crate::frame::line::LineAssembler;
use crate::history::{Sample, SharedHistory};
use crate::serial::{LinkOpener, SerialPortIO};
use notify::{Notifier, SampleListener};
use rejection::RejectionLog;
use simulation::SimulatedSource;

/// Bytes requested from the link per read
const READ_BUFFER_SIZE: usize = 1024;

/// Lifecycle state of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No link attached
    Idle,
    /// Link open in flight
    Connecting,
    /// Producing samples from the link or the simulation source
    Streaming,
    /// Terminal, producer released
    Stopped,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Connecting => "connecting",
            PipelineState::Streaming => "streaming",
            PipelineState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Completion of a connect request, delivered exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Link open, pipeline streaming
    Connected,
    /// Link could not be opened, pipeline back to idle
    Failed(String),
    /// Stop requested while the open was in flight
    Cancelled,
}

/// Why a link read loop ended
enum LinkEnd {
    Stopped,
    Closed,
    Failed(io::Error),
}

/// Decode and commit path shared by every producer
pub struct Ingestor {
    history: SharedHistory,
    decoder: FrameDecoder,
    notifier: Mutex<Notifier>,
    rejections: Mutex<RejectionLog>,
    committed: AtomicU64,
}

impl Ingestor {
    #[must_use]
    pub fn new(history: SharedHistory, decoder: FrameDecoder, rejections: RejectionLog) -> Self {
        Self {
            history,
            decoder,
            notifier: Mutex::new(Notifier::new()),
            rejections: Mutex::new(rejections),
            committed: AtomicU64::new(0),
        }
    }

    /// Decode one line and commit it if accepted
    ///
    /// The rssi channel takes the reading found outside the payload. Without
    /// one it keeps its latest value, except for zero-substituted frames where
    /// every channel is zero.
    ///
    /// # Returns
    ///
    /// * `bool` - True if a sample was committed, false if the line was rejected
    pub fn ingest_line(&self, line: &str) -> bool {
        let frame = match self.decoder.decode_frame(line) {
            Ok(frame) => frame,
            Err(e) => {
                self.rejection_log().record(line, &e);
                return false;
            }
        };

        let mut sample = Sample::from_positional(&frame.values, 0.0);
        let rssi = if frame.zero_filled {
            0.0
        } else {
            frame.rssi.unwrap_or_else(|| self.history.latest(RSSI_KEY))
        };
        sample.set(RSSI_KEY, rssi);

        self.commit(&sample);
        true
    }

    /// Append a complete sample to history, then notify listeners
    ///
    /// Also reports rejections suppressed in a window that has since closed.
    pub fn commit(&self, sample: &Sample) {
        self.history.write().append(sample);
        self.committed.fetch_add(1, Ordering::Relaxed);
        self.rejection_log().flush_summary();

        self.notifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .notify();
    }

    pub fn subscribe(&self, listener: Box<dyn SampleListener>) {
        self.notifier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register(listener);
    }

    /// Samples committed so far
    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    fn rejection_log(&self) -> std::sync::MutexGuard<'_, RejectionLog> {
        self.rejections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lines rejected by the decoder so far
    pub fn rejected(&self) -> u64 {
        self.rejection_log().total()
    }

    /// Rejections not yet reported in a summary
    pub fn suppressed_rejections(&self) -> u64 {
        self.rejection_log().suppressed()
    }

    /// Report any pending suppressed rejections
    pub fn finish_rejections(&self) {
        self.rejection_log().finish();
    }

    pub fn history(&self) -> &SharedHistory {
        &self.history
    }
}

/// Single-producer ingestion pipeline
pub struct IngestionPipeline {
    ingestor: Arc<Ingestor>,
    state: Arc<watch::Sender<PipelineState>>,
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl IngestionPipeline {
    /// Create an idle pipeline with the default decoder and rejection policy
    #[must_use]
    pub fn new(history: SharedHistory) -> Self {
        Self::with_config(history, FrameDecoder::default(), RejectionLog::default())
    }

    #[must_use]
    pub fn with_config(history: SharedHistory, decoder: FrameDecoder, rejections: RejectionLog) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        let (stop, _) = watch::channel(false);

        Self {
            ingestor: Arc::new(Ingestor::new(history, decoder, rejections)),
            state: Arc::new(state),
            stop,
            task: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Receiver observing every state change
    pub fn watch_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn history(&self) -> &SharedHistory {
        self.ingestor.history()
    }

    /// Register a "new sample" listener; delivery follows registration order
    pub fn subscribe(&self, listener: Box<dyn SampleListener>) {
        self.ingestor.subscribe(listener);
    }

    pub fn committed(&self) -> u64 {
        self.ingestor.committed()
    }

    pub fn rejected(&self) -> u64 {
        self.ingestor.rejected()
    }

    pub fn suppressed_rejections(&self) -> u64 {
        self.ingestor.suppressed_rejections()
    }

    fn require_idle(&self, action: &'static str) -> Result<()> {
        let state = self.state();
        if state == PipelineState::Idle {
            Ok(())
        } else {
            Err(TelemetryError::InvalidTransition {
                state: state.to_string(),
                action,
            })
        }
    }

    /// Open `endpoint` in the background and stream from it once open
    ///
    /// # Arguments
    ///
    /// * `opener` - Link opener (serial port or test double)
    /// * `endpoint` - Endpoint to open; empty lets the opener choose
    ///
    /// # Returns
    ///
    /// * `Result<oneshot::Receiver<ConnectOutcome>>` - Completes once the open
    ///   attempt is resolved
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the pipeline is idle
    pub fn connect<O: LinkOpener + 'static>(
        &mut self,
        opener: O,
        endpoint: &str,
    ) -> Result<oneshot::Receiver<ConnectOutcome>> {
        self.require_idle("connect")?;
        self.state.send_replace(PipelineState::Connecting);
        info!("Connecting to {}", display_endpoint(endpoint));

        let (done, outcome) = oneshot::channel();
        let endpoint = endpoint.to_string();
        let ingestor = self.ingestor.clone();
        let state = self.state.clone();
        let mut stop = self.stop.subscribe();

        self.task = Some(tokio::spawn(async move {
            let opened = opener.open(&endpoint).await;

            if *stop.borrow_and_update() {
                debug!("Stop requested while connecting, discarding open result");
                drop(opened);
                let _ = done.send(ConnectOutcome::Cancelled);
                return;
            }

            let port = match opened {
                Ok(port) => port,
                Err(e) => {
                    error!("{}", e);
                    state.send_replace(PipelineState::Idle);
                    let _ = done.send(ConnectOutcome::Failed(e.to_string()));
                    return;
                }
            };

            state.send_replace(PipelineState::Streaming);
            let _ = done.send(ConnectOutcome::Connected);
            info!("Streaming from {}", display_endpoint(&endpoint));

            match stream_link(port, &ingestor, &mut stop).await {
                LinkEnd::Stopped => debug!("Link reader stopped"),
                LinkEnd::Closed => {
                    warn!("Link closed by the receiver");
                    return_to_idle(&state);
                }
                LinkEnd::Failed(e) => {
                    error!("Link read error: {}", e);
                    return_to_idle(&state);
                }
            }
        }));

        Ok(outcome)
    }

    /// Feed the pipeline from a simulated source every `period`
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the pipeline is idle
    pub fn start_simulation(&mut self, mut source: SimulatedSource, period: Duration) -> Result<()> {
        self.require_idle("start simulation")?;
        self.state.send_replace(PipelineState::Streaming);
        info!("Simulation started ({:?} period)", period);

        let ingestor = self.ingestor.clone();
        let mut stop = self.stop.subscribe();

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = ticker.tick() => ingestor.commit(&source.next_sample()),
                }
            }
            debug!("Simulation stopped after {} samples", source.tick());
        }));

        Ok(())
    }

    /// Stop the producer and release the link
    ///
    /// Waits for the producer task to finish, so the port is closed on return.
    /// Calling it again is a no-op.
    pub async fn stop(&mut self) {
        self.stop.send_replace(true);

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Producer task ended abnormally: {}", e);
            }
        }

        self.ingestor.finish_rejections();

        if self.state.send_replace(PipelineState::Stopped) != PipelineState::Stopped {
            info!("Pipeline stopped after {} samples", self.committed());
        }
    }
}

fn display_endpoint(endpoint: &str) -> &str {
    if endpoint.is_empty() {
        "auto-selected port"
    } else {
        endpoint
    }
}

fn return_to_idle(state: &watch::Sender<PipelineState>) {
    state.send_if_modified(|current| {
        if *current == PipelineState::Streaming {
            *current = PipelineState::Idle;
            true
        } else {
            false
        }
    });
}

/// Read lines from an open link until stopped, closed or failed
async fn stream_link(
    mut port: Box<dyn SerialPortIO>,
    ingestor: &Ingestor,
    stop: &mut watch::Receiver<bool>,
) -> LinkEnd {
    let mut lines = LineAssembler::default();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        tokio::select! {
            _ = stop.changed() => return LinkEnd::Stopped,
            result = port.read(&mut buf) => match result {
                Ok(0) => return LinkEnd::Closed,
                Ok(n) => {
                    for line in lines.push(&buf[..n]) {
                        ingestor.ingest_line(&line);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return LinkEnd::Failed(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryStore;
    use crate::serial::port_trait::mocks::{MockOpener, MockSerialPort};
    use tokio::sync::{mpsc, Notify};
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    const SCENARIO_FRAME: &str = "LoRa data: 10.0 5.0 140.0 3.2 3.1 3.9 3.5 21.0 33.0 27.0 4 17 20.5 7.5 45.0 50.0 350.0 120.0 360.0 830.0\n";

    fn pipeline() -> IngestionPipeline {
        IngestionPipeline::new(SharedHistory::new(HistoryStore::new(5)))
    }

    /// Listener that forwards every notification to a channel
    fn notifications(pipeline: &IngestionPipeline) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        pipeline.subscribe(Box::new(move || {
            let _ = tx.send(());
        }));
        rx
    }

    async fn next_notification(rx: &mut mpsc::UnboundedReceiver<()>) {
        timeout(WAIT, rx.recv())
            .await
            .expect("Timed out waiting for a sample")
            .expect("Notifier dropped");
    }

    async fn wait_for_state(pipeline: &IngestionPipeline, wanted: PipelineState) {
        let mut rx = pipeline.watch_state();
        timeout(WAIT, rx.wait_for(|s| *s == wanted))
            .await
            .expect("Timed out waiting for state")
            .expect("State sender dropped");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PipelineState::Connecting.to_string(), "connecting");
        assert_eq!(PipelineState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_ingest_rejects_without_commit() {
        let history = SharedHistory::new(HistoryStore::new(3));
        let ingestor = Ingestor::new(history.clone(), FrameDecoder::default(), RejectionLog::default());

        assert!(!ingestor.ingest_line(""));
        assert!(!ingestor.ingest_line("boot: radio ready"));
        assert!(!ingestor.ingest_line("LoRa data: 1 2 x7"));

        assert_eq!(ingestor.committed(), 0);
        assert_eq!(ingestor.rejected(), 3);
        assert_eq!(history.series("velocity").unwrap(), vec![0.0; 3]);
    }

    #[test]
    fn test_listener_reads_history_during_notify() {
        let history = SharedHistory::new(HistoryStore::new(3));
        let ingestor = Ingestor::new(history.clone(), FrameDecoder::default(), RejectionLog::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let reader = history.clone();
        let sink = seen.clone();
        ingestor.subscribe(Box::new(move || {
            sink.lock().unwrap().push(reader.latest("battery_volt"));
        }));

        assert!(ingestor.ingest_line("LoRa data: 1 2 131"));
        assert!(ingestor.ingest_line("LoRa data: 1 2 130"));
        assert_eq!(*seen.lock().unwrap(), vec![131.0, 130.0]);
    }

    #[test]
    fn test_commit_reports_closed_rejection_window() {
        let history = SharedHistory::new(HistoryStore::new(3));
        let ingestor = Ingestor::new(
            history,
            FrameDecoder::default(),
            RejectionLog::new(1, Duration::from_millis(1)),
        );

        assert!(!ingestor.ingest_line("noise"));
        assert!(!ingestor.ingest_line("noise"));
        assert!(!ingestor.ingest_line("noise"));
        let pending = ingestor.suppressed_rejections();

        std::thread::sleep(Duration::from_millis(5));
        assert!(ingestor.ingest_line("LoRa data: 1 2 3"));

        assert!(pending <= 2);
        assert_eq!(ingestor.suppressed_rejections(), 0);
        assert_eq!(ingestor.rejected(), 3);
    }

    #[test]
    fn test_rssi_from_frame_then_carried_forward() {
        let history = SharedHistory::new(HistoryStore::new(3));
        let ingestor = Ingestor::new(history.clone(), FrameDecoder::default(), RejectionLog::default());

        ingestor.ingest_line("Received packet '1 2 3' with RSSI -61");
        assert_eq!(history.latest(RSSI_KEY), -61.0);

        ingestor.ingest_line("LoRa data: 4 5 6");
        assert_eq!(history.latest(RSSI_KEY), -61.0);
        assert_eq!(history.latest("velocity"), 4.0);

        ingestor.ingest_line("'4 1.2.3 6'");
        assert_eq!(history.latest(RSSI_KEY), 0.0);
    }

    #[tokio::test]
    async fn test_scenario_frame_is_committed() {
        let port = MockSerialPort::new(true);
        let handle = port.handle();
        port.push_data(SCENARIO_FRAME.as_bytes());

        let mut pipeline = pipeline();
        let mut rx = notifications(&pipeline);

        let outcome = pipeline.connect(MockOpener::with_port(port), "/dev/ttyUSB0").unwrap();
        assert_eq!(outcome.await.unwrap(), ConnectOutcome::Connected);
        next_notification(&mut rx).await;

        let history = pipeline.history();
        assert_eq!(history.latest("velocity"), 10.0);
        assert_eq!(history.latest("distance_travelled"), 5.0);
        assert_eq!(history.latest("battery_volt"), 140.0);
        assert_eq!(history.latest("MPPT_total_watt"), 830.0);
        assert_eq!(history.latest(RSSI_KEY), 0.0);
        assert_eq!(history.series("velocity").unwrap().len(), 5);
        assert_eq!(pipeline.state(), PipelineState::Streaming);

        pipeline.stop().await;
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        assert!(handle.was_dropped());
    }

    #[tokio::test]
    async fn test_frame_split_across_reads() {
        let port = MockSerialPort::new(true);
        let (head, tail) = SCENARIO_FRAME.split_at(23);
        port.push_data(head.as_bytes());
        port.push_data(tail.as_bytes());

        let mut pipeline = pipeline();
        let mut rx = notifications(&pipeline);
        pipeline.connect(MockOpener::with_port(port), "COM3").unwrap();
        next_notification(&mut rx).await;

        assert_eq!(pipeline.committed(), 1);
        assert_eq!(pipeline.history().latest("battery_volt"), 140.0);
        pipeline.stop().await;
    }

    #[tokio::test]
    async fn test_zero_frame_is_still_committed() {
        let mut pipeline = pipeline();
        let mut warm = Sample::zeroed();
        warm.set("velocity", 7.0);
        pipeline.history().write().append(&warm);

        let port = MockSerialPort::new(true);
        let mut tokens = vec!["1.0"; 20];
        tokens[1] = "1.2.3";
        port.push_data(format!("'{}'\n", tokens.join(" ")).as_bytes());

        let mut rx = notifications(&pipeline);
        pipeline.connect(MockOpener::with_port(port), "COM3").unwrap();
        next_notification(&mut rx).await;

        let history = pipeline.history();
        assert_eq!(history.latest_sample(), Sample::zeroed());
        assert_eq!(history.series("velocity").unwrap(), vec![0.0, 0.0, 0.0, 7.0, 0.0]);
        pipeline.stop().await;
    }

    #[tokio::test]
    async fn test_rejected_lines_do_not_stop_stream() {
        let port = MockSerialPort::new(true);
        port.push_data(b"garbage\n");
        port.push_data(b"LoRa data: 1 2 \x01\x02\n");
        port.push_data(b"LoRa data: 1 2 3\n");

        let mut pipeline = pipeline();
        let mut rx = notifications(&pipeline);
        pipeline.connect(MockOpener::with_port(port), "COM3").unwrap();
        next_notification(&mut rx).await;

        assert_eq!(pipeline.committed(), 1);
        assert_eq!(pipeline.rejected(), 2);
        assert_eq!(pipeline.history().latest("velocity"), 1.0);
        assert_eq!(pipeline.state(), PipelineState::Streaming);
        pipeline.stop().await;
    }

    #[tokio::test]
    async fn test_invalid_utf8_frame_is_rejected() {
        let port = MockSerialPort::new(true);
        port.push_data(b"LoRa data: 12.5 7\xff 140\n");
        port.push_data(b"LoRa data: 12.5 7 140\n");

        let mut pipeline = pipeline();
        let mut rx = notifications(&pipeline);
        pipeline.connect(MockOpener::with_port(port), "COM3").unwrap();
        next_notification(&mut rx).await;

        assert_eq!(pipeline.committed(), 1);
        assert_eq!(pipeline.rejected(), 1);
        assert_eq!(pipeline.history().series("distance_travelled").unwrap(), vec![0.0, 0.0, 0.0, 0.0, 7.0]);
        pipeline.stop().await;
    }

    #[tokio::test]
    async fn test_stop_reports_suppressed_rejections() {
        let port = MockSerialPort::new(true);
        port.push_data(b"garbage\ngarbage\ngarbage\n");
        port.push_data(b"LoRa data: 1 2 3\n");

        let mut pipeline = IngestionPipeline::with_config(
            SharedHistory::new(HistoryStore::new(5)),
            FrameDecoder::default(),
            RejectionLog::new(1, Duration::from_secs(3600)),
        );
        let mut rx = notifications(&pipeline);
        pipeline.connect(MockOpener::with_port(port), "COM3").unwrap();
        next_notification(&mut rx).await;

        assert_eq!(pipeline.suppressed_rejections(), 2);
        pipeline.stop().await;
        assert_eq!(pipeline.suppressed_rejections(), 0);
        assert_eq!(pipeline.rejected(), 3);
    }

    #[tokio::test]
    async fn test_link_error_returns_to_idle() {
        let port = MockSerialPort::new(true);
        let handle = port.handle();
        port.push_data(b"LoRa data: 1 2 3\n");
        port.push_error(io::ErrorKind::BrokenPipe);

        let mut pipeline = pipeline();
        let outcome = pipeline.connect(MockOpener::with_port(port), "COM3").unwrap();
        assert_eq!(outcome.await.unwrap(), ConnectOutcome::Connected);

        wait_for_state(&pipeline, PipelineState::Idle).await;
        assert_eq!(pipeline.committed(), 1);
        assert!(handle.was_dropped());

        // Operator reselects the endpoint
        let port = MockSerialPort::new(true);
        let outcome = pipeline.connect(MockOpener::with_port(port), "COM4").unwrap();
        assert_eq!(outcome.await.unwrap(), ConnectOutcome::Connected);
        pipeline.stop().await;
    }

    #[tokio::test]
    async fn test_link_closed_returns_to_idle() {
        let port = MockSerialPort::new(false);
        let mut pipeline = pipeline();
        pipeline.connect(MockOpener::with_port(port), "COM3").unwrap();

        wait_for_state(&pipeline, PipelineState::Idle).await;
        assert_eq!(pipeline.committed(), 0);
    }

    #[tokio::test]
    async fn test_open_failure_reports_once_and_idles() {
        let opener = MockOpener::failing("Access is denied");
        let opened = opener.opened_endpoint.clone();

        let mut pipeline = pipeline();
        let outcome = pipeline.connect(opener, "COM9").unwrap();

        match outcome.await.unwrap() {
            ConnectOutcome::Failed(reason) => {
                assert!(reason.contains("COM9"));
                assert!(reason.contains("Access is denied"));
            }
            other => panic!("Expected Failed outcome, got: {:?}", other),
        }
        wait_for_state(&pipeline, PipelineState::Idle).await;
        assert_eq!(opened.lock().unwrap().as_deref(), Some("COM9"));
    }

    #[tokio::test]
    async fn test_connect_requires_idle() {
        let gate = Arc::new(Notify::new());
        let opener = MockOpener::with_port(MockSerialPort::new(true)).gated(gate.clone());

        let mut pipeline = pipeline();
        let _outcome = pipeline.connect(opener, "COM3").unwrap();
        assert_eq!(pipeline.state(), PipelineState::Connecting);

        match pipeline.connect(MockOpener::failing("unused"), "COM4") {
            Err(TelemetryError::InvalidTransition { state, action }) => {
                assert_eq!(state, "connecting");
                assert_eq!(action, "connect");
            }
            other => panic!("Expected InvalidTransition error, got: {:?}", other.map(|_| ())),
        }

        gate.notify_one();
        pipeline.stop().await;
    }

    #[tokio::test]
    async fn test_stop_while_connecting_cancels() {
        let port = MockSerialPort::new(true);
        let handle = port.handle();
        let gate = Arc::new(Notify::new());

        let mut pipeline = pipeline();
        let outcome = pipeline
            .connect(MockOpener::with_port(port).gated(gate.clone()), "COM3")
            .unwrap();
        assert_eq!(pipeline.state(), PipelineState::Connecting);

        tokio::join!(pipeline.stop(), async { gate.notify_one() });

        assert_eq!(outcome.await.unwrap(), ConnectOutcome::Cancelled);
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        assert!(handle.was_dropped());
    }

    #[tokio::test]
    async fn test_stop_is_terminal() {
        let mut pipeline = pipeline();
        pipeline.stop().await;
        pipeline.stop().await;
        assert_eq!(pipeline.state(), PipelineState::Stopped);

        assert!(pipeline
            .connect(MockOpener::with_port(MockSerialPort::new(true)), "COM3")
            .is_err());
        assert!(pipeline
            .start_simulation(SimulatedSource::new(), Duration::from_secs(1))
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulation_feeds_history() {
        let mut pipeline = pipeline();
        let mut rx = notifications(&pipeline);

        pipeline
            .start_simulation(SimulatedSource::new(), Duration::from_secs(1))
            .unwrap();
        assert_eq!(pipeline.state(), PipelineState::Streaming);

        for _ in 0..3 {
            next_notification(&mut rx).await;
        }
        pipeline.stop().await;

        let committed = pipeline.committed();
        assert!(committed >= 3);
        let mut expected = SimulatedSource::new();
        let velocity = pipeline.history().series("velocity").unwrap();
        let first = expected.next_sample().get("velocity").unwrap();
        let second = expected.next_sample().get("velocity").unwrap();
        assert_eq!(first, 0.0);
        assert!(velocity.contains(&second));
        assert_eq!(pipeline.state(), PipelineState::Stopped);
    }
}
