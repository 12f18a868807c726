//! The serial session: connection, background reading and recording.
//!
//! A [`SerialSession`] owns at most one open port. Once
//! [started](SerialSession::start_continuous_reading), a blocking reader
//! task polls the port every [`SessionOptions::poll_interval`], parses
//! each line, updates the latest-sample cache and, while recording, appends
//! valid samples to the CSV recording.
//!
//! ```ignore
//! let mut session = SerialSession::new(SessionOptions::default());
//! session.connect("/dev/ttyACM0", 9600, Duration::from_secs(1))?;
//! session.select_filename("chamber_a");
//! session.start_recording()?;
//! tokio::time::sleep(Duration::from_secs(60)).await;
//! let summary = session.stop_recording().await?;
//! ```
//!
//! The reader never blocks shutdown for longer than
//! [`SessionOptions::join_timeout`]; after that it is abandoned and exits on
//! its next poll.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use li850_store::{Recorder, RecordingSummary, RecordingTarget};
use li850_types::{ConnectionState, Sample};

use crate::ambient::AmbientSensor;
use crate::error::{Error, Result};
use crate::events::{EventDispatcher, EventReceiver, SessionEvent};
use crate::link::{SerialLink, SerialPortLink};
use crate::telemetry::TelemetryParser;

/// Analyzer factory default baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// Per-read timeout on the serial port.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);
/// Reader polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Upper bound on waiting for the reader to exit.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Options for a [`SerialSession`].
///
/// ```ignore
/// let options = SessionOptions::builder()
///     .baud_rate(19200)
///     .join_timeout(Duration::from_secs(2))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Default: 9600.
    pub baud_rate: u32,
    /// Default: 1 second.
    pub read_timeout: Duration,
    /// Default: 100 ms.
    pub poll_interval: Duration,
    /// Default: 10 seconds.
    pub join_timeout: Duration,
    /// Directory recordings are written into. Default: `./data`.
    pub data_dir: PathBuf,
    /// Capacity of the event channel. Default: 100.
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            data_dir: li850_store::default_data_dir(),
            event_capacity: 100,
        }
    }
}

impl SessionOptions {
    /// Create a new builder for SessionOptions.
    pub fn builder() -> SessionOptionsBuilder {
        SessionOptionsBuilder::default()
    }

    /// Validate the options and return an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(Error::invalid_config("baud_rate must be > 0"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::invalid_config("poll_interval must be > 0"));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::invalid_config("read_timeout must be > 0"));
        }
        if self.event_capacity == 0 {
            return Err(Error::invalid_config("event_capacity must be > 0"));
        }
        Ok(())
    }
}

/// Builder for SessionOptions.
#[derive(Debug, Clone, Default)]
pub struct SessionOptionsBuilder {
    options: SessionOptions,
}

impl SessionOptionsBuilder {
    #[must_use]
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.options.baud_rate = baud_rate;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.options.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.options.join_timeout = timeout;
        self
    }

    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.data_dir = dir.into();
        self
    }

    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.options.event_capacity = capacity;
        self
    }

    /// Build the SessionOptions.
    #[must_use]
    pub fn build(self) -> SessionOptions {
        self.options
    }
}

type SharedLink = Arc<Mutex<Box<dyn SerialLink>>>;

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the session and its reader.
struct Shared {
    parser: Mutex<TelemetryParser>,
    recorder: Mutex<Recorder>,
    recording: AtomicBool,
    /// Set when the reader exits on a read error; cleared by `attach`.
    reader_failed: AtomicBool,
    latest: Mutex<Option<Sample>>,
    last_error: Mutex<Option<String>>,
    events: EventDispatcher,
}

impl Shared {
    fn ingest(&self, line: &str) {
        trace!("Received: {}", line);
        let sample = lock(&self.parser).parse(line);
        *lock(&self.latest) = Some(sample);

        {
            // The flag is checked under the recorder lock so that a stop
            // cannot finalize between the check and the append.
            let mut recorder = lock(&self.recorder);
            if self.recording.load(Ordering::SeqCst) {
                match recorder.record(&sample) {
                    Ok(Some(index)) => debug!("Recorded row {}", index),
                    Ok(None) => debug!("Skipped sample without CO2/H2O"),
                    Err(e) => error!("Failed to write sample: {}", e),
                }
            }
        }

        self.events.send(SessionEvent::Sample { sample });
    }
}

/// How the reader task ended.
#[derive(Debug)]
enum ReaderExit {
    Cancelled,
    ReadError(String),
}

struct Reader {
    handle: JoinHandle<ReaderExit>,
    cancel: CancellationToken,
}

impl Reader {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

fn run_reader(
    port: String,
    link: SharedLink,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    poll_interval: Duration,
) -> ReaderExit {
    debug!("Reader started on {}", port);
    loop {
        if cancel.is_cancelled() {
            debug!("Reader on {} cancelled", port);
            return ReaderExit::Cancelled;
        }

        let line = lock(&link).read_available_line();
        match line {
            Ok(Some(line)) if !line.is_empty() => shared.ingest(&line),
            Ok(_) => {}
            Err(e) => {
                error!("Error in continuous read on {}: {}", port, e);
                let message = e.to_string();
                shared.recording.store(false, Ordering::SeqCst);
                shared.reader_failed.store(true, Ordering::SeqCst);
                *lock(&shared.last_error) = Some(message.clone());
                shared.events.send(SessionEvent::ReadError {
                    port,
                    error: message.clone(),
                });
                return ReaderExit::ReadError(message);
            }
        }

        std::thread::sleep(poll_interval);
    }
}

/// A connection to one Li-850 analyzer.
///
/// Methods that start the reader must be called from within a Tokio
/// runtime.
pub struct SerialSession {
    options: SessionOptions,
    port: Option<String>,
    link: Option<SharedLink>,
    reader: Option<Reader>,
    shared: Arc<Shared>,
    target: Option<RecordingTarget>,
    user: String,
}

impl Default for SerialSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl std::fmt::Debug for SerialSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSession")
            .field("port", &self.port)
            .field("state", &self.state())
            .field("target", &self.target)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl SerialSession {
    pub fn new(options: SessionOptions) -> Self {
        let events = EventDispatcher::new(options.event_capacity.max(1));
        Self {
            options,
            port: None,
            link: None,
            reader: None,
            shared: Arc::new(Shared {
                parser: Mutex::new(TelemetryParser::new()),
                recorder: Mutex::new(Recorder::new()),
                recording: AtomicBool::new(false),
                reader_failed: AtomicBool::new(false),
                latest: Mutex::new(None),
                last_error: Mutex::new(None),
                events,
            }),
            target: None,
            user: String::new(),
        }
    }

    /// Augment every sample with readings from `sensor`.
    #[must_use]
    pub fn with_ambient(self, sensor: Box<dyn AmbientSensor>) -> Self {
        lock(&self.shared.parser).set_ambient(sensor);
        self
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Device identifier of the open port.
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        if self.link.is_none() {
            ConnectionState::Disconnected
        } else if self.is_reading() {
            if self.shared.recording.load(Ordering::SeqCst) {
                ConnectionState::Recording
            } else {
                ConnectionState::Reading
            }
        } else {
            ConnectionState::Connected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Whether the reader task is alive.
    pub fn is_reading(&self) -> bool {
        self.reader.as_ref().is_some_and(Reader::is_running)
    }

    pub fn is_recording(&self) -> bool {
        self.state().is_recording()
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> EventReceiver {
        self.shared.events.subscribe()
    }

    /// Open `device_id` with 8N1 framing.
    ///
    /// Fails with [`Error::AlreadyConnected`] if a port is open, or
    /// [`Error::ConnectionFailed`] if the device cannot be opened; the
    /// session then stays disconnected.
    pub fn connect(&mut self, device_id: &str, baud_rate: u32, timeout: Duration) -> Result<()> {
        if let Some(port) = &self.port {
            return Err(Error::AlreadyConnected(port.clone()));
        }
        let link = SerialPortLink::open(device_id, baud_rate, timeout).inspect_err(|e| {
            warn!("{}", e);
        })?;
        self.attach(Box::new(link))
    }

    /// Use an already-open link, e.g. a [`MockLink`](crate::mock::MockLink).
    pub fn attach(&mut self, link: Box<dyn SerialLink>) -> Result<()> {
        if let Some(port) = &self.port {
            return Err(Error::AlreadyConnected(port.clone()));
        }
        let port = link.port_name().to_string();
        info!("Connected to {}", port);

        *lock(&self.shared.latest) = None;
        *lock(&self.shared.last_error) = None;
        self.shared.reader_failed.store(false, Ordering::SeqCst);
        self.link = Some(Arc::new(Mutex::new(link)));
        self.port = Some(port.clone());
        self.shared.events.send(SessionEvent::Connected { port });
        Ok(())
    }

    /// Read one line without blocking, outside the reader.
    ///
    /// Returns `None` when disconnected, when no input is waiting, or when the
    /// read fails (the failure is logged). While the reader is running it
    /// competes for the same lines.
    pub fn read_available_line(&self) -> Option<String> {
        let Some(link) = &self.link else {
            warn!("Serial port not connected");
            return None;
        };
        match lock(link).read_available_line() {
            Ok(line) => line,
            Err(e) => {
                warn!("Read failed: {}", e);
                None
            }
        }
    }

    /// Start the background reader.
    ///
    /// Returns `false` without side effects when not connected, already
    /// reading, or after a read error ended the previous reader (the port has
    /// to be disconnected and reconnected first). Input buffered before the
    /// call is discarded.
    pub fn start_continuous_reading(&mut self) -> bool {
        let Some(link) = &self.link else {
            warn!("Serial port not connected");
            return false;
        };
        let port = self.port.clone().unwrap_or_default();
        if self.reader_failed() {
            warn!("Reading on {} failed; reconnect before reading again", port);
            return false;
        }
        if self.is_reading() {
            warn!("Already reading continuously");
            return false;
        }

        if let Err(e) = lock(link).clear_input() {
            error!("Failed to clear input buffer on {}: {}", port, e);
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::task::spawn_blocking({
            let port = port.clone();
            let link = Arc::clone(link);
            let shared = Arc::clone(&self.shared);
            let cancel = cancel.clone();
            let poll_interval = self.options.poll_interval;
            move || run_reader(port, link, shared, cancel, poll_interval)
        });
        self.reader = Some(Reader { handle, cancel });

        info!("Started continuous reading on {}", port);
        self.shared
            .events
            .send(SessionEvent::ReadingStarted { port });
        true
    }

    /// Stop the reader and close any open recording.
    ///
    /// Idempotent. Waits at most [`SessionOptions::join_timeout`] for the
    /// reader; if it does not exit in time a warning is logged and shutdown
    /// proceeds. Returns the summary of the recording that was closed, if
    /// any rows were written.
    pub async fn stop_continuous_reading(&mut self) -> Result<Option<RecordingSummary>> {
        self.shared.recording.store(false, Ordering::SeqCst);

        if let Some(reader) = self.reader.take() {
            reader.cancel.cancel();
            let join_timeout = self.options.join_timeout;
            match tokio::time::timeout(join_timeout, reader.handle).await {
                Ok(Ok(ReaderExit::Cancelled)) => debug!("Reader exited"),
                Ok(Ok(ReaderExit::ReadError(e))) => debug!("Reader had exited on error: {}", e),
                Ok(Err(e)) => warn!("Reader task failed: {}", e),
                Err(_) => warn!(
                    "{}; continuing shutdown",
                    Error::timeout("reader shutdown", join_timeout)
                ),
            }
            let port = self.port.clone().unwrap_or_default();
            info!("Stopped continuous reading on {}", port);
            self.shared
                .events
                .send(SessionEvent::ReadingStopped { port });
        }

        let summary = lock(&self.shared.recorder).finalize()?;
        if let Some(summary) = &summary {
            info!(
                "Recording closed: {} rows in {}",
                summary.rows,
                summary.path.display()
            );
            self.shared.events.send(SessionEvent::RecordingFinalized {
                summary: summary.clone(),
            });
        }
        Ok(summary)
    }

    /// Stop reading and close the port.
    ///
    /// Idempotent; returns the summary of a recording closed on the way.
    pub async fn disconnect(&mut self) -> Result<Option<RecordingSummary>> {
        let summary = self.stop_continuous_reading().await;
        if let Some(port) = self.port.take() {
            self.link = None;
            info!("Disconnected from {}", port);
            self.shared
                .events
                .send(SessionEvent::Disconnected { port });
        }
        *lock(&self.shared.latest) = None;
        summary
    }

    /// Choose the recording file for `base`, timestamped with the current
    /// local minute. An empty base falls back to
    /// [`DEFAULT_BASE_NAME`](li850_store::DEFAULT_BASE_NAME).
    pub fn select_filename(&mut self, base: &str) -> &RecordingTarget {
        let target = RecordingTarget::new(base, self.options.data_dir.clone());
        info!("Selected recording file {}", target.path().display());
        self.target.insert(target)
    }

    pub fn target(&self) -> Option<&RecordingTarget> {
        self.target.as_ref()
    }

    /// Operator label written into every recorded row.
    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = user.into();
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Begin persisting valid samples, starting the reader if needed.
    ///
    /// Returns the path being written.
    pub fn start_recording(&mut self) -> Result<PathBuf> {
        if self.link.is_none() {
            return Err(Error::NotConnected);
        }
        let path = self.target.as_ref().ok_or(Error::NoFilename)?.path();
        if self.is_recording() {
            return Err(Error::AlreadyRecording);
        }
        if self.reader_failed() {
            return Err(Error::ReconnectRequired(
                self.last_error().unwrap_or_default(),
            ));
        }

        let leftover = {
            let mut recorder = lock(&self.shared.recorder);
            let leftover = recorder.finalize()?;
            recorder.begin(path.clone(), self.user.clone());
            self.shared.recording.store(true, Ordering::SeqCst);
            leftover
        };
        if let Some(summary) = leftover {
            info!("Closed leftover recording {}", summary.path.display());
            self.shared
                .events
                .send(SessionEvent::RecordingFinalized { summary });
        }

        if !self.is_reading() && !self.start_continuous_reading() {
            self.shared.recording.store(false, Ordering::SeqCst);
            return Err(Error::ReaderNotStarted);
        }

        info!("Recording to {}", path.display());
        self.shared
            .events
            .send(SessionEvent::RecordingStarted { path: path.clone() });
        Ok(path)
    }

    /// Stop recording.
    ///
    /// This also stops the reader. The target is re-stamped with the current
    /// minute so the next recording gets a fresh file name.
    pub async fn stop_recording(&mut self) -> Result<Option<RecordingSummary>> {
        let summary = self.stop_continuous_reading().await;
        if let Some(target) = &mut self.target {
            target.refresh();
        }
        summary
    }

    /// CO2 of the most recent sample, if it carried one.
    pub fn current_co2(&self) -> Option<f64> {
        let latest = *lock(&self.shared.latest);
        latest.and_then(|s| s.co2_ppm)
    }

    pub fn latest_sample(&self) -> Option<Sample> {
        *lock(&self.shared.latest)
    }

    /// `(elapsed_time, CO2)` of every row in the current recording.
    pub fn recording_series(&self) -> Vec<(f64, f64)> {
        lock(&self.shared.recorder).series()
    }

    /// Rows written in the current recording.
    pub fn recorded_rows(&self) -> usize {
        lock(&self.shared.recorder).len()
    }

    /// Whether the reader exited on a read error since the last connect.
    pub fn reader_failed(&self) -> bool {
        self.shared.reader_failed.load(Ordering::SeqCst)
    }

    /// Message of the read error that ended the last reader, if any.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.shared.last_error).clone()
    }
}

impl Drop for SerialSession {
    fn drop(&mut self) {
        self.shared.recording.store(false, Ordering::SeqCst);
        if let Some(reader) = self.reader.take() {
            reader.cancel.cancel();
        }
        if let Err(e) = lock(&self.shared.recorder).finalize() {
            warn!("Failed to close recording on drop: {}", e);
        }
    }
}
