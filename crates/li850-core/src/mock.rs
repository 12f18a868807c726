//! Mock serial link and ambient sensor for testing.
//!
//! [`MockLink`] behaves like an analyzer on the other end of a serial cable:
//! lines pushed through its [`MockLinkHandle`] become readable input. The
//! handle stays with the test while the link itself moves into a
//! [`SerialSession`](crate::SerialSession).
//!
//! # Example
//!
//! ```
//! use li850_core::mock::MockLink;
//! use li850_core::SerialLink;
//!
//! let (mut link, handle) = MockLink::new("/dev/mock0");
//! handle.push_line("<li850><data><co2>400.0</co2></data></li850>");
//! let line = link.read_available_line().unwrap();
//! assert!(line.is_some());
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use li850_types::AmbientReading;

use crate::ambient::AmbientSensor;
use crate::error::{Error, Result};
use crate::link::SerialLink;

#[derive(Debug, Default)]
struct MockState {
    pending: VecDeque<String>,
    fail_reads: Option<String>,
    read_delay: Option<Duration>,
    clears: usize,
    lines_read: usize,
}

/// Test-side handle controlling a [`MockLink`].
#[derive(Debug, Clone, Default)]
pub struct MockLinkHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockLinkHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a line of input.
    pub fn push_line(&self, line: impl Into<String>) {
        self.lock().pending.push_back(line.into());
    }

    /// Queue several lines of input.
    pub fn push_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.lock();
        state.pending.extend(lines.into_iter().map(Into::into));
    }

    /// Make every subsequent read fail with an I/O error.
    pub fn fail_reads(&self, message: impl Into<String>) {
        self.lock().fail_reads = Some(message.into());
    }

    /// Make every read block for `delay` before returning.
    pub fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = Some(delay);
    }

    /// Lines still waiting to be read.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.lock().lines_read
    }

    /// Number of times the input buffer was cleared.
    pub fn clear_count(&self) -> usize {
        self.lock().clears
    }
}

/// In-memory [`SerialLink`].
#[derive(Debug)]
pub struct MockLink {
    name: String,
    handle: MockLinkHandle,
}

impl MockLink {
    /// Create a link and the handle that feeds it.
    pub fn new(name: impl Into<String>) -> (Self, MockLinkHandle) {
        let handle = MockLinkHandle::default();
        let link = Self {
            name: name.into(),
            handle: handle.clone(),
        };
        (link, handle)
    }

    fn check_failure(&self) -> Result<()> {
        let (fail, delay) = {
            let state = self.handle.lock();
            (state.fail_reads.clone(), state.read_delay)
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        match fail {
            Some(message) => Err(io::Error::new(io::ErrorKind::BrokenPipe, message).into()),
            None => Ok(()),
        }
    }
}

impl SerialLink for MockLink {
    fn port_name(&self) -> &str {
        &self.name
    }

    fn bytes_available(&mut self) -> Result<usize> {
        self.check_failure()?;
        Ok(self
            .handle
            .lock()
            .pending
            .front()
            .map_or(0, |line| line.len() + 1))
    }

    fn read_line(&mut self) -> Result<String> {
        self.check_failure()?;
        let mut state = self.handle.lock();
        match state.pending.pop_front() {
            Some(line) => {
                state.lines_read += 1;
                Ok(line.trim().to_string())
            }
            None => Ok(String::new()),
        }
    }

    fn clear_input(&mut self) -> Result<()> {
        let mut state = self.handle.lock();
        state.pending.clear();
        state.clears += 1;
        Ok(())
    }
}

/// Ambient sensor returning a scripted reading or failure.
#[derive(Debug, Clone)]
pub struct MockAmbient {
    reading: Option<AmbientReading>,
    reads: Arc<Mutex<usize>>,
}

impl MockAmbient {
    /// A sensor that always returns `reading`.
    pub fn fixed(reading: AmbientReading) -> Self {
        Self {
            reading: Some(reading),
            reads: Arc::default(),
        }
    }

    /// A sensor whose every read fails.
    pub fn failing() -> Self {
        Self {
            reading: None,
            reads: Arc::default(),
        }
    }

    /// Number of reads attempted, shared across clones.
    pub fn read_count(&self) -> usize {
        *self.reads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AmbientSensor for MockAmbient {
    fn read(&mut self) -> Result<AmbientReading> {
        *self.reads.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.reading
            .ok_or_else(|| Error::SensorRead("mock sensor offline".to_string()))
    }
}
