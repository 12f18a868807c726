//! Error types for li850-core.
//!
//! # Failure classes
//!
//! | Error | Effect on the session |
//! |-------|-----------------------|
//! | [`Error::ConnectionFailed`] | Reported to the caller, session stays disconnected |
//! | [`Error::Io`] during a read | Logged by the reader, which exits; reconnect required |
//!| [`Error::ReconnectRequired`] | Returned by `start_recording` until the port is reopened |
//! | [`Error::SensorRead`] | Never surfaces from a session; the ambient columns get `9999` |
//! | [`Error::Store`] | Returned when finalizing a recording fails |
//!
//! A tag missing from a telemetry line is not an error: the field is simply
//! absent from the [`Sample`](li850_types::Sample).

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the analyzer.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Opening the serial port failed.
    #[error("Failed to connect to {device_id}: {reason}")]
    ConnectionFailed {
        /// The device that failed to open.
        device_id: String,
        /// The structured reason for the failure.
        reason: ConnectionFailureReason,
    },

    /// Operation requires an open serial port.
    #[error("Serial port not connected")]
    NotConnected,

    /// A port is already open on this session.
    #[error("Already connected to {0}")]
    AlreadyConnected(String),

    /// A recording is already in progress.
    #[error("Already recording")]
    AlreadyRecording,

    /// Recording requested before a filename was selected.
    #[error("No filename selected")]
    NoFilename,

    /// The background reader could not be started.
    #[error("Continuous reading could not be started")]
    ReaderNotStarted,

    /// The reader exited on a read error; the port must be reopened.
    #[error("Reading failed ({0}); disconnect and reconnect first")]
    ReconnectRequired(String),

    /// Auxiliary ambient sensor failure.
    #[error("Ambient sensor read failed: {0}")]
    SensorRead(String),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Recording persistence error.
    #[error(transparent)]
    Store(#[from] li850_store::Error),

    /// I/O error, typically a failed serial read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Structured reasons for connection failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// The device does not exist or was unplugged.
    DeviceAbsent,
    /// The process lacks permission to open the device.
    PermissionDenied,
    /// The port rejected the requested settings.
    InvalidSettings(String),
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeviceAbsent => write!(f, "device not found"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::InvalidSettings(msg) => write!(f, "invalid port settings: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<&serialport::Error> for ConnectionFailureReason {
    fn from(err: &serialport::Error) -> Self {
        match err.kind() {
            serialport::ErrorKind::NoDevice => Self::DeviceAbsent,
            serialport::ErrorKind::InvalidInput => Self::InvalidSettings(err.description.clone()),
            serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => Self::DeviceAbsent,
            serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                Self::PermissionDenied
            }
            _ => Self::Other(err.description.clone()),
        }
    }
}

impl Error {
    /// Create a connection failure for a device.
    pub fn connection_failed(device_id: impl Into<String>, reason: ConnectionFailureReason) -> Self {
        Self::ConnectionFailed {
            device_id: device_id.into(),
            reason,
        }
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type alias using li850-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
