//! Serial acquisition library for the LI-COR Li-850 CO2/H2O gas analyzer.
//!
//! The analyzer streams one XML-like telemetry line per measurement over a
//! USB serial link. This crate connects to it, reads and parses that stream
//! on a background task, and records valid samples to CSV through
//! `li850-store`.
//!
//! # Features
//!
//! - **Port discovery**: list serial devices, hiding on-board UARTs
//! - **Continuous reading**: bounded-shutdown background reader with a
//!   latest-sample cache
//! - **Recording**: incremental CSV with crash-safe per-row flushing
//! - **Ambient sensor**: optional SCD30 air temperature/humidity columns
//!   (`i2c` feature, Linux only)
//! - **Events**: broadcast notifications for front ends
//! - **Status**: network identity and a compact text status frame
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use li850_core::{SerialSession, SessionOptions, list_ports};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let port = list_ports().into_iter().next().ok_or("no serial port")?;
//!
//!     let mut session = SerialSession::new(SessionOptions::default());
//!     session.connect(&port, 9600, Duration::from_secs(1))?;
//!     session.set_user("alice");
//!     session.select_filename("chamber_a");
//!     session.start_recording()?;
//!
//!     tokio::time::sleep(Duration::from_secs(30)).await;
//!     println!("CO2: {:?} ppm", session.current_co2());
//!
//!     if let Some(summary) = session.stop_recording().await? {
//!         println!("{} rows in {}", summary.rows, summary.path.display());
//!     }
//!     session.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod ambient;
pub mod error;
pub mod events;
pub mod link;
pub mod mock;
pub mod network;
pub mod ports;
pub mod scd30;
pub mod session;
pub mod status;
pub mod telemetry;

pub use ambient::AmbientSensor;
pub use error::{ConnectionFailureReason, Error, Result};
pub use events::{EventDispatcher, EventReceiver, EventSender, SessionEvent};
pub use link::{SerialLink, SerialPortLink};
pub use network::NetworkIdentity;
pub use ports::{PortFilter, list_port_details, list_ports, list_ports_filtered};
pub use session::{
    DEFAULT_BAUD_RATE, DEFAULT_JOIN_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_READ_TIMEOUT,
    SerialSession, SessionOptions, SessionOptionsBuilder,
};
pub use status::{StatusFrame, StatusPublisher};
pub use telemetry::TelemetryParser;

pub use li850_store::{RecordingSummary, RecordingTarget};
pub use li850_types::{AmbientReading, ConnectionState, PortInfo, Sample};
