//! Platform-agnostic types for the LI-COR Li-850 CO2/H2O gas analyzer.
//!
//! This crate holds the data model shared by the serial session
//! (`li850-core`), the CSV recorder (`li850-store`) and the CLI:
//!
//! - [`Sample`]: one parsed telemetry line, optionally merged with an
//!   ambient temperature/humidity reading
//! - [`ConnectionState`]: the lifecycle of a serial session
//! - [`PortInfo`]: a serial device reported by the OS
//! - [`telemetry`]: extraction of numeric fields from the analyzer's
//!   XML-like output
//!
//! # Example
//!
//! ```
//! use li850_types::Sample;
//!
//! let sample = Sample::parse("<li850><data><co2>412.3</co2><h2o>8.91</h2o></data></li850>");
//! assert_eq!(sample.co2_ppm, Some(412.3));
//! assert!(sample.is_valid());
//! ```

pub mod telemetry;
pub mod types;

pub use telemetry::parse_telemetry;
pub use types::{AMBIENT_SENTINEL, AmbientReading, ConnectionState, PortInfo, Sample};
