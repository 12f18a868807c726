//! Incremental CSV recording for Li-850 samples.
//!
//! A [`Recorder`] accumulates valid samples for one recording session and
//! writes every row to disk as soon as it arrives, so an interrupted session
//! loses at most the sample being written. Files are named by
//! [`RecordingTarget`] as `<data_dir>/<base>_YYYY_MM_DD_HH_MM.csv`.
//!
//! # File format
//!
//! ```text
//! rcrd_nb,elapsed_time,CO2_ppm,H2O,Cell_pressure,Cell_temp,user
//! 0,0.0,400.0,1.2,98.1,51.2,alice
//! 1,1.001,410.5,1.3,98.1,51.2,alice
//! ```
//!
//! When an ambient sensor is attached, `Air_temp` and `Air_RH` columns are
//! inserted before `user`; a failed ambient read is written as `9999`.
//!
//! # Example
//!
//! ```no_run
//! use li850_store::{Recorder, RecordingTarget};
//! use li850_types::Sample;
//!
//! let target = RecordingTarget::new("chamber", "data");
//! let mut recorder = Recorder::new();
//! recorder.begin(target.path(), "alice");
//! recorder.record(&Sample::parse("<co2>400.0</co2><h2o>1.2</h2o>"))?;
//! let summary = recorder.finalize()?;
//! # Ok::<(), li850_store::Error>(())
//! ```

mod error;
mod filename;
mod models;
mod reader;
mod recorder;

pub use error::{Error, Result};
pub use filename::{DEFAULT_BASE_NAME, RecordingTarget, timestamp_suffix};
pub use models::{RecordRow, RecordingStats, RecordingSummary};
pub use reader::{read_recording, recording_stats};
pub use recorder::Recorder;

/// Default directory for recordings, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default data directory as a path.
pub fn default_data_dir() -> std::path::PathBuf {
    std::path::PathBuf::from(DEFAULT_DATA_DIR)
}
