//! Row and summary models for recordings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use li850_types::{AmbientReading, Sample};

/// One persisted CSV row.
///
/// Column names are fixed; downstream analysis scripts read them by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRow {
    /// Record number, 0 for the first sample of a recording.
    pub rcrd_nb: usize,
    /// Seconds since the first sample of the recording.
    pub elapsed_time: f64,
    #[serde(rename = "CO2_ppm")]
    pub co2_ppm: f64,
    #[serde(rename = "H2O")]
    pub h2o: f64,
    #[serde(rename = "Cell_pressure")]
    pub cell_pressure: Option<f64>,
    #[serde(rename = "Cell_temp")]
    pub cell_temp: Option<f64>,
    #[serde(rename = "Air_temp", default, skip_serializing_if = "Option::is_none")]
    pub air_temp: Option<f64>,
    #[serde(rename = "Air_RH", default, skip_serializing_if = "Option::is_none")]
    pub air_rel_humidity: Option<f64>,
    pub user: String,
}

impl RecordRow {
    /// Build a row from a valid sample. Returns `None` if CO2 or H2O is missing.
    ///
    /// `ambient` selects whether the ambient columns are emitted; a sample
    /// without an ambient reading then gets the sentinel values.
    pub fn from_sample(
        rcrd_nb: usize,
        elapsed_time: f64,
        sample: &Sample,
        user: &str,
        ambient: bool,
    ) -> Option<Self> {
        let (co2_ppm, h2o) = match (sample.co2_ppm, sample.h2o) {
            (Some(co2), Some(h2o)) => (co2, h2o),
            _ => return None,
        };
        let air = if ambient {
            Some(sample.ambient.unwrap_or(AmbientReading::UNAVAILABLE))
        } else {
            None
        };

        Some(Self {
            rcrd_nb,
            elapsed_time,
            co2_ppm,
            h2o,
            cell_pressure: sample.cell_pressure,
            cell_temp: sample.cell_temp,
            air_temp: air.map(|a| a.air_temp),
            air_rel_humidity: air.map(|a| a.air_rel_humidity),
            user: user.to_string(),
        })
    }
}

/// Result of finalizing a recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingSummary {
    /// File the recording was written to.
    pub path: PathBuf,
    /// Number of rows written.
    pub rows: usize,
    /// Elapsed time of the last row, in seconds.
    pub duration_secs: f64,
}

/// Aggregate statistics of a persisted recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingStats {
    pub rows: usize,
    pub duration_secs: f64,
    pub co2_min: Option<f64>,
    pub co2_mean: Option<f64>,
    pub co2_max: Option<f64>,
    pub h2o_mean: Option<f64>,
    /// Distinct user labels in order of first appearance.
    pub users: Vec<String>,
    /// Whether the file carries ambient columns.
    pub has_ambient: bool,
    /// Rows where the ambient sensor read failed.
    pub ambient_failures: usize,
}
