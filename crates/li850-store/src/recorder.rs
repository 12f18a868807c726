//! The recording buffer.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use li850_types::Sample;

use crate::error::{Error, Result};
use crate::models::{RecordRow, RecordingSummary};

/// Accumulates valid samples of one recording and persists them to CSV.
///
/// The first valid sample after [`begin`](Self::begin) or
/// [`finalize`](Self::finalize) sets the elapsed-time origin and becomes
/// record 0. Each following valid sample gets the next index and is flushed
/// to disk before [`record`](Self::record) returns. Invalid samples (no CO2 or
/// no H2O) are dropped without consuming an index.
#[derive(Debug, Default)]
pub struct Recorder {
    target: Option<PathBuf>,
    user: String,
    writer: Option<csv::Writer<File>>,
    rows: Vec<RecordRow>,
    origin: Option<Instant>,
    ambient: bool,
}

impl Recorder {
    /// Create an idle recorder with no target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the recorder at a file and user label for the next recording.
    ///
    /// Any rows of a previous recording that was not finalized are discarded
    /// from memory; they were already flushed to their own file.
    pub fn begin(&mut self, target: impl Into<PathBuf>, user: impl Into<String>) {
        if !self.rows.is_empty() {
            warn!(
                "Starting a new recording with {} unfinalized rows pending",
                self.rows.len()
            );
        }
        self.reset();
        self.target = Some(target.into());
        self.user = user.into();
    }

    /// Record a sample stamped with the current instant.
    pub fn record(&mut self, sample: &Sample) -> Result<Option<usize>> {
        self.record_at(sample, Instant::now())
    }

    /// Record a sample stamped with `at`.
    ///
    /// Returns the record index, or `None` if the sample was invalid. The row
    /// is kept in memory even when the write fails, so that
    /// [`finalize`](Self::finalize) can rewrite the whole file.
    pub fn record_at(&mut self, sample: &Sample, at: Instant) -> Result<Option<usize>> {
        if !sample.is_valid() {
            return Ok(None);
        }
        let Some(target) = self.target.clone() else {
            return Err(Error::NoTarget);
        };

        let origin = match self.origin {
            Some(origin) => origin,
            None => {
                self.ambient = sample.ambient.is_some();
                self.origin = Some(at);
                at
            }
        };
        let elapsed = at.saturating_duration_since(origin).as_secs_f64();
        let index = self.rows.len();

        let Some(row) = RecordRow::from_sample(index, elapsed, sample, &self.user, self.ambient)
        else {
            return Ok(None);
        };
        self.rows.push(row);

        if let Err(e) = self.append_last(&target) {
            // Drop the writer so finalize rewrites every row from memory
            self.writer = None;
            return Err(e);
        }
        debug!("Recorded row {} to {}", index, target.display());
        Ok(Some(index))
    }

    fn append_last(&mut self, target: &Path) -> Result<()> {
        if self.writer.is_none() {
            let mut writer = create_writer(target)?;
            // The file is new: replay every earlier row held in memory
            for row in &self.rows[..self.rows.len().saturating_sub(1)] {
                writer.serialize(row)?;
            }
            info!("Recording to {}", target.display());
            self.writer = Some(writer);
        }
        let (Some(writer), Some(row)) = (self.writer.as_mut(), self.rows.last()) else {
            return Ok(());
        };
        writer.serialize(row)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the final state to disk and reset for the next recording.
    ///
    /// Returns `Ok(None)` when nothing was recorded. The target and user label
    /// are kept, so recording can resume into the same file name.
    pub fn finalize(&mut self) -> Result<Option<RecordingSummary>> {
        if self.rows.is_empty() {
            self.reset_rows();
            return Ok(None);
        }
        let Some(target) = self.target.clone() else {
            return Err(Error::NoTarget);
        };

        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => {
                let mut writer = create_writer(&target)?;
                for row in &self.rows {
                    writer.serialize(row)?;
                }
                writer
            }
        };
        let file = writer.into_inner()?;
        file.sync_all()?;

        let summary = RecordingSummary {
            path: target,
            rows: self.rows.len(),
            duration_secs: self.rows.last().map_or(0.0, |r| r.elapsed_time),
        };
        info!(
            "Finalized recording {} ({} rows, {:.1}s)",
            summary.path.display(),
            summary.rows,
            summary.duration_secs
        );
        self.reset_rows();
        Ok(Some(summary))
    }

    fn reset_rows(&mut self) {
        self.writer = None;
        self.rows.clear();
        self.origin = None;
        self.ambient = false;
    }

    fn reset(&mut self) {
        self.reset_rows();
        self.target = None;
    }

    /// Rows of the current recording.
    pub fn rows(&self) -> &[RecordRow] {
        &self.rows
    }

    /// Number of rows in the current recording.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the current recording has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(elapsed_time, CO2)` pairs for live plotting.
    pub fn series(&self) -> Vec<(f64, f64)> {
        self.rows.iter().map(|r| (r.elapsed_time, r.co2_ppm)).collect()
    }

    /// Path of the current target, if any.
    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    /// User label written in the `user` column.
    pub fn user(&self) -> &str {
        &self.user
    }
}

fn create_writer(target: &Path) -> Result<csv::Writer<File>> {
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    Ok(csv::Writer::from_path(target)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use li850_types::AmbientReading;

    fn valid(co2: f64, h2o: f64) -> Sample {
        Sample {
            co2_ppm: Some(co2),
            h2o: Some(h2o),
            cell_pressure: Some(98.1),
            cell_temp: Some(51.2),
            ambient: None,
        }
    }

    #[test]
    fn test_record_without_target_fails() {
        let mut recorder = Recorder::new();
        let result = recorder.record(&valid(400.0, 1.2));
        assert!(matches!(result, Err(Error::NoTarget)));
    }

    #[test]
    fn test_invalid_sample_is_ignored_without_target() {
        let mut recorder = Recorder::new();
        let sample = Sample {
            co2_ppm: Some(400.0),
            ..Default::default()
        };
        assert_eq!(recorder.record(&sample).unwrap(), None);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_indices_are_monotonic_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::new();
        recorder.begin(dir.path().join("run.csv"), "alice");

        let start = Instant::now();
        for i in 0..5 {
            let at = start + Duration::from_secs(i);
            let index = recorder.record_at(&valid(400.0 + i as f64, 1.0), at).unwrap();
            assert_eq!(index, Some(i as usize));
        }
        let indices: Vec<usize> = recorder.rows().iter().map(|r| r.rcrd_nb).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(recorder.rows()[0].elapsed_time, 0.0);
        assert_eq!(recorder.rows()[4].elapsed_time, 4.0);
    }

    #[test]
    fn test_invalid_sample_does_not_consume_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::new();
        recorder.begin(dir.path().join("run.csv"), "u");

        recorder.record(&valid(400.0, 1.0)).unwrap();
        let missing_h2o = Sample {
            co2_ppm: Some(1.0),
            ..Default::default()
        };
        assert_eq!(recorder.record(&missing_h2o).unwrap(), None);
        assert_eq!(recorder.record(&valid(401.0, 1.0)).unwrap(), Some(1));
    }

    #[test]
    fn test_each_row_is_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let mut recorder = Recorder::new();
        recorder.begin(&path, "u");

        recorder.record(&valid(400.0, 1.0)).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        recorder.record(&valid(401.0, 1.0)).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_header_and_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let mut recorder = Recorder::new();
        recorder.begin(&path, "alice");
        recorder.record(&valid(400.0, 1.2)).unwrap();
        recorder.finalize().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "rcrd_nb,elapsed_time,CO2_ppm,H2O,Cell_pressure,Cell_temp,user"
        );
        assert_eq!(lines.next().unwrap(), "0,0.0,400.0,1.2,98.1,51.2,alice");
    }

    #[test]
    fn test_missing_optional_fields_are_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let mut recorder = Recorder::new();
        recorder.begin(&path, "u");
        let sample = Sample {
            co2_ppm: Some(400.0),
            h2o: Some(1.2),
            ..Default::default()
        };
        recorder.record(&sample).unwrap();
        recorder.finalize().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().nth(1).unwrap(), "0,0.0,400.0,1.2,,,u");
    }

    #[test]
    fn test_ambient_columns_and_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let mut recorder = Recorder::new();
        recorder.begin(&path, "u");

        let start = Instant::now();
        let ok = valid(400.0, 1.2).with_ambient(AmbientReading::new(21.5, 40.0));
        let failed = valid(401.0, 1.2).with_ambient(AmbientReading::UNAVAILABLE);
        recorder.record_at(&ok, start).unwrap();
        recorder
            .record_at(&failed, start + Duration::from_millis(1500))
            .unwrap();
        recorder.finalize().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "rcrd_nb,elapsed_time,CO2_ppm,H2O,Cell_pressure,Cell_temp,Air_temp,Air_RH,user"
        );
        assert_eq!(lines[1], "0,0.0,400.0,1.2,98.1,51.2,21.5,40.0,u");
        assert_eq!(lines[2], "1,1.5,401.0,1.2,98.1,51.2,9999.0,9999.0,u");
    }

    #[test]
    fn test_finalize_empty_is_noop() {
        let mut recorder = Recorder::new();
        assert_eq!(recorder.finalize().unwrap(), None);
        assert_eq!(recorder.finalize().unwrap(), None);
    }

    #[test]
    fn test_finalize_resets_for_next_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::new();
        recorder.begin(dir.path().join("first.csv"), "u");
        recorder.record(&valid(400.0, 1.0)).unwrap();
        recorder.record(&valid(401.0, 1.0)).unwrap();

        let summary = recorder.finalize().unwrap().unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.path, dir.path().join("first.csv"));
        assert!(recorder.is_empty());

        recorder.begin(dir.path().join("second.csv"), "u");
        assert_eq!(recorder.record(&valid(402.0, 1.0)).unwrap(), Some(0));
        assert_eq!(recorder.rows()[0].elapsed_time, 0.0);
    }

    #[test]
    fn test_creates_data_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("nested").join("run.csv");
        let mut recorder = Recorder::new();
        recorder.begin(&path, "u");
        recorder.record(&valid(400.0, 1.0)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_series() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::new();
        recorder.begin(dir.path().join("run.csv"), "u");
        let start = Instant::now();
        recorder.record_at(&valid(400.0, 1.0), start).unwrap();
        recorder
            .record_at(&valid(410.5, 1.0), start + Duration::from_secs(2))
            .unwrap();
        assert_eq!(recorder.series(), vec![(0.0, 400.0), (2.0, 410.5)]);
    }
}
