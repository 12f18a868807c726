//! Recording file naming.
//!
//! The timestamp is captured when the name is chosen (and again by
//! [`RecordingTarget::refresh`] after each stop), not when the first sample
//! arrives. Two recordings with the same base name inside the same minute
//! therefore share a path and the second overwrites the first.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

/// Base name used when the user supplies an empty one.
pub const DEFAULT_BASE_NAME: &str = "fake_data";

/// `_YYYY_MM_DD_HH_MM.csv` suffix for a capture time.
pub fn timestamp_suffix(timestamp: &NaiveDateTime) -> String {
    timestamp.format("_%Y_%m_%d_%H_%M.csv").to_string()
}

/// A user-chosen base name bound to a data directory and capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingTarget {
    base: String,
    data_dir: PathBuf,
    file_name: String,
}

impl RecordingTarget {
    /// Create a target stamped with the current local time.
    pub fn new(base: impl AsRef<str>, data_dir: impl Into<PathBuf>) -> Self {
        Self::at(base, data_dir, Local::now().naive_local())
    }

    /// Create a target stamped with an explicit time.
    pub fn at(base: impl AsRef<str>, data_dir: impl Into<PathBuf>, timestamp: NaiveDateTime) -> Self {
        let base = normalize_base(base.as_ref());
        let file_name = format!("{}{}", base, timestamp_suffix(&timestamp));
        Self {
            base,
            data_dir: data_dir.into(),
            file_name,
        }
    }

    /// Re-stamp the file name with the current local time.
    pub fn refresh(&mut self) {
        self.refresh_at(Local::now().naive_local());
    }

    /// Re-stamp the file name with an explicit time.
    pub fn refresh_at(&mut self, timestamp: NaiveDateTime) {
        self.file_name = format!("{}{}", self.base, timestamp_suffix(&timestamp));
    }

    /// The normalized base name.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Directory the file is written to.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// File name including the timestamp suffix.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Full path of the recording file.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

fn normalize_base(base: &str) -> String {
    let base = base.trim();
    let base = base.strip_suffix(".csv").unwrap_or(base);
    if base.is_empty() {
        DEFAULT_BASE_NAME.to_string()
    } else {
        base.to_string()
    }
}
