//! Reading persisted recordings back.

use std::path::Path;

use crate::error::Result;
use crate::models::{RecordRow, RecordingStats};

/// Load every row of a recording file.
pub fn read_recording(path: impl AsRef<Path>) -> Result<Vec<RecordRow>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let rows = reader
        .deserialize::<RecordRow>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Aggregate statistics over recorded rows.
pub fn recording_stats(rows: &[RecordRow]) -> RecordingStats {
    let co2: Vec<f64> = rows.iter().map(|r| r.co2_ppm).collect();
    let h2o: Vec<f64> = rows.iter().map(|r| r.h2o).collect();

    let mut users: Vec<String> = Vec::new();
    for row in rows {
        if !users.contains(&row.user) {
            users.push(row.user.clone());
        }
    }

    RecordingStats {
        rows: rows.len(),
        duration_secs: rows.last().map_or(0.0, |r| r.elapsed_time),
        co2_min: co2.iter().copied().reduce(f64::min),
        co2_mean: mean(&co2),
        co2_max: co2.iter().copied().reduce(f64::max),
        h2o_mean: mean(&h2o),
        users,
        has_ambient: rows.iter().any(|r| r.air_temp.is_some()),
        ambient_failures: rows
            .iter()
            .filter(|r| {
                r.air_temp == Some(li850_types::AMBIENT_SENTINEL)
                    && r.air_rel_humidity == Some(li850_types::AMBIENT_SENTINEL)
            })
            .count(),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: usize, t: f64, co2: f64, user: &str) -> RecordRow {
        RecordRow {
            rcrd_nb: n,
            elapsed_time: t,
            co2_ppm: co2,
            h2o: 1.0,
            cell_pressure: None,
            cell_temp: None,
            air_temp: None,
            air_rel_humidity: None,
            user: user.to_string(),
        }
    }

    #[test]
    fn test_stats_empty() {
        let stats = recording_stats(&[]);
        assert_eq!(stats.rows, 0);
        assert_eq!(stats.co2_mean, None);
        assert_eq!(stats.co2_min, None);
        assert!(stats.users.is_empty());
    }

    #[test]
    fn test_stats_values() {
        let rows = vec![
            row(0, 0.0, 400.0, "alice"),
            row(1, 1.0, 420.0, "alice"),
            row(2, 2.0, 410.0, "bob"),
        ];
        let stats = recording_stats(&rows);
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.duration_secs, 2.0);
        assert_eq!(stats.co2_min, Some(400.0));
        assert_eq!(stats.co2_max, Some(420.0));
        assert_eq!(stats.co2_mean, Some(410.0));
        assert_eq!(stats.users, vec!["alice".to_string(), "bob".to_string()]);
        assert!(!stats.has_ambient);
    }

    #[test]
    fn test_stats_counts_ambient_failures() {
        let mut ok = row(0, 0.0, 400.0, "u");
        ok.air_temp = Some(21.0);
        ok.air_rel_humidity = Some(40.0);
        let mut failed = row(1, 1.0, 400.0, "u");
        failed.air_temp = Some(9999.0);
        failed.air_rel_humidity = Some(9999.0);

        let stats = recording_stats(&[ok, failed]);
        assert!(stats.has_ambient);
        assert_eq!(stats.ambient_failures, 1);
    }
}
