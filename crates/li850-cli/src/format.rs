//! Output formatting utilities for text, JSON, and CSV output.

use anyhow::Result;
use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use serde::Serialize;

use li850_core::StatusFrame;
use li850_store::RecordingStats;
use li850_types::{PortInfo, Sample};

use crate::style;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Omit header row in CSV output.
    pub no_header: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self {
            no_color,
            ..Default::default()
        }
    }

    /// Create with compact JSON option.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Create with no_header option for CSV output.
    pub fn with_no_header(mut self, no_header: bool) -> Self {
        self.no_header = no_header;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }
}

/// Escape a value for CSV output.
#[must_use]
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_default()
}

fn opt_text(value: Option<f64>, precision: usize, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.*} {}", precision, v, unit),
        None => "--".to_string(),
    }
}

// ============================================================================
// Ports
// ============================================================================

#[must_use]
pub fn format_ports_text(ports: &[PortInfo], opts: &FormatOptions) -> String {
    if ports.is_empty() {
        return "No serial ports found.\n".to_string();
    }

    let mut output = style::format_title(&format!("Serial ports ({})", ports.len()), opts.no_color);
    output.push('\n');
    let width = ports.iter().map(|p| p.device.len()).max().unwrap_or(0);
    for port in ports {
        let device = format!("{:<width$}", port.device, width = width);
        let device = if opts.no_color {
            device
        } else {
            format!("{}", device.cyan())
        };
        output.push_str(&format!("  {}  {}\n", device, port.description));
    }
    output
}

pub fn format_ports_json(ports: &[PortInfo], opts: &FormatOptions) -> Result<String> {
    opts.as_json(&ports)
}

#[must_use]
pub fn format_ports_csv(ports: &[PortInfo], opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "device,name,description\n".to_string()
    };
    for port in ports {
        output.push_str(&format!(
            "{},{},{}\n",
            csv_escape(&port.device),
            csv_escape(&port.name),
            csv_escape(&port.description)
        ));
    }
    output
}

// ============================================================================
// Live samples
// ============================================================================

/// One line of `watch` text output.
#[must_use]
pub fn format_watch_line(sample: &Sample, at: DateTime<Local>, opts: &FormatOptions) -> String {
    let time = at.format("%H:%M:%S");
    let co2 = match sample.co2_ppm {
        Some(v) => format!("{} ppm", style::format_co2_colored(v, opts.no_color)),
        None => "--".to_string(),
    };
    let mut line = format!(
        "[{}] CO2: {}  H2O: {}  Cell: {} / {}",
        time,
        co2,
        opt_text(sample.h2o, 2, "ppt"),
        opt_text(sample.cell_pressure, 2, "kPa"),
        opt_text(sample.cell_temp, 1, "C"),
    );
    if let Some(ambient) = sample.ambient {
        if ambient.is_unavailable() {
            line.push_str("  Air: --");
        } else {
            line.push_str(&format!(
                "  Air: {:.1} C {:.1} %RH",
                ambient.air_temp, ambient.air_rel_humidity
            ));
        }
    }
    line.push('\n');
    line
}

#[must_use]
pub fn format_watch_csv_header() -> String {
    "timestamp,co2_ppm,h2o,cell_pressure,cell_temp,air_temp,air_rh\n".to_string()
}

#[must_use]
pub fn format_watch_csv_line(sample: &Sample, at: DateTime<Local>) -> String {
    format!(
        "{},{},{},{},{},{},{}\n",
        at.to_rfc3339(),
        opt(sample.co2_ppm, 2),
        opt(sample.h2o, 3),
        opt(sample.cell_pressure, 3),
        opt(sample.cell_temp, 2),
        opt(sample.air_temp(), 2),
        opt(sample.air_rel_humidity(), 2),
    )
}

#[derive(Serialize)]
struct TimedSample<'a> {
    timestamp: String,
    #[serde(flatten)]
    sample: &'a Sample,
}

/// A sample as one JSON document, always compact so it streams line by line.
pub fn format_sample_json(sample: &Sample, at: DateTime<Local>) -> Result<String> {
    let value = TimedSample {
        timestamp: at.to_rfc3339(),
        sample,
    };
    Ok(serde_json::to_string(&value)? + "\n")
}

// ============================================================================
// Recording statistics
// ============================================================================

#[must_use]
pub fn format_stats_text(file: &str, stats: &RecordingStats, opts: &FormatOptions) -> String {
    let mut output = style::format_title(file, opts.no_color);
    output.push('\n');
    output.push_str(&format!("Rows:      {}\n", stats.rows));
    output.push_str(&format!("Duration:  {:.1} s\n", stats.duration_secs));
    if let (Some(min), Some(mean), Some(max)) = (stats.co2_min, stats.co2_mean, stats.co2_max) {
        output.push_str(&format!(
            "CO2:       min {} / mean {} / max {} ppm\n",
            style::format_co2_colored(min, opts.no_color),
            style::format_co2_colored(mean, opts.no_color),
            style::format_co2_colored(max, opts.no_color),
        ));
    }
    if let Some(h2o) = stats.h2o_mean {
        output.push_str(&format!("H2O mean:  {:.3} ppt\n", h2o));
    }
    if !stats.users.is_empty() {
        output.push_str(&format!("Users:     {}\n", stats.users.join(", ")));
    }
    if stats.has_ambient {
        output.push_str(&format!(
            "Ambient:   yes ({} failed reads)\n",
            stats.ambient_failures
        ));
    } else {
        output.push_str("Ambient:   no\n");
    }
    output
}

pub fn format_stats_csv(file: &str, stats: &RecordingStats, opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "file,rows,duration_secs,co2_min,co2_mean,co2_max,h2o_mean,users,ambient_failures\n"
            .to_string()
    };
    output.push_str(&format!(
        "{},{},{:.3},{},{},{},{},{},{}\n",
        csv_escape(file),
        stats.rows,
        stats.duration_secs,
        opt(stats.co2_min, 2),
        opt(stats.co2_mean, 2),
        opt(stats.co2_max, 2),
        opt(stats.h2o_mean, 3),
        csv_escape(&stats.users.join(";")),
        stats.ambient_failures,
    ));
    output
}

// ============================================================================
// Status frame
// ============================================================================

/// Default width of a rendered status frame.
pub const STATUS_WIDTH: usize = 32;

#[must_use]
pub fn format_status_text(frame: &StatusFrame, opts: &FormatOptions) -> String {
    let mut lines = frame.render(STATUS_WIDTH);
    if !opts.no_color && let Some(line) = lines.get_mut(2) {
        let state = frame.state.to_string();
        *line = line.replacen(&state, &style::format_state(frame.state, false), 1);
    }
    let mut output = lines.join("\n");
    output.push('\n');
    output
}

/// One CSV row per status frame.
#[must_use]
pub fn format_status_csv(frame: &StatusFrame, at: DateTime<Local>, opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "timestamp,ssid,ip,state,port,co2_ppm,recorded_rows\n".to_string()
    };
    output.push_str(&format!(
        "{},{},{},{},{},{},{}\n",
        at.to_rfc3339(),
        csv_escape(&frame.network.ssid),
        csv_escape(&frame.network.ip),
        frame.state,
        csv_escape(frame.port.as_deref().unwrap_or("")),
        opt(frame.co2_ppm, 2),
        frame.recorded_rows,
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use li850_types::{AmbientReading, ConnectionState};
    use li850_core::NetworkIdentity;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    fn plain() -> FormatOptions {
        FormatOptions::new(true)
    }

    fn sample() -> Sample {
        Sample {
            co2_ppm: Some(412.5),
            h2o: Some(9.87),
            cell_pressure: Some(98.123),
            cell_temp: Some(51.2),
            ambient: None,
        }
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_ports_text_and_csv() {
        let ports = vec![PortInfo {
            device: "/dev/ttyACM0".to_string(),
            name: "ttyACM0".to_string(),
            description: "LI-850, USB".to_string(),
        }];
        let text = format_ports_text(&ports, &plain());
        assert!(text.starts_with("Serial ports (1)"));
        assert!(text.contains("/dev/ttyACM0  LI-850, USB"));

        let csv = format_ports_csv(&ports, &plain());
        assert_eq!(
            csv,
            "device,name,description\n/dev/ttyACM0,ttyACM0,\"LI-850, USB\"\n"
        );
        let csv = format_ports_csv(&ports, &plain().with_no_header(true));
        assert!(!csv.starts_with("device"));

        assert_eq!(format_ports_text(&[], &plain()), "No serial ports found.\n");
    }

    #[test]
    fn test_ports_json() {
        let ports = vec![PortInfo {
            device: "COM3".to_string(),
            name: "COM3".to_string(),
            description: String::new(),
        }];
        let json = format_ports_json(&ports, &plain().with_compact(true)).unwrap();
        assert_eq!(
            json,
            "[{\"device\":\"COM3\",\"name\":\"COM3\",\"description\":\"\"}]\n"
        );
    }

    #[test]
    fn test_watch_line() {
        let line = format_watch_line(&sample(), at(), &plain());
        assert_eq!(
            line,
            "[14:07:09] CO2: 412.5 ppm  H2O: 9.87 ppt  Cell: 98.12 kPa / 51.2 C\n"
        );

        let missing = Sample::default();
        let line = format_watch_line(&missing, at(), &plain());
        assert!(line.contains("CO2: --"));
        assert!(line.contains("H2O: --"));
    }

    #[test]
    fn test_watch_line_ambient() {
        let s = sample().with_ambient(AmbientReading::new(21.5, 40.3));
        assert!(format_watch_line(&s, at(), &plain()).contains("Air: 21.5 C 40.3 %RH"));

        let s = sample().with_ambient(AmbientReading::UNAVAILABLE);
        assert!(format_watch_line(&s, at(), &plain()).ends_with("Air: --\n"));
    }

    #[test]
    fn test_watch_csv() {
        let line = format_watch_csv_line(&sample(), at());
        let fields: Vec<&str> = line.trim_end().split(',').collect();
        assert_eq!(fields.len(), format_watch_csv_header().trim_end().split(',').count());
        assert_eq!(&fields[1..], ["412.50", "9.870", "98.123", "51.20", "", ""]);
    }

    #[test]
    fn test_sample_json() {
        let json = format_sample_json(&sample(), at()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["co2_ppm"], 412.5);
        assert!(value["timestamp"].as_str().unwrap().starts_with("2024-03-05T14:07:09"));
        assert!(json.ends_with('\n'));
    }

    fn stats() -> RecordingStats {
        RecordingStats {
            rows: 3,
            duration_secs: 2.0,
            co2_min: Some(400.0),
            co2_mean: Some(410.0),
            co2_max: Some(420.0),
            h2o_mean: Some(1.25),
            users: vec!["alice".to_string()],
            has_ambient: true,
            ambient_failures: 1,
        }
    }

    #[test]
    fn test_stats_text() {
        let text = format_stats_text("chamber.csv", &stats(), &plain());
        assert!(text.contains("Rows:      3"));
        assert!(text.contains("min 400.0 / mean 410.0 / max 420.0 ppm"));
        assert!(text.contains("Users:     alice"));
        assert!(text.contains("Ambient:   yes (1 failed reads)"));
    }

    #[test]
    fn test_stats_csv() {
        let csv = format_stats_csv("chamber.csv", &stats(), &plain());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "chamber.csv,3,2.000,400.00,410.00,420.00,1.250,alice,1"
        );
    }

    #[test]
    fn test_status_text_plain() {
        let frame = StatusFrame {
            network: NetworkIdentity {
                ssid: "lab".to_string(),
                ip: "10.0.0.2".to_string(),
            },
            state: ConnectionState::Reading,
            port: Some("/dev/ttyACM0".to_string()),
            co2_ppm: Some(415.0),
            trend: vec![],
            recorded_rows: 0,
        };
        let text = format_status_text(&frame, &plain());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "SSID: lab");
        assert_eq!(lines[1], "IP: 10.0.0.2");
        assert_eq!(lines[3], "CO2: 415.0 ppm");

        let csv = format_status_csv(&frame, at(), &plain().with_no_header(true));
        assert!(csv.ends_with(",lab,10.0.0.2,reading,/dev/ttyACM0,415.00,0\n"));
    }
}
