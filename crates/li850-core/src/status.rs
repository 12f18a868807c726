//! Headless status display.
//!
//! A [`StatusPublisher`] periodically condenses the session into a
//! [`StatusFrame`]: network identity, connection state, the last CO2 reading
//! and a short trend. Frames render to a handful of plain-text lines suitable
//! for a small character display or a terminal.

use std::collections::VecDeque;

use serde::Serialize;

use li850_types::ConnectionState;

use crate::network::NetworkIdentity;
use crate::session::SerialSession;

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Number of CO2 values kept for the trend when not recording.
pub const DEFAULT_HISTORY: usize = 64;

/// One snapshot of the instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusFrame {
    pub network: NetworkIdentity,
    pub state: ConnectionState,
    pub port: Option<String>,
    pub co2_ppm: Option<f64>,
    /// Recent CO2 values, oldest first.
    pub trend: Vec<f64>,
    /// Rows in the current recording.
    pub recorded_rows: usize,
}

impl StatusFrame {
    /// Render as text lines, each at most `width` characters.
    pub fn render(&self, width: usize) -> Vec<String> {
        let co2 = match self.co2_ppm {
            Some(v) => format!("CO2: {:.1} ppm", v),
            None => "CO2: --".to_string(),
        };
        let state = match (&self.port, self.state) {
            (Some(port), ConnectionState::Recording) => {
                format!("{} {} ({} rows)", port, self.state, self.recorded_rows)
            }
            (Some(port), state) => format!("{} {}", port, state),
            (None, state) => state.to_string(),
        };

        [
            format!("SSID: {}", self.network.ssid),
            format!("IP: {}", self.network.ip),
            state,
            co2,
            sparkline(&self.trend, width),
        ]
        .into_iter()
        .map(|line| truncate(&line, width))
        .collect()
    }
}

fn truncate(line: &str, width: usize) -> String {
    line.chars().take(width).collect()
}

/// Render the last `width` values as block characters scaled between their
/// minimum and maximum.
pub fn sparkline(values: &[f64], width: usize) -> String {
    let start = values.len().saturating_sub(width);
    let window = &values[start..];
    let Some(min) = window.iter().copied().reduce(f64::min) else {
        return String::new();
    };
    let max = window.iter().copied().fold(min, f64::max);
    let span = max - min;

    window
        .iter()
        .map(|v| {
            if span <= f64::EPSILON {
                BARS[0]
            } else {
                let level = ((v - min) / span * (BARS.len() - 1) as f64).round() as usize;
                BARS[level.min(BARS.len() - 1)]
            }
        })
        .collect()
}

/// Builds [`StatusFrame`]s from a session.
///
/// While a recording is active the trend is the recorded CO2 series;
/// otherwise it is a rolling history of the values seen at each update.
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    history: VecDeque<f64>,
    capacity: usize,
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

impl StatusPublisher {
    pub fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Take a snapshot of `session`.
    pub fn update(&mut self, session: &SerialSession, network: NetworkIdentity) -> StatusFrame {
        let co2_ppm = session.current_co2();
        if let Some(v) = co2_ppm {
            if self.history.len() == self.capacity {
                self.history.pop_front();
            }
            self.history.push_back(v);
        }

        let state = session.state();
        let trend = if state.is_recording() {
            session
                .recording_series()
                .into_iter()
                .map(|(_, co2)| co2)
                .collect()
        } else {
            self.history.iter().copied().collect()
        };

        StatusFrame {
            network,
            state,
            port: session.port().map(str::to_string),
            co2_ppm,
            trend,
            recorded_rows: session.recorded_rows(),
        }
    }
}
