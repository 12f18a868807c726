//! Visual styling utilities for the CLI.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use li850_types::ConnectionState;

/// Braille dots animation
const SPINNER_TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

const SPINNER_TICK_MS: u64 = 80;

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .expect("valid template")
        .tick_chars(SPINNER_TICK_CHARS)
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
    pb
}

/// Create a spinner for opening a serial port.
pub fn connecting_spinner(device: &str) -> ProgressBar {
    spinner(format!("Opening {}...", device))
}

/// Create a spinner shown while a recording is in progress.
pub fn recording_spinner(file_name: &str) -> ProgressBar {
    spinner(format!("Recording to {}", file_name))
}

/// CO2 thresholds (ppm) based on indoor air quality guidelines.
pub mod co2 {
    pub const GOOD: f64 = 800.0; // Green: < 800 ppm
    pub const MODERATE: f64 = 1000.0; // Yellow: 800-1000 ppm
    pub const POOR: f64 = 1500.0; // Orange: 1000-1500 ppm
    // Red: > 1500 ppm
}

/// Format a CO2 value with color based on thresholds.
pub fn format_co2_colored(ppm: f64, no_color: bool) -> String {
    let text = format!("{:.1}", ppm);
    if no_color {
        return text;
    }

    if ppm < co2::GOOD {
        format!("{}", text.green())
    } else if ppm < co2::MODERATE {
        format!("{}", text.yellow())
    } else if ppm < co2::POOR {
        // Orange
        format!("{}", text.truecolor(255, 165, 0))
    } else {
        format!("{}", text.red())
    }
}

/// Format the session state as a colored label.
pub fn format_state(state: ConnectionState, no_color: bool) -> String {
    let label = state.to_string();
    if no_color {
        return label;
    }
    match state {
        ConnectionState::Disconnected => format!("{}", label.dimmed()),
        ConnectionState::Connected => format!("{}", label.cyan()),
        ConnectionState::Reading => format!("{}", label.green()),
        ConnectionState::Recording => format!("{}", label.red().bold()),
    }
}

/// Format a success message.
pub fn format_success(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[OK] {}", message)
    } else {
        format!("{} {}", "[OK]".green(), message)
    }
}

/// Format a warning message.
pub fn format_warning(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[!!] {}", message)
    } else {
        format!("{} {}", "[!!]".yellow(), message)
    }
}

/// Format a title header.
pub fn format_title(title: &str, no_color: bool) -> String {
    let rule = "━".repeat(title.chars().count());
    if no_color {
        format!("{}\n{}", title, rule)
    } else {
        format!("{}\n{}", title.bold(), rule.dimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_co2_plain() {
        assert_eq!(format_co2_colored(412.34, true), "412.3");
        assert_eq!(format_co2_colored(1600.0, true), "1600.0");
    }

    #[test]
    fn test_co2_colored_keeps_value() {
        for ppm in [400.0, 900.0, 1200.0, 2000.0] {
            let colored = format_co2_colored(ppm, false);
            assert!(colored.contains(&format!("{:.1}", ppm)));
            assert_ne!(colored, format!("{:.1}", ppm));
        }
    }

    #[test]
    fn test_state_plain() {
        assert_eq!(format_state(ConnectionState::Recording, true), "recording");
    }

    #[test]
    fn test_messages_plain() {
        assert_eq!(format_success("done", true), "[OK] done");
        assert_eq!(format_warning("careful", true), "[!!] careful");
        assert_eq!(format_title("Ports", true), "Ports\n━━━━━");
    }
}
