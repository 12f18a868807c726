//! Utility functions for CLI operations.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use dialoguer::{Select, theme::ColorfulTheme};
use tracing::warn;

use li850_core::{ConnectionFailureReason, Error as CoreError, SerialSession, list_port_details};

use crate::config::{Config, resolve_port};
use crate::style;

/// Get the serial port, prompting interactively if none was given.
pub fn require_port_interactive(port: Option<String>, config: &Config) -> Result<String> {
    if let Some(port) = resolve_port(port, config) {
        return Ok(port);
    }

    if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
        bail!(
            "No serial port specified. Use --port <DEVICE> or set LI850_PORT environment variable.\n\
             Run 'li850 ports' to list available ports."
        );
    }

    let ports = list_port_details(&config.port_filter());
    match ports.len() {
        0 => bail!(
            "No serial ports found.\n\
             Make sure the analyzer is plugged in and powered on."
        ),
        1 => {
            eprintln!("Found 1 port: {}", ports[0].device);
            Ok(ports[0].device.clone())
        }
        _ => {
            let items: Vec<String> = ports
                .iter()
                .map(|p| {
                    if p.description.is_empty() {
                        p.device.clone()
                    } else {
                        format!("{} ({})", p.device, p.description)
                    }
                })
                .collect();

            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Select a serial port")
                .items(&items)
                .default(0)
                .interact()
                .context("Failed to get user selection")?;

            Ok(ports[selection].device.clone())
        }
    }
}

/// Settings for [`open_session`].
pub struct SessionSetup {
    pub port: String,
    pub baud: Option<u32>,
    pub data_dir: Option<PathBuf>,
    pub show_progress: bool,
}

/// Build a session from config and connect it to the analyzer.
pub fn open_session(setup: SessionSetup, config: &Config) -> Result<SerialSession> {
    let options = config.session_options(setup.baud, setup.data_dir)?;
    let baud = options.baud_rate;
    let timeout = options.read_timeout;
    let mut session = SerialSession::new(options);
    session = attach_ambient(session, config);

    let spinner = (setup.show_progress && io::stderr().is_terminal())
        .then(|| style::connecting_spinner(&setup.port));

    let result = session.connect(&setup.port, baud, timeout);
    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }
    result.map_err(|e| connect_error(&setup.port, e))?;
    Ok(session)
}

fn connect_error(port: &str, err: CoreError) -> anyhow::Error {
    let hint = match &err {
        CoreError::ConnectionFailed { reason, .. } => match reason {
            ConnectionFailureReason::DeviceAbsent => {
                "The device is not present. Run 'li850 ports' to list available ports."
            }
            ConnectionFailureReason::PermissionDenied => {
                "Permission denied. On Linux, add your user to the 'dialout' group."
            }
            ConnectionFailureReason::InvalidSettings(_) => {
                "The port rejected the settings. Check the baud rate."
            }
            _ => "Check the cable and that no other program holds the port.",
        },
        _ => "Check the cable and that no other program holds the port.",
    };
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    anyhow!(
        "Failed to open serial port: {}\n\nCause: {}\n\nTip: {}\nTime: {}",
        port,
        err,
        hint,
        timestamp
    )
}

#[cfg(all(target_os = "linux", feature = "i2c"))]
fn attach_ambient(session: SerialSession, config: &Config) -> SerialSession {
    use li850_core::scd30::Scd30Sensor;

    if !config.ambient.enabled {
        return session;
    }
    match Scd30Sensor::open(&config.ambient.bus, config.ambient.address) {
        Ok(sensor) => session.with_ambient(Box::new(sensor)),
        Err(e) => {
            // The columns are still written, filled with the failure sentinel.
            warn!("SCD30 unavailable on {}: {}", config.ambient.bus, e);
            session.with_ambient(Box::new(UnavailableSensor))
        }
    }
}

#[cfg(not(all(target_os = "linux", feature = "i2c")))]
fn attach_ambient(session: SerialSession, config: &Config) -> SerialSession {
    if config.ambient.enabled {
        warn!("Ambient sensor enabled in config, but this build has no I2C support");
    }
    session
}

#[cfg(all(target_os = "linux", feature = "i2c"))]
struct UnavailableSensor;

#[cfg(all(target_os = "linux", feature = "i2c"))]
impl li850_core::AmbientSensor for UnavailableSensor {
    fn read(&mut self) -> li850_core::Result<li850_types::AmbientReading> {
        Err(CoreError::SensorRead("sensor not opened".to_string()))
    }
}

/// A Ctrl+C listener shared by every tick of a command loop.
///
/// The listener stays registered between sleeps, so an interrupt that lands
/// while the loop is busy is seen by the next [`Interrupt::sleep`].
pub struct Interrupt {
    signal: Pin<Box<dyn Future<Output = io::Result<()>> + Send>>,
    fired: bool,
}

impl Interrupt {
    pub fn ctrl_c() -> Self {
        Self::from_future(tokio::signal::ctrl_c())
    }

    fn from_future(signal: impl Future<Output = io::Result<()>> + Send + 'static) -> Self {
        Self {
            signal: Box::pin(signal),
            fired: false,
        }
    }

    /// Wait for the interrupt or `duration`, returning `true` on interrupt.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if self.fired {
            return true;
        }
        tokio::select! {
            result = &mut self.signal => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                self.fired = true;
                true
            }
            _ = tokio::time::sleep(duration) => false,
        }
    }
}

/// Write output to file or stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

/// Append to a file or write to stdout, for streaming commands.
pub fn append_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            file.write_all(content.as_bytes())
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_interrupt_between_sleeps_is_kept() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut interrupt = Interrupt::from_future(async move { rx.await.map_err(io::Error::other) });

        assert!(!interrupt.sleep(Duration::from_millis(1)).await);
        assert!(!interrupt.sleep(Duration::from_millis(1)).await);

        // Fired while no sleep is pending.
        tx.send(()).unwrap();
        assert!(interrupt.sleep(Duration::from_secs(60)).await);
        assert!(interrupt.sleep(Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn test_interrupt_quiet_sleeps_time_out() {
        let mut interrupt = Interrupt::from_future(std::future::pending());
        for _ in 0..3 {
            assert!(!interrupt.sleep(Duration::from_millis(1)).await);
        }
    }

    #[test]
    fn test_port_from_arg_skips_prompt() {
        let port = require_port_interactive(Some("/dev/ttyACM0".to_string()), &Config::default());
        assert_eq!(port.unwrap(), "/dev/ttyACM0");
    }

    #[test]
    fn test_port_from_config_skips_prompt() {
        let config = Config {
            port: Some("COM3".to_string()),
            ..Default::default()
        };
        assert_eq!(require_port_interactive(None, &config).unwrap(), "COM3");
    }

    #[test]
    fn test_connect_error_hint() {
        let err = connect_error(
            "/dev/ttyUSB9",
            CoreError::connection_failed(
                "/dev/ttyUSB9",
                ConnectionFailureReason::PermissionDenied,
            ),
        );
        let text = err.to_string();
        assert!(text.contains("Failed to open serial port: /dev/ttyUSB9"));
        assert!(text.contains("dialout"));
    }

    #[test]
    fn test_open_session_missing_device() {
        let setup = SessionSetup {
            port: "/dev/li850-missing".to_string(),
            baud: None,
            data_dir: None,
            show_progress: false,
        };
        let err = open_session(setup, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("/dev/li850-missing"));
    }

    #[test]
    fn test_write_and_append_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_output(Some(&path), "a\n").unwrap();
        append_output(Some(&path), "b\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }
}
