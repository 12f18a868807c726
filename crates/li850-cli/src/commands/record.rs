//! Record command implementation.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use indicatif::ProgressBar;
use tracing::warn;

use crate::cli::PortArgs;
use crate::config::{Config, resolve_user};
use crate::format::FormatOptions;
use crate::style;
use crate::util::{
    Interrupt, SessionSetup, open_session, require_port_interactive, write_output,
};

/// How often progress is refreshed and stop conditions are checked.
const TICK: Duration = Duration::from_millis(500);

/// Arguments for the record command.
pub struct RecordArgs<'a> {
    pub port: PortArgs,
    pub name: String,
    pub user: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub duration: Option<u64>,
    pub count: Option<usize>,
    pub output: Option<&'a PathBuf>,
    pub quiet: bool,
    pub opts: &'a FormatOptions,
}

enum StopReason {
    Interrupted,
    Duration,
    Count,
    ReaderStopped(String),
}

pub async fn cmd_record(args: RecordArgs<'_>, config: &Config) -> Result<()> {
    let RecordArgs {
        port,
        name,
        user,
        data_dir,
        duration,
        count,
        output,
        quiet,
        opts,
    } = args;

    let device = require_port_interactive(port.port, config)?;
    let mut session = open_session(
        SessionSetup {
            port: device.clone(),
            baud: port.baud,
            data_dir,
            show_progress: !quiet,
        },
        config,
    )?;

    session.set_user(resolve_user(user, config));
    session.select_filename(&name);
    let path = session
        .start_recording()
        .context("Failed to start recording")?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let spinner: Option<ProgressBar> = (!quiet && io::stderr().is_terminal())
        .then(|| style::recording_spinner(&file_name));
    if spinner.is_none() && !quiet {
        eprintln!("Recording to {} (Ctrl+C to stop)", path.display());
    }

    let started = Instant::now();
    let limit = duration.map(Duration::from_secs);
    let mut interrupt = Interrupt::ctrl_c();
    let reason = loop {
        if interrupt.sleep(TICK).await {
            break StopReason::Interrupted;
        }
        if !session.is_recording() {
            break StopReason::ReaderStopped(
                session
                    .last_error()
                    .unwrap_or_else(|| "reader stopped".to_string()),
            );
        }

        let rows = session.recorded_rows();
        if let Some(sp) = &spinner {
            let co2 = session
                .current_co2()
                .map(|v| format!("{} ppm", style::format_co2_colored(v, opts.no_color)))
                .unwrap_or_else(|| "--".to_string());
            sp.set_message(format!("Recording to {} | {} rows | CO2 {}", file_name, rows, co2));
        }
        if count.is_some_and(|n| rows >= n) {
            break StopReason::Count;
        }
        if limit.is_some_and(|d| started.elapsed() >= d) {
            break StopReason::Duration;
        }
    };

    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }
    match &reason {
        StopReason::Interrupted if !quiet => eprintln!("\nStopping..."),
        StopReason::ReaderStopped(e) => warn!("Reading stopped: {}", e),
        _ => {}
    }

    let summary = session.stop_recording().await;
    session.disconnect().await?;
    let summary = summary.context("Failed to close recording")?;

    let message = match &summary {
        Some(s) => format!(
            "{} rows over {:.1} s written to {}",
            s.rows,
            s.duration_secs,
            s.path.display()
        ),
        None => format!("No valid samples received; {} was not created", path.display()),
    };
    write_output(output, &format!("{}\n", style::format_success(&message, opts.no_color)))?;

    match reason {
        StopReason::ReaderStopped(e) => Err(anyhow!("Lost connection to {}: {}", device, e)),
        _ => Ok(()),
    }
}
