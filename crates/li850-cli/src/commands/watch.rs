//! Watch command implementation.
//!
//! Runs the background reader without recording and prints the latest sample
//! every interval.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use chrono::Local;
use owo_colors::OwoColorize;

use crate::cli::{OutputFormat, PortArgs};
use crate::config::Config;
use crate::format::{
    FormatOptions, format_sample_json, format_watch_csv_header, format_watch_csv_line,
    format_watch_line,
};
use crate::util::{
    Interrupt, SessionSetup, append_output, open_session, require_port_interactive,
};

/// Arguments for the watch command.
pub struct WatchArgs<'a> {
    pub port: PortArgs,
    pub interval: u64,
    pub count: u32,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub quiet: bool,
    pub opts: &'a FormatOptions,
}

pub async fn cmd_watch(args: WatchArgs<'_>, config: &Config) -> Result<()> {
    let WatchArgs {
        port,
        interval,
        count,
        format,
        output,
        quiet,
        opts,
    } = args;

    let device = require_port_interactive(port.port, config)?;
    let mut session = open_session(
        SessionSetup {
            port: device.clone(),
            baud: port.baud,
            data_dir: None,
            show_progress: !quiet,
        },
        config,
    )?;

    if !session.start_continuous_reading() {
        session.disconnect().await?;
        bail!("Failed to start reading from {}", device);
    }

    if !quiet {
        let header = if opts.no_color {
            format!("Watching: {}", device)
        } else {
            format!("Watching: {}", device.cyan())
        };
        eprintln!("{}", header);
        if count > 0 {
            eprintln!(
                "Interval: {}s | Count: {} | Press Ctrl+C to stop",
                interval, count
            );
        } else {
            eprintln!("Interval: {}s | Press Ctrl+C to stop", interval);
        }
        eprintln!("{}", "-".repeat(50));
    }

    if format == OutputFormat::Csv && !opts.no_header {
        append_output(output, &format_watch_csv_header())?;
    }

    let mut interrupt = Interrupt::ctrl_c();
    let mut printed: u32 = 0;
    let result = loop {
        if count > 0 && printed >= count {
            if !quiet {
                eprintln!("Completed {} readings.", printed);
            }
            break Ok(());
        }

        if interrupt.sleep(Duration::from_secs(interval.max(1))).await {
            eprintln!("\nShutting down...");
            break Ok(());
        }

        if !session.is_reading() {
            let cause = session
                .last_error()
                .unwrap_or_else(|| "reader stopped".to_string());
            break Err(anyhow!("Lost connection to {}: {}", device, cause));
        }

        let Some(sample) = session.latest_sample() else {
            if !quiet {
                eprintln!("Waiting for data...");
            }
            continue;
        };

        let now = Local::now();
        let content = match format {
            OutputFormat::Json => format_sample_json(&sample, now),
            OutputFormat::Csv => Ok(format_watch_csv_line(&sample, now)),
            OutputFormat::Text => Ok(format_watch_line(&sample, now, opts)),
        };
        if let Err(e) = content.and_then(|c| append_output(output, &c)) {
            break Err(e);
        }
        printed += 1;
    };

    session.disconnect().await?;
    result
}
