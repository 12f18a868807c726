//! Status command implementation.
//!
//! Prints the headless status frame: network identity, session state and the
//! latest CO2 reading with a short trend.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;

use li850_core::{NetworkIdentity, SerialSession, StatusPublisher};

use crate::cli::OutputFormat;
use crate::config::{Config, resolve_port};
use crate::format::{FormatOptions, format_status_csv, format_status_text};
use crate::util::{Interrupt, SessionSetup, append_output, open_session};

/// How long `--once` waits for a first sample.
const FIRST_SAMPLE_WAIT: Duration = Duration::from_secs(3);

/// Arguments for the status command.
pub struct StatusArgs<'a> {
    pub port: Option<String>,
    pub once: bool,
    pub interval: u64,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub quiet: bool,
    pub opts: &'a FormatOptions,
}

pub async fn cmd_status(args: StatusArgs<'_>, config: &Config) -> Result<()> {
    let StatusArgs {
        port,
        once,
        interval,
        format,
        output,
        quiet,
        opts,
    } = args;

    let mut session = match resolve_port(port, config) {
        Some(device) => {
            let mut session = open_session(
                SessionSetup {
                    port: device,
                    baud: None,
                    data_dir: None,
                    show_progress: !quiet,
                },
                config,
            )?;
            session.start_continuous_reading();
            session
        }
        None => SerialSession::default(),
    };

    if once && session.is_reading() {
        let started = Instant::now();
        while session.latest_sample().is_none() && started.elapsed() < FIRST_SAMPLE_WAIT {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    let mut publisher = StatusPublisher::default();
    let mut opts = *opts;
    let mut interrupt = Interrupt::ctrl_c();
    let result = loop {
        let network = match tokio::task::spawn_blocking(NetworkIdentity::capture)
            .await
            .context("Network lookup failed")
        {
            Ok(network) => network,
            Err(e) => break Err(e),
        };
        let frame = publisher.update(&session, network);

        let content = match format {
            OutputFormat::Json => opts.as_json(&frame),
            OutputFormat::Csv => Ok(format_status_csv(&frame, Local::now(), &opts)),
            OutputFormat::Text => Ok(format_status_text(&frame, &opts)),
        };
        if let Err(e) = content.and_then(|c| append_output(output, &c)) {
            break Err(e);
        }
        // One CSV header per stream.
        opts.no_header = true;

        if once || interrupt.sleep(Duration::from_secs(interval.max(1))).await {
            break Ok(());
        }
        if format == OutputFormat::Text {
            append_output(output, "\n")?;
        }
    };

    session.disconnect().await?;
    result
}
