//! Command-line acquisition tool for the LI-COR Li-850 gas analyzer.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ports` | List serial ports |
//! | `watch` | Stream live readings |
//! | `record` | Record valid samples to a timestamped CSV file |
//! | `status` | Show the network/instrument status frame |
//! | `inspect` | Summarize a recorded CSV file |
//! | `config` | Manage CLI configuration |
//! | `completions` | Generate shell completions |

mod cli;
mod commands;
mod config;
mod format;
mod style;
mod util;

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{
    RecordArgs, StatusArgs, WatchArgs, cmd_config, cmd_inspect, cmd_ports, cmd_record,
    cmd_status, cmd_watch,
};
use config::Config;
use format::FormatOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "li850", &mut io::stdout());
        return Ok(());
    }

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::load();
    let opts = FormatOptions::new(cli.no_color || config.no_color)
        .with_compact(cli.compact)
        .with_no_header(cli.no_header);
    let output = cli.output.as_ref();

    match cli.command {
        Commands::Ports { all, format } => cmd_ports(all, format, output, &opts, &config)?,
        Commands::Watch {
            port,
            interval,
            count,
            format,
        } => {
            cmd_watch(
                WatchArgs {
                    port,
                    interval,
                    count,
                    format,
                    output,
                    quiet: cli.quiet,
                    opts: &opts,
                },
                &config,
            )
            .await?
        }
        Commands::Record {
            port,
            name,
            user,
            data_dir,
            duration,
            count,
        } => {
            cmd_record(
                RecordArgs {
                    port,
                    name,
                    user,
                    data_dir,
                    duration,
                    count,
                    output,
                    quiet: cli.quiet,
                    opts: &opts,
                },
                &config,
            )
            .await?
        }
        Commands::Status {
            port,
            once,
            interval,
            format,
        } => {
            cmd_status(
                StatusArgs {
                    port,
                    once,
                    interval,
                    format,
                    output,
                    quiet: cli.quiet,
                    opts: &opts,
                },
                &config,
            )
            .await?
        }
        Commands::Inspect { file, format } => cmd_inspect(&file, format, output, &opts)?,
        Commands::Config { action } => cmd_config(action, config, output, &opts)?,
        Commands::Completions { .. } => {
            // Already handled above
            unreachable!()
        }
    }

    Ok(())
}
