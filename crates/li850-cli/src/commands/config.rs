//! Config command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::cli::ConfigAction;
use crate::config::Config;
use crate::format::FormatOptions;
use crate::style;
use crate::util::write_output;

pub fn cmd_config(
    action: ConfigAction,
    config: Config,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let path = Config::path();
    match action {
        ConfigAction::Show => {
            let content = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            write_output(output, &content)
        }
        ConfigAction::Get { key } => {
            let value = config.get(key).unwrap_or_default();
            write_output(output, &format!("{}\n", value))
        }
        ConfigAction::Set { key, value } => {
            let mut config = config;
            config.set(key, &value)?;
            config.save()?;
            eprintln!(
                "{}",
                style::format_success(&format!("Saved to {}", path.display()), opts.no_color)
            );
            Ok(())
        }
        ConfigAction::Unset { key } => {
            let mut config = config;
            config.unset(key);
            config.save()?;
            eprintln!(
                "{}",
                style::format_success(&format!("Saved to {}", path.display()), opts.no_color)
            );
            Ok(())
        }
        ConfigAction::Path => write_output(output, &format!("{}\n", path.display())),
        ConfigAction::Init => {
            if path.exists() {
                eprintln!(
                    "{}",
                    style::format_warning(
                        &format!("Config already exists at {}", path.display()),
                        opts.no_color
                    )
                );
                return Ok(());
            }
            Config::default().save()?;
            eprintln!(
                "{}",
                style::format_success(
                    &format!("Created {}", path.display()),
                    opts.no_color
                )
            );
            Ok(())
        }
    }
}
