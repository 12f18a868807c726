//! Ports command implementation.

use std::path::PathBuf;

use anyhow::Result;
use li850_core::{PortFilter, list_port_details};

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::format::{FormatOptions, format_ports_csv, format_ports_json, format_ports_text};
use crate::util::write_output;

pub fn cmd_ports(
    all: bool,
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
    config: &Config,
) -> Result<()> {
    let filter = if all {
        PortFilter::allow_all()
    } else {
        config.port_filter()
    };
    let ports = list_port_details(&filter);

    let content = match format {
        OutputFormat::Json => format_ports_json(&ports, opts)?,
        OutputFormat::Csv => format_ports_csv(&ports, opts),
        OutputFormat::Text => format_ports_text(&ports, opts),
    };
    write_output(output, &content)
}
