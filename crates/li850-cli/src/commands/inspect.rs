//! Inspect command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use li850_store::{read_recording, recording_stats};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_stats_csv, format_stats_text};
use crate::util::write_output;

pub fn cmd_inspect(
    file: &Path,
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let rows = read_recording(file)
        .with_context(|| format!("Failed to read recording {}", file.display()))?;
    let stats = recording_stats(&rows);
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let content = match format {
        OutputFormat::Json => opts.as_json(&stats)?,
        OutputFormat::Csv => format_stats_csv(&name, &stats, opts),
        OutputFormat::Text => format_stats_text(&name, &stats, opts),
    };
    write_output(output, &content)
}
