// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

use std::fmt;
use std::io::{self, Write};

use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::provider::ollama::ChatSummary;

/// Clears the current terminal line so messages never mix with a spinner.
const CLEAR_LINE: &str = "\r\x1b[K";

/// How the result of a chat turn is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum OutputFormat {
    /// Streamed text followed by a statistics line
    #[default]
    Plain,
    /// The summary as one line of JSON
    Json,
    /// The summary as indented JSON
    JsonPretty,
    /// The summary as YAML
    Yaml,
}

impl OutputFormat {
    /// Whether reply text is echoed while it streams.
    pub(crate) fn streams_text(&self) -> bool {
        matches!(self, OutputFormat::Plain)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Plain => "plain",
            OutputFormat::Json => "json",
            OutputFormat::JsonPretty => "json-pretty",
            OutputFormat::Yaml => "yaml",
        })
    }
}

/// Write the result of a chat turn in the requested format.
pub(crate) fn render_summary(
    w: &mut dyn Write,
    summary: &ChatSummary,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    match format {
        OutputFormat::Plain => {
            // Terminates the streamed text.
            writeln!(w)?;
            if !quiet {
                writeln!(w)?;
                let stats = format!(
                    "elapsed (mm:ss): {} | tok/s: {:.1}",
                    summary.elapsed, summary.tokens_per_sec
                );
                writeln!(w, "{}", stats.dimmed())?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *w, summary)?;
            writeln!(w)?;
        }
        OutputFormat::JsonPretty => {
            serde_json::to_writer_pretty(&mut *w, summary)?;
            writeln!(w)?;
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(summary)
                .map_err(|e| Error::Other(format!("failed to encode yaml: {e}")))?;
            w.write_all(yaml.as_bytes())?;
        }
    }
    w.flush()?;
    Ok(())
}

pub(crate) fn print_error(message: &str) {
    let mut stderr = io::stderr();
    let _ = writeln!(stderr, "{CLEAR_LINE}{} {message}", "✗".red());
}

pub(crate) fn print_warning(message: &str) {
    let mut stderr = io::stderr();
    let _ = writeln!(stderr, "{CLEAR_LINE}{} {message}", "!".yellow());
}

pub(crate) fn print_info(message: &str) {
    let mut stdout = io::stdout();
    let _ = writeln!(stdout, "{CLEAR_LINE}{message}");
}
