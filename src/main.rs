// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

mod cli;
mod commands;
mod config;
mod error;
mod history;
mod logging;
mod ndjson;
mod output;
mod provider;
mod reasoning;
mod session;
mod version;

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputFormat;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "picochat")]
#[command(about = "Chat with a local language model from the terminal")]
#[command(version = version::VERSION)]
#[command(styles = STYLES, color = clap::ColorChoice::Auto)]
struct Args {
    #[arg(
        short,
        long,
        value_name = "PATH|@NAME",
        help = "Configuration file, or @name for <config dir>/name.toml"
    )]
    config: Option<String>,

    #[arg(long, value_name = "NAME", help = "Start from a saved session")]
    history: Option<String>,

    #[arg(short, long, help = "Model to use instead of the configured one")]
    model: Option<String>,

    #[arg(short, long, help = "Hide the spinner and statistics")]
    quiet: bool,

    #[arg(short, long, value_enum, help = "Output format of each reply")]
    format: Option<OutputFormat>,
}

fn load_config(args: &Args) -> Result<cli::CliArgs> {
    let dir = config::config_dir()?;
    let config_path = config::config_file(&dir, args.config.as_deref());

    let mut config = Config::load(&config_path)?;
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    config.quiet |= args.quiet;
    config.validate()?;

    let history_dir = config::history_dir(&dir);
    fs::create_dir_all(&history_dir).map_err(|e| {
        Error::Config(format!(
            "failed to create history directory {}: {e}",
            history_dir.display()
        ))
    })?;

    tracing::debug!(config = %config_path.display(), model = %config.model, "configuration loaded");

    Ok(cli::CliArgs {
        config,
        config_path,
        history_dir,
        history: args.history.clone(),
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = match logging::init() {
        Ok(guard) => Some(guard),
        Err(e) => {
            output::print_warning(&format!("logging disabled: {}", e.display_message()));
            None
        }
    };

    let cli_args = match load_config(&args) {
        Ok(cli_args) => cli_args,
        Err(e) => {
            output::print_error(&e.display_message());
            return ExitCode::FAILURE;
        }
    };

    match cli::run(cli_args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "session ended with an error");
            output::print_error(&e.display_message());
            ExitCode::FAILURE
        }
    }
}
