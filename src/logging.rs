// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Diagnostics go to a log file so they never mix with the raw terminal.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::error::{Error, Result};

const LOG_FILE: &str = "picochat.log";
const DEFAULT_FILTER: &str = "warn";

fn log_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("picochat"))
}

/// Install the file logger. `RUST_LOG` overrides the default `warn` level.
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub(crate) fn init() -> Result<WorkerGuard> {
    let dir = log_dir().ok_or_else(|| Error::Other("no cache directory for the log file".into()))?;
    fs::create_dir_all(&dir)?;

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options.open(dir.join(LOG_FILE))?;

    let (writer, guard) = non_blocking(file);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(filter);

    let _ = tracing_subscriber::registry().with(layer).try_init();
    Ok(guard)
}
