// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Progress spinner shown while waiting for the first streamed token.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

const HIDE_CURSOR: &str = "\x1b[?25l";
const SHOW_CURSOR: &str = "\x1b[?25h";
const CLEAR_LINE: &str = "\r\x1b[K";

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Cloneable stop switch for a running spinner.
///
/// The writer lock is held both while drawing a frame and while stopping, so
/// once `stop` returns no further frame can be drawn.
#[derive(Clone)]
pub(crate) struct SpinnerHandle {
    token: CancellationToken,
    out: Option<SharedWriter>,
}

impl SpinnerHandle {
    /// Stop the animation and clear its line. Safe to call repeatedly.
    pub(crate) fn stop(&self) {
        let Some(out) = &self.out else {
            return;
        };
        let Ok(mut out) = out.lock() else {
            self.token.cancel();
            return;
        };
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        let _ = write!(out, "{CLEAR_LINE}{SHOW_CURSOR}");
        let _ = out.flush();
    }
}

pub(crate) struct Spinner {
    handle: SpinnerHandle,
    task: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Start animating on stdout.
    pub(crate) fn start() -> Self {
        Self::start_with(Box::new(io::stdout()))
    }

    /// A spinner that never draws anything.
    pub(crate) fn disabled() -> Self {
        Self {
            handle: SpinnerHandle {
                token: CancellationToken::new(),
                out: None,
            },
            task: None,
        }
    }

    fn start_with(out: Box<dyn Write + Send>) -> Self {
        let token = CancellationToken::new();
        let out: SharedWriter = Arc::new(Mutex::new(out));
        let task = tokio::spawn(animate(token.clone(), out.clone()));
        Self {
            handle: SpinnerHandle {
                token,
                out: Some(out),
            },
            task: Some(task),
        }
    }

    pub(crate) fn handle(&self) -> SpinnerHandle {
        self.handle.clone()
    }

    /// Stop the spinner and wait for its task to finish.
    pub(crate) async fn stop(mut self) {
        self.handle.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

async fn animate(token: CancellationToken, out: SharedWriter) {
    if let Ok(mut out) = out.lock() {
        let _ = write!(out, "{CLEAR_LINE}{HIDE_CURSOR}");
        let _ = out.flush();
    }

    for frame in FRAMES.iter().cycle() {
        {
            let Ok(mut out) = out.lock() else {
                return;
            };
            if token.is_cancelled() {
                return;
            }
            let _ = write!(out, "\r{frame}");
            let _ = out.flush();
        }

        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(FRAME_INTERVAL) => {}
        }
    }
}
