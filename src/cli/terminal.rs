// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Terminal mode control and raw byte input.
//!
//! The input engine only talks to the terminal through [`TerminalControl`],
//! so its state machine can be driven by a scripted fake in tests.

use std::io::{self, IsTerminal, Read, Write};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{DisableLineWrap, EnableLineWrap, disable_raw_mode, enable_raw_mode};

use crate::error::{Error, Result};

pub(crate) trait TerminalControl {
    fn is_terminal(&self) -> bool;

    fn enable_raw_mode(&mut self) -> Result<()>;

    /// Restore the mode that was active before `enable_raw_mode`.
    fn disable_raw_mode(&mut self);

    /// Block until one byte is available. `None` at end of input.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Return the next byte only if it arrives within `timeout`.
    fn poll_byte(&mut self, timeout: Duration) -> Result<Option<u8>>;

    fn read_to_end(&mut self) -> Result<Vec<u8>>;
}

/// Keeps the terminal in raw mode while alive.
pub(crate) struct RawModeGuard<'a, T: TerminalControl + ?Sized> {
    terminal: &'a mut T,
}

impl<'a, T: TerminalControl + ?Sized> RawModeGuard<'a, T> {
    pub(crate) fn new(terminal: &'a mut T) -> Result<Self> {
        terminal.enable_raw_mode()?;
        Ok(Self { terminal })
    }
}

impl<T: TerminalControl + ?Sized> Deref for RawModeGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.terminal
    }
}

impl<T: TerminalControl + ?Sized> DerefMut for RawModeGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.terminal
    }
}

impl<T: TerminalControl + ?Sized> Drop for RawModeGuard<'_, T> {
    fn drop(&mut self) {
        self.terminal.disable_raw_mode();
    }
}

/// The process's stdin and stdout.
#[derive(Debug, Default)]
pub(crate) struct StdTerminal;

impl StdTerminal {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl TerminalControl for StdTerminal {
    fn is_terminal(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn enable_raw_mode(&mut self) -> Result<()> {
        enable_raw_mode()
            .map_err(|e| Error::Terminal(format!("enable raw input mode failed: {e}")))?;
        let _ = execute!(io::stdout(), DisableLineWrap);
        Ok(())
    }

    fn disable_raw_mode(&mut self) {
        let _ = execute!(io::stdout(), EnableLineWrap);
        if let Err(e) = disable_raw_mode() {
            tracing::warn!(error = %e, "failed to restore terminal mode");
        }
        let _ = io::stdout().flush();
    }

    #[cfg(unix)]
    fn read_byte(&mut self) -> Result<Option<u8>> {
        loop {
            let mut byte = 0u8;
            // SAFETY: reading one byte into a valid, writable one-byte buffer.
            let n = unsafe { libc::read(libc::STDIN_FILENO, (&mut byte as *mut u8).cast(), 1) };
            match n {
                1 => return Ok(Some(byte)),
                0 => return Ok(None),
                _ => {
                    let err = io::Error::last_os_error();
                    if err.kind() == io::ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(Error::Terminal(format!("read stdin failed: {err}")));
                }
            }
        }
    }

    #[cfg(unix)]
    fn poll_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        let mut fds = libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
        // SAFETY: `fds` is a single valid pollfd for the duration of the call.
        let ready = unsafe { libc::poll(&mut fds, 1, millis) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(None);
            }
            return Err(Error::Terminal(format!("poll stdin failed: {err}")));
        }
        if ready == 0 || fds.revents & libc::POLLIN == 0 {
            return Ok(None);
        }
        self.read_byte()
    }

    #[cfg(not(unix))]
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match io::stdin().read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(e) => Err(Error::Terminal(format!("read stdin failed: {e}"))),
        }
    }

    #[cfg(not(unix))]
    fn poll_byte(&mut self, _timeout: Duration) -> Result<Option<u8>> {
        // No portable non-blocking peek; every escape is treated as bare.
        Ok(None)
    }

    fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        io::stdin()
            .read_to_end(&mut data)
            .map_err(|e| Error::Terminal(format!("read stdin failed: {e}")))?;
        Ok(data)
    }
}
