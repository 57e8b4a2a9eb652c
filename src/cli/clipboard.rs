// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Clipboard access through the platform's command line tools.

use std::env;
use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Read text from the clipboard. Surrounding whitespace is removed and an
/// empty clipboard is an error.
pub(crate) fn paste_text() -> Result<String> {
    let candidates: [(&str, &[&str]); 2] = [
        ("wl-paste", &["-n"]),
        ("xclip", &["-selection", "clipboard", "-o"]),
    ];

    for (program, args) in candidates {
        if let Ok(output) = Command::new(program).args(args).output()
            && output.status.success()
        {
            let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if text.is_empty() {
                return Err(Error::Clipboard("clipboard is empty".into()));
            }
            return Ok(text);
        }
    }

    Err(Error::Clipboard(
        "no clipboard tool available (install wl-clipboard or xclip)".into(),
    ))
}

/// Write text to the clipboard, and to the tmux paste buffer when running
/// inside tmux.
pub(crate) fn copy_text(text: &str) -> Result<()> {
    let candidates: [(&str, &[&str]); 2] = [
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard", "-i"]),
    ];

    let copied = candidates
        .into_iter()
        .any(|(program, args)| pipe_to(program, args, text).is_ok());

    let in_tmux = env::var_os("TMUX").is_some_and(|v| !v.is_empty());
    if in_tmux {
        pipe_to("tmux", &["load-buffer", "-"], text)
            .map_err(|e| Error::Clipboard(format!("tmux clipboard write failed: {e}")))?;
    }

    if !copied && !in_tmux {
        return Err(Error::Clipboard(
            "no clipboard tool available (install wl-clipboard or xclip)".into(),
        ));
    }
    Ok(())
}

fn pipe_to(program: &str, args: &[&str], text: &str) -> std::io::Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes())?;
    }

    let status = child.wait()?;
    if !status.success() {
        return Err(std::io::Error::other(format!(
            "{program} exited with {status}"
        )));
    }
    Ok(())
}
