// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Multiline line editor on a raw terminal.
//!
//! Enter on the first line submits a `/command`; any other Enter starts a new
//! line, and Ctrl+D submits everything typed so far. Ctrl+C and a bare Escape
//! abort the entry. Up/Down recall earlier commands.

use std::io::{self, Write};
use std::time::Duration;

use colored::Colorize;
use crossterm::cursor::{MoveLeft, MoveRight, MoveToColumn};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};

use super::terminal::{RawModeGuard, TerminalControl};
use super::width::{char_width, str_width, visual_width};
use crate::error::Result;
use crate::history::RecallBuffer;

pub(crate) const PROMPT: &str = ">>> ";
const PLACEHOLDER: &str = "Send a message (/? for help)";

/// How long to wait for the rest of an escape sequence.
const ESCAPE_TIMEOUT: Duration = Duration::from_millis(25);

const CTRL_C: u8 = 3;
const CTRL_D: u8 = 4;
const ESC: u8 = 27;
const BACKSPACE: u8 = 127;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InputEvent {
    Text { text: String, end_of_input: bool },
    Command { text: String, end_of_input: bool },
    /// Ctrl+C or Escape. The caller should prompt again.
    Aborted,
}

impl InputEvent {
    fn from_piped(data: &str) -> Self {
        let text = data.trim().to_string();
        if text.starts_with('/') {
            InputEvent::Command {
                text,
                end_of_input: true,
            }
        } else {
            InputEvent::Text {
                text,
                end_of_input: true,
            }
        }
    }
}

/// The line being edited.
#[derive(Debug, Default)]
struct EditableLine {
    runes: Vec<char>,
    cursor: usize,
    is_first_line: bool,
}

impl EditableLine {
    fn first() -> Self {
        Self {
            is_first_line: true,
            ..Default::default()
        }
    }

    fn insert(&mut self, c: char) {
        let pos = self.cursor.min(self.runes.len());
        self.runes.insert(pos, c);
        self.cursor = pos + 1;
    }

    /// Delete the code point before the cursor. False at column 0.
    fn backspace(&mut self) -> bool {
        if self.cursor == 0 || self.runes.is_empty() {
            return false;
        }
        self.cursor -= 1;
        self.runes.remove(self.cursor);
        true
    }

    /// Move left one code point, returning the columns crossed.
    fn move_left(&mut self) -> Option<usize> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(char_width(self.runes[self.cursor]))
    }

    fn move_right(&mut self) -> Option<usize> {
        if self.cursor >= self.runes.len() {
            return None;
        }
        let width = char_width(self.runes[self.cursor]);
        self.cursor += 1;
        Some(width)
    }

    fn replace(&mut self, text: &str) {
        self.runes = text.chars().collect();
        self.cursor = self.runes.len();
    }

    fn text(&self) -> String {
        self.runes.iter().collect()
    }
}

pub(crate) struct InputEngine<T, W> {
    terminal: T,
    out: W,
    recall: RecallBuffer,
}

impl<T: TerminalControl, W: Write> InputEngine<T, W> {
    pub(crate) fn new(terminal: T, out: W) -> Self {
        Self {
            terminal,
            out,
            recall: RecallBuffer::new(),
        }
    }

    pub(crate) fn is_interactive(&self) -> bool {
        self.terminal.is_terminal()
    }

    /// Read one complete entry.
    pub(crate) fn read_multiline_input(&mut self) -> Result<InputEvent> {
        if !self.terminal.is_terminal() {
            let data = self.terminal.read_to_end()?;
            return Ok(InputEvent::from_piped(&String::from_utf8_lossy(&data)));
        }

        let mut terminal = RawModeGuard::new(&mut self.terminal)?;
        let out = &mut self.out;
        let recall = &mut self.recall;

        let mut lines: Vec<String> = Vec::new();
        let mut line = EditableLine::first();
        redraw(out, &line)?;

        loop {
            let Some(c) = read_char(&mut *terminal)? else {
                // Input closed while typing.
                write_crlf(out)?;
                if !line.runes.is_empty() {
                    lines.push(line.text());
                }
                return Ok(InputEvent::Text {
                    text: lines.join("\n"),
                    end_of_input: true,
                });
            };

            match c {
                c if c == CTRL_C as char => {
                    abort_line(out, &line)?;
                    return Ok(InputEvent::Aborted);
                }
                c if c == CTRL_D as char => {
                    write_crlf(out)?;
                    if !line.runes.is_empty() {
                        lines.push(line.text());
                    }
                    return Ok(InputEvent::Text {
                        text: lines.join("\n"),
                        end_of_input: false,
                    });
                }
                c if c == ESC as char => {
                    let Some(first) = terminal.poll_byte(ESCAPE_TIMEOUT)? else {
                        abort_line(out, &line)?;
                        return Ok(InputEvent::Aborted);
                    };
                    let Some(second) = terminal.poll_byte(ESCAPE_TIMEOUT)? else {
                        continue;
                    };
                    if first != b'[' {
                        continue;
                    }
                    match second {
                        b'A' if line.is_first_line && !recall.is_empty() => {
                            line.replace(&recall.prev());
                            redraw(out, &line)?;
                        }
                        b'B' if line.is_first_line => {
                            let recalled = recall.next();
                            line.replace(&recalled);
                            redraw(out, &line)?;
                        }
                        b'C' => {
                            if let Some(width) = line.move_right() {
                                move_cursor(out, width, true)?;
                            }
                        }
                        b'D' => {
                            if let Some(width) = line.move_left() {
                                move_cursor(out, width, false)?;
                            }
                        }
                        final_byte => skip_csi(&mut *terminal, final_byte)?,
                    }
                }
                c if c == BACKSPACE as char => {
                    if line.backspace() {
                        redraw(out, &line)?;
                    }
                }
                '\r' | '\n' => {
                    let text = line.text();
                    let trimmed = text.trim();

                    if line.is_first_line && trimmed.starts_with('/') {
                        write_crlf(out)?;
                        let command = trimmed.to_string();
                        if recall.add(&command) {
                            tracing::trace!(entries = recall.len(), "command recorded");
                        }
                        return Ok(InputEvent::Command {
                            text: command,
                            end_of_input: false,
                        });
                    }

                    if line.is_first_line && trimmed.is_empty() {
                        line = EditableLine::first();
                        redraw(out, &line)?;
                        continue;
                    }

                    lines.push(text);
                    line = EditableLine::default();
                    write_crlf(out)?;
                }
                c => {
                    line.insert(c);
                    redraw(out, &line)?;
                }
            }
        }
    }

    #[cfg(test)]
    fn recall_mut(&mut self) -> &mut RecallBuffer {
        &mut self.recall
    }

    #[cfg(test)]
    pub(super) fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }
}

/// Consume the rest of a CSI sequence such as `ESC[3~` or `ESC[1;5C`,
/// stopping at its final byte.
fn skip_csi<T: TerminalControl + ?Sized>(terminal: &mut T, mut byte: u8) -> Result<()> {
    while !(0x40..=0x7e).contains(&byte) {
        match terminal.poll_byte(ESCAPE_TIMEOUT)? {
            Some(next) => byte = next,
            None => break,
        }
    }
    Ok(())
}

/// Decode one UTF-8 code point. Invalid sequences become U+FFFD.
fn read_char<T: TerminalControl + ?Sized>(terminal: &mut T) -> Result<Option<char>> {
    let Some(lead) = terminal.read_byte()? else {
        return Ok(None);
    };

    let len = match lead {
        0x00..=0x7f => return Ok(Some(lead as char)),
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
    };

    let mut buf = [lead, 0, 0, 0];
    for slot in buf.iter_mut().take(len).skip(1) {
        match terminal.read_byte()? {
            Some(byte) => *slot = byte,
            None => return Ok(Some(char::REPLACEMENT_CHARACTER)),
        }
    }

    Ok(Some(
        std::str::from_utf8(&buf[..len])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER),
    ))
}

fn redraw<W: Write>(out: &mut W, line: &EditableLine) -> io::Result<()> {
    let prefix = if line.is_first_line { PROMPT } else { "" };

    queue!(out, MoveToColumn(0), Clear(ClearType::UntilNewLine), Print(prefix))?;
    if line.is_first_line && line.runes.is_empty() {
        queue!(out, Print(PLACEHOLDER.dimmed()))?;
    } else {
        queue!(out, Print(line.text()))?;
    }

    let column = str_width(prefix) + visual_width(&line.runes, line.cursor);
    queue!(out, MoveToColumn(column as u16))?;
    out.flush()
}

fn move_cursor<W: Write>(out: &mut W, width: usize, right: bool) -> io::Result<()> {
    if width == 0 {
        return Ok(());
    }
    if right {
        queue!(out, MoveRight(width as u16))?;
    } else {
        queue!(out, MoveLeft(width as u16))?;
    }
    out.flush()
}

fn abort_line<W: Write>(out: &mut W, line: &EditableLine) -> io::Result<()> {
    if line.is_first_line {
        queue!(out, MoveToColumn(0), Clear(ClearType::UntilNewLine))?;
    } else {
        queue!(out, Print("\r\n"))?;
    }
    out.flush()
}

fn write_crlf<W: Write>(out: &mut W) -> io::Result<()> {
    queue!(out, Print("\r\n"))?;
    out.flush()
}
