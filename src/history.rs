// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

/// In-memory recall of previously entered commands, navigated with the
/// arrow keys like a shell history.
#[derive(Debug, Default, Clone)]
pub(crate) struct RecallBuffer {
    entries: Vec<String>,
    /// Equal to `entries.len()` when positioned past the newest entry.
    index: usize,
}

impl RecallBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns false when the entry was ignored (empty or a repeat of the
    /// most recent entry). The cursor is reset either way, unless empty.
    pub(crate) fn add(&mut self, cmd: &str) -> bool {
        if cmd.is_empty() {
            return false;
        }

        let added = if self.entries.last().is_some_and(|last| last == cmd) {
            false
        } else {
            self.entries.push(cmd.to_string());
            true
        };

        self.index = self.entries.len();
        added
    }

    /// Step back towards the oldest entry, stopping there.
    pub(crate) fn prev(&mut self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        self.index = self.index.saturating_sub(1);
        self.entries[self.index].clone()
    }

    /// Step forward towards the newest entry. Past the newest entry an empty
    /// string is returned and the cursor stays there.
    pub(crate) fn next(&mut self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        if self.index + 1 < self.entries.len() {
            self.index += 1;
            return self.entries[self.index].clone();
        }
        self.index = self.entries.len();
        String::new()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
