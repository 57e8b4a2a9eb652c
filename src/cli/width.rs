// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jason Ish

//! Terminal column widths of code points.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Columns occupied by a single code point. Control characters count as 0.
pub(crate) fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

/// Columns occupied by `chars[..pos]`. `pos` is clamped to the slice length.
pub(crate) fn visual_width(chars: &[char], pos: usize) -> usize {
    let pos = pos.min(chars.len());
    chars[..pos].iter().map(|&c| char_width(c)).sum()
}

pub(crate) fn str_width(s: &str) -> usize {
    s.width()
}
