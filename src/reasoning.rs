// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Separation of in-line `<think>...</think>` reasoning from visible content.

const OPEN_TAG: &str = "<think>";
const CLOSE_TAG: &str = "</think>";

/// Result of scanning a reply for reasoning markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReasoningSplit {
    /// A well-formed `<think>...</think>` pair was found.
    Paired { reasoning: String, content: String },
    /// Only a closing tag was found; the opening tag was truncated away.
    DanglingClose { reasoning: String, content: String },
    /// No markers at all.
    Plain { content: String },
}

impl ReasoningSplit {
    pub(crate) fn scan(text: &str) -> Self {
        if let Some(start) = text.find(OPEN_TAG)
            && let Some(rel_end) = text[start + OPEN_TAG.len()..].find(CLOSE_TAG)
        {
            let inner_start = start + OPEN_TAG.len();
            let inner_end = inner_start + rel_end;
            let reasoning = &text[inner_start..inner_end];

            // Remove every complete pair, keeping the text around them.
            let mut content = String::with_capacity(text.len());
            content.push_str(&text[..start]);
            let mut rest = &text[inner_end + CLOSE_TAG.len()..];
            while let Some(open) = rest.find(OPEN_TAG) {
                let Some(close) = rest[open + OPEN_TAG.len()..].find(CLOSE_TAG) else {
                    break;
                };
                content.push_str(&rest[..open]);
                rest = &rest[open + OPEN_TAG.len() + close + CLOSE_TAG.len()..];
            }
            content.push_str(rest);

            return ReasoningSplit::Paired {
                reasoning: trim_empty_lines(reasoning),
                content: trim_empty_lines(&content),
            };
        }

        if let Some((reasoning, content)) = text.split_once(CLOSE_TAG) {
            return ReasoningSplit::DanglingClose {
                reasoning: trim_empty_lines(reasoning),
                content: trim_empty_lines(content),
            };
        }

        ReasoningSplit::Plain {
            content: trim_empty_lines(text),
        }
    }

    /// Returns `(reasoning, content)`; reasoning is empty for `Plain`.
    pub(crate) fn into_parts(self) -> (String, String) {
        match self {
            ReasoningSplit::Paired { reasoning, content }
            | ReasoningSplit::DanglingClose { reasoning, content } => (reasoning, content),
            ReasoningSplit::Plain { content } => (String::new(), content),
        }
    }
}

/// Removes fully blank lines from the start and end of `s`.
pub(crate) fn trim_empty_lines(s: &str) -> String {
    let lines: Vec<&str> = s.split('\n').collect();
    let mut start = 0;
    let mut end = lines.len();
    while start < end && lines[start].trim().is_empty() {
        start += 1;
    }
    while start < end && lines[end - 1].trim().is_empty() {
        end -= 1;
    }
    lines[start..end].join("\n")
}

/// Returns the body of the first fenced code block in `s`.
pub(crate) fn extract_code_block(s: &str) -> Option<String> {
    let open = s.find("```")?;
    let after_fence = &s[open + 3..];
    // The info string (language) runs to the end of the fence line.
    let body_start = after_fence.find('\n')? + 1;
    let info = &after_fence[..body_start - 1];
    if !info.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].to_string())
}

/// Wraps reasoning in tags so it can be copied together with the answer.
pub(crate) fn enclose_in_think_tags(reasoning: &str) -> String {
    format!("{OPEN_TAG}\n{reasoning}\n{CLOSE_TAG}\n\n")
}
