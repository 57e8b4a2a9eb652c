// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Chat session state and persistence.
//!
//! The session holds the ordered message history sent to the model. Index 0
//! is always the system prompt. When a context bound is set, the history is
//! compressed eagerly on every append: the system prompt and the newest
//! `max_context - 1` messages are kept, everything in between is dropped.
//!
//! Sessions are saved as flat JSON arrays:
//! ```text
//! <history dir>/
//!   2025-06-01_14-03-22.chat
//!   my-notes.chat
//! ```

use std::fs;
use std::path::Path;

use chrono::Local;

use crate::error::{Error, Result};
use crate::provider::{Message, Role};

pub(crate) const SESSION_SUFFIX: &str = ".chat";
pub(crate) const MIN_CONTEXT: usize = 3;
pub(crate) const MAX_CONTEXT: usize = 100;

/// Words-to-tokens factor of the token estimate.
const TOKENS_PER_WORD: f64 = 1.3;

#[derive(Debug, Clone)]
pub(crate) struct ChatSession {
    messages: Vec<Message>,
    /// 0 means unbounded.
    max_context: usize,
    context_limit_reached: bool,
    limit_notice_pending: bool,
}

impl ChatSession {
    pub(crate) fn new(system_prompt: impl Into<String>, max_context: usize) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
            max_context,
            context_limit_reached: false,
            limit_notice_pending: false,
        }
    }

    /// Append a message. Reasoning is only kept for assistant messages.
    pub(crate) fn add_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
        reasoning: Option<&str>,
    ) -> Result<()> {
        let message = match role {
            Role::Assistant => Message::assistant(content, reasoning.unwrap_or_default()),
            Role::User => Message::user(content),
            Role::System => Message::system(content),
        };
        self.push(message);
        Ok(())
    }

    /// Append a user message carrying base64 encoded images.
    pub(crate) fn add_user_with_images(&mut self, content: impl Into<String>, images: Vec<String>) {
        let mut message = Message::user(content);
        message.images = images;
        self.push(message);
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
        if self.max_context > 0 && self.messages.len() >= self.max_context {
            self.compress();
        }
    }

    fn compress(&mut self) {
        if !self.context_limit_reached {
            tracing::warn!(max_context = self.max_context, "context size limit reached");
            self.context_limit_reached = true;
            self.limit_notice_pending = true;
        }
        self.retain_newest(self.max_context);
    }

    /// Keep the system prompt plus the newest `bound - 1` messages.
    fn retain_newest(&mut self, bound: usize) {
        let keep = bound.saturating_sub(1);
        let excess = self.messages.len().saturating_sub(1 + keep);
        if excess > 0 {
            self.messages.drain(1..1 + excess);
        }
    }

    /// Returns true once after compression first fired, so the caller can
    /// surface the warning exactly once.
    pub(crate) fn take_limit_notice(&mut self) -> bool {
        std::mem::take(&mut self.limit_notice_pending)
    }

    /// Remove the last message if it is an assistant reply.
    pub(crate) fn discard_last(&mut self) {
        if self.messages.len() <= 1 {
            return;
        }
        if self
            .messages
            .last()
            .is_some_and(|m| m.role == Role::Assistant)
        {
            self.messages.pop();
        }
    }

    pub(crate) fn clear_except_system(&mut self) {
        self.messages.truncate(1);
        self.context_limit_reached = false;
        self.limit_notice_pending = false;
    }

    pub(crate) fn set_context_size(&mut self, n: usize) -> Result<()> {
        if !(MIN_CONTEXT..=MAX_CONTEXT).contains(&n) {
            return Err(Error::ContextSize {
                min: MIN_CONTEXT,
                max: MAX_CONTEXT,
                got: n,
            });
        }
        if self.max_context == n {
            return Ok(());
        }

        self.max_context = n;
        if self.messages.len() >= n {
            self.retain_newest(n);
        }
        self.context_limit_reached = self.messages.len() >= n;
        Ok(())
    }

    /// Replace the whole history, e.g. with a loaded session.
    pub(crate) fn replace_all(&mut self, messages: Vec<Message>) -> Result<()> {
        match messages.first() {
            Some(first) if first.role == Role::System => {}
            Some(first) => {
                return Err(Error::SessionCorrupted(format!(
                    "first message must be the system prompt, found '{}'",
                    first.role
                )));
            }
            None => return Err(Error::SessionCorrupted("session has no messages".into())),
        }

        self.messages = messages;
        self.context_limit_reached = false;
        self.limit_notice_pending = false;
        if self.max_context > 0 && self.messages.len() > self.max_context {
            self.retain_newest(self.max_context);
            self.context_limit_reached = true;
        }
        Ok(())
    }

    pub(crate) fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when only the system prompt is present.
    pub(crate) fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }

    pub(crate) fn system_prompt(&self) -> &str {
        self.messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    pub(crate) fn max_context(&self) -> usize {
        self.max_context
    }

    pub(crate) fn context_limit_reached(&self) -> bool {
        self.context_limit_reached
    }

    pub(crate) fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub(crate) fn last_by_role(&self, role: Role) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == role)
    }

    /// Rough token count of the retained history.
    ///
    /// This is a word-count heuristic (`words * 1.3` per message), not a
    /// tokenizer, and does not match any model's real token count.
    pub(crate) fn estimate_tokens(&self) -> u64 {
        self.messages
            .iter()
            .map(|m| {
                let words = word_count(&m.reasoning) + word_count(&m.content);
                (words as f64 * TOKENS_PER_WORD).round() as u64
            })
            .sum()
    }
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Estimated tokens of a piece of text, unrounded.
pub(crate) fn estimate_text_tokens(s: &str) -> f64 {
    word_count(s) as f64 * TOKENS_PER_WORD
}

fn ensure_suffix(name: &str) -> String {
    if name.ends_with(SESSION_SUFFIX) {
        name.to_string()
    } else {
        format!("{name}{SESSION_SUFFIX}")
    }
}

/// Only the final path component of a user supplied name is used.
fn base_name(name: &str) -> Result<String> {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Session(format!("invalid session name '{name}'")))
}

/// Save messages to `dir`. Generates a timestamp name when `name` is empty.
/// Returns the file name used.
pub(crate) fn save_session(dir: &Path, name: &str, messages: &[Message]) -> Result<String> {
    let name = name.trim();
    if name.starts_with('#') {
        return Err(Error::Session("filename must not start with '#'".into()));
    }

    let filename = if name.is_empty() {
        ensure_suffix(&Local::now().format("%Y-%m-%d_%H-%M-%S").to_string())
    } else {
        ensure_suffix(&base_name(name)?)
    };

    fs::create_dir_all(dir)?;
    let path = dir.join(&filename);
    if path.exists() {
        return Err(Error::Session(format!("'{filename}' already exists")));
    }

    let json = serde_json::to_string_pretty(messages)?;
    fs::write(&path, json)?;
    tracing::debug!(path = %path.display(), count = messages.len(), "session saved");

    Ok(filename)
}

/// Load the messages of a saved session. Reasoning is always empty.
pub(crate) fn load_session(dir: &Path, name: &str) -> Result<Vec<Message>> {
    let filename = ensure_suffix(&base_name(name.trim())?);
    let path = dir.join(&filename);

    let data = fs::read_to_string(&path)
        .map_err(|e| Error::Session(format!("could not read {}: {e}", path.display())))?;
    let messages: Vec<Message> = serde_json::from_str(&data)
        .map_err(|e| Error::SessionCorrupted(format!("{filename}: {e}")))?;

    tracing::debug!(path = %path.display(), count = messages.len(), "session loaded");
    Ok(messages)
}

/// Saved session file names in `dir`, sorted.
pub(crate) fn list_sessions(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(SESSION_SUFFIX))
        .collect();
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn contents(session: &ChatSession) -> Vec<&str> {
        session
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect()
    }

    #[test]
    fn test_new_session_has_only_system_prompt() {
        let session = ChatSession::new("hello world", 5);
        assert_eq!(session.len(), 1);
        assert_eq!(session.messages()[0].role, Role::System);
        assert_eq!(session.system_prompt(), "hello world");
        assert!(session.is_empty());
    }

    #[test]
    fn test_compression_keeps_system_and_newest() {
        let mut session = ChatSession::new("system prompt", 5);
        for i in 1..=10 {
            session
                .add_message(Role::User, format!("msg {i}"), None)
                .unwrap();
        }
        assert_eq!(
            contents(&session),
            vec!["system prompt", "msg 7", "msg 8", "msg 9", "msg 10"]
        );
        assert!(session.context_limit_reached());
    }

    #[test]
    fn test_bound_holds_for_every_append() {
        for max in [3, 4, 7] {
            let mut session = ChatSession::new("sys", max);
            for i in 0..25 {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                session.add_message(role, format!("{i}"), None).unwrap();
                assert!(session.len() <= max);
                assert_eq!(session.messages()[0].role, Role::System);
                assert_eq!(session.last().unwrap().content, format!("{i}"));
            }
            // The retained tail is the newest `max - 1` in original order.
            let expected: Vec<String> = (25 - (max - 1)..25).map(|i| i.to_string()).collect();
            let tail: Vec<String> = session.messages()[1..]
                .iter()
                .map(|m| m.content.clone())
                .collect();
            assert_eq!(tail, expected);
        }
    }

    #[test]
    fn test_limit_notice_fires_once_and_resets_on_clear() {
        let mut session = ChatSession::new("sys", 3);
        session.add_message(Role::User, "a", None).unwrap();
        assert!(!session.take_limit_notice());
        session.add_message(Role::User, "b", None).unwrap();
        assert!(session.take_limit_notice());
        session.add_message(Role::User, "c", None).unwrap();
        assert!(!session.take_limit_notice());

        session.clear_except_system();
        assert!(!session.context_limit_reached());
        assert_eq!(session.len(), 1);
        session.add_message(Role::User, "d", None).unwrap();
        session.add_message(Role::User, "e", None).unwrap();
        assert!(session.take_limit_notice());
    }

    #[test]
    fn test_unbounded_session_never_compresses() {
        let mut session = ChatSession::new("sys", 0);
        for i in 0..200 {
            session.add_message(Role::User, format!("{i}"), None).unwrap();
        }
        assert_eq!(session.len(), 201);
        assert!(!session.context_limit_reached());
    }

    #[test]
    fn test_reasoning_only_kept_for_assistant() {
        let mut session = ChatSession::new("sys", 10);
        session
            .add_message(Role::User, "question", Some("ignored"))
            .unwrap();
        session
            .add_message(Role::Assistant, "answer", Some("because"))
            .unwrap();
        assert_eq!(session.messages()[1].reasoning, "");
        assert_eq!(session.messages()[2].reasoning, "because");
    }

    #[test]
    fn test_set_context_size() {
        let mut session = ChatSession::new("system prompt", 10);
        for i in 1..10 {
            session
                .add_message(Role::User, format!("msg {i}"), None)
                .unwrap();
        }
        assert_eq!(session.len(), 10);

        for bad in [0, 2, 101, 200] {
            assert!(matches!(
                session.set_context_size(bad),
                Err(Error::ContextSize { .. })
            ));
            assert_eq!(session.len(), 10);
            assert_eq!(session.max_context(), 10);
        }

        session.set_context_size(10).unwrap();
        assert_eq!(session.len(), 10);

        session.set_context_size(3).unwrap();
        assert_eq!(contents(&session), vec!["system prompt", "msg 8", "msg 9"]);
        assert!(session.context_limit_reached());

        session.set_context_size(8).unwrap();
        assert_eq!(session.len(), 3);
        assert!(!session.context_limit_reached());
    }

    #[test]
    fn test_discard_last() {
        let mut session = ChatSession::new("sys", 10);
        session.discard_last();
        assert_eq!(session.len(), 1);

        session.add_message(Role::User, "hi", None).unwrap();
        session.discard_last();
        assert_eq!(session.len(), 2);

        session.add_message(Role::Assistant, "hello", None).unwrap();
        session.discard_last();
        assert_eq!(session.len(), 2);
        assert_eq!(session.last().unwrap().role, Role::User);
    }

    #[test]
    fn test_last_by_role() {
        let mut session = ChatSession::new("init", 10);
        session.add_message(Role::User, "hello", None).unwrap();
        session.add_message(Role::Assistant, "hi", None).unwrap();
        session.add_message(Role::User, "bye", None).unwrap();

        assert_eq!(session.last_by_role(Role::User).unwrap().content, "bye");
        assert_eq!(session.last_by_role(Role::Assistant).unwrap().content, "hi");
        assert_eq!(session.last_by_role(Role::System).unwrap().content, "init");

        let empty = ChatSession::new("empty", 5);
        assert!(empty.last_by_role(Role::User).is_none());
    }

    #[test]
    fn test_estimate_tokens_includes_reasoning() {
        let mut session = ChatSession::new("one two three", 10);
        // 3 words * 1.3 = 3.9 -> 4
        assert_eq!(session.estimate_tokens(), 4);

        session
            .add_message(Role::Assistant, "", Some("hidden reasoning text here"))
            .unwrap();
        // 4 words * 1.3 = 5.2 -> 5
        assert_eq!(session.estimate_tokens(), 9);
    }

    #[test]
    fn test_replace_all_requires_system_first() {
        let mut session = ChatSession::new("init", 5);
        let err = session
            .replace_all(vec![Message::user("no system")])
            .unwrap_err();
        assert!(matches!(err, Error::SessionCorrupted(_)));
        assert_eq!(contents(&session), vec!["init"]);

        session
            .replace_all(vec![
                Message::system("replaced system"),
                Message::user("replaced message"),
            ])
            .unwrap();
        assert_eq!(
            contents(&session),
            vec!["replaced system", "replaced message"]
        );
    }

    #[test]
    fn test_replace_all_applies_current_bound() {
        let mut session = ChatSession::new("init", 3);
        let mut loaded = vec![Message::system("sys")];
        loaded.extend((1..=5).map(|i| Message::user(format!("m{i}"))));
        session.replace_all(loaded).unwrap();
        assert_eq!(contents(&session), vec!["sys", "m4", "m5"]);
    }

    #[test]
    fn test_save_and_load_drops_reasoning() {
        let dir = TempDir::new().unwrap();
        let mut session = ChatSession::new("persist me", 5);
        session.add_message(Role::User, "data", None).unwrap();
        session
            .add_message(Role::Assistant, "visible content", Some("private"))
            .unwrap();

        let filename = save_session(dir.path(), "", session.messages()).unwrap();
        assert!(filename.ends_with(SESSION_SUFFIX));

        let loaded = load_session(dir.path(), &filename).unwrap();
        assert_eq!(loaded.len(), 3);
        for (orig, back) in session.messages().iter().zip(&loaded) {
            assert_eq!(orig.role, back.role);
            assert_eq!(orig.content, back.content);
            assert_eq!(back.reasoning, "");
        }
    }

    #[test]
    fn test_save_rules() {
        let dir = TempDir::new().unwrap();
        let messages = [Message::system("sys")];

        assert!(save_session(dir.path(), "#1", &messages).is_err());

        let name = save_session(dir.path(), "../../escape", &messages).unwrap();
        assert_eq!(name, "escape.chat");
        assert!(dir.path().join("escape.chat").exists());

        let err = save_session(dir.path(), "escape.chat", &messages).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        // Loading works with or without the suffix.
        assert_eq!(load_session(dir.path(), "escape").unwrap().len(), 1);
    }

    #[test]
    fn test_list_sessions() {
        let dir = TempDir::new().unwrap();
        let messages = [Message::system("sys")];
        save_session(dir.path(), "b", &messages).unwrap();
        save_session(dir.path(), "a", &messages).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(
            list_sessions(dir.path()).unwrap(),
            vec!["a.chat".to_string(), "b.chat".to_string()]
        );
        assert!(
            list_sessions(&dir.path().join("missing"))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_load_corrupted_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.chat"), "{not json").unwrap();
        assert!(matches!(
            load_session(dir.path(), "bad"),
            Err(Error::SessionCorrupted(_))
        ));
    }
}
