// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("No content received from the model. Check the configured URL and model.")]
    NoContent,

    #[error("invalid role '{0}'")]
    InvalidRole(String),

    #[error("context size must be between {min} and {max}, got {got}")]
    ContextSize { min: usize, max: usize, got: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session corrupted: {0}")]
    SessionCorrupted(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns a concise message for the terminal.
    /// For API errors, returns just the response body without the status prefix.
    /// If the message is JSON, it will be pretty-printed.
    pub(crate) fn display_message(&self) -> String {
        match self {
            Error::Api { status, message } => {
                let body = if let Ok(json) = serde_json::from_str::<serde_json::Value>(message) {
                    serde_json::to_string_pretty(&json).unwrap_or_else(|_| message.clone())
                } else {
                    message.clone()
                };
                format!("server returned {status}: {body}")
            }
            other => other.to_string(),
        }
    }

    /// Whether the error most likely points at a misconfiguration rather than
    /// a connectivity problem.
    pub(crate) fn is_configuration_hint(&self) -> bool {
        matches!(self, Error::NoContent | Error::Config(_))
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
