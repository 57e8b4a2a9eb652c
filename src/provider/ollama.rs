// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jason Ish

//! Client for Ollama-style `/api` servers.
//!
//! `send_chat` posts the whole retained session and decodes the streamed
//! reply object by object, handing every content delta to a [`ChatSink`] as
//! it arrives. The assistant message is appended to the session only after
//! the stream has finished.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ndjson::JsonObjectStream;
use crate::provider::{ChatOptions, ChatRequest, Role, StreamChunk};
use crate::reasoning::{ReasoningSplit, trim_empty_lines};
use crate::session::{ChatSession, estimate_text_tokens};
use crate::version::VERSION;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Receiver of streamed deltas.
pub(crate) trait ChatSink {
    fn on_content(&mut self, text: &str);

    fn on_reasoning(&mut self, _text: &str) {}
}

/// Outcome of one chat turn.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub(crate) struct ChatSummary {
    pub output: String,
    pub elapsed: String,
    pub tokens_per_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

pub(crate) fn build_client() -> Result<Client> {
    let client = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(format!("picochat/{VERSION}"))
        .build()?;
    Ok(client)
}

/// Build `<base>/api/<endpoint>`, adding `/api` only when the base URL does
/// not already end with it.
pub(crate) fn api_url(base: &str, endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(base.trim())
        .map_err(|e| Error::Config(format!("invalid url '{base}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "invalid url '{base}': expected an http or https url"
        )));
    }

    let path = url.path().trim_end_matches('/');
    let path = if path.ends_with("/api") {
        path.to_string()
    } else {
        format!("{path}/api")
    };
    url.set_path(&format!("{path}/{endpoint}"));
    Ok(url)
}

/// Elapsed whole seconds as `MM:SS`.
pub(crate) fn format_elapsed(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Estimated tokens per second, rounded to one decimal place.
pub(crate) fn token_speed(secs: u64, text: &str) -> f64 {
    if secs == 0 || text.is_empty() {
        return 0.0;
    }
    let speed = estimate_text_tokens(text) / secs as f64;
    (speed * 10.0).round() / 10.0
}

pub(crate) async fn send_chat(
    client: &Client,
    session: &mut ChatSession,
    config: &Config,
    sink: &mut dyn ChatSink,
) -> Result<ChatSummary> {
    let url = api_url(&config.url, "chat")?;
    let request = ChatRequest {
        model: &config.model,
        messages: session.messages(),
        stream: true,
        options: ChatOptions::from_parts(config.temperature, config.top_p),
        think: config.reasoning.then_some(true),
    };

    tracing::debug!(
        url = %url,
        model = %config.model,
        messages = session.len(),
        "sending chat request"
    );

    let start = Instant::now();
    let response = client
        .post(url.clone())
        .json(&request)
        .send()
        .await
        .map_err(|e| Error::Other(format!("Failed to connect to {url}: {e}")))?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return Err(Error::Api { status, message });
    }

    let mut content = String::new();
    let mut thinking = String::new();
    let mut stats: Option<(u64, u64)> = None;
    let mut saw_done = false;

    let mut stream = JsonObjectStream::new(response.bytes_stream());
    while let Some(chunk) = stream.next_object::<StreamChunk>().await {
        let chunk = chunk.inspect_err(|e| tracing::warn!(error = %e, "chat stream failed"))?;

        if !chunk.message.thinking.is_empty() {
            sink.on_reasoning(&chunk.message.thinking);
            thinking.push_str(&chunk.message.thinking);
        }
        if !chunk.message.content.is_empty() {
            sink.on_content(&chunk.message.content);
            content.push_str(&chunk.message.content);
        }

        if chunk.done {
            saw_done = true;
            stats = Some((chunk.prompt_eval_count, chunk.eval_count));
            break;
        }
    }

    if !saw_done {
        tracing::info!("stream ended without a done marker, keeping partial reply");
    }

    let content = trim_empty_lines(&content);
    if content.is_empty() {
        return Err(Error::NoContent);
    }

    let (reasoning, visible) = if thinking.is_empty() {
        ReasoningSplit::scan(&content).into_parts()
    } else {
        (trim_empty_lines(&thinking), content.clone())
    };

    session.add_message(Role::Assistant, visible.clone(), Some(&reasoning))?;

    let secs = start.elapsed().as_secs();
    let (prompt_eval_count, eval_count) = match stats {
        Some((p, e)) if p != 0 && e != 0 => {
            tracing::info!(prompt_eval_count = p, eval_count = e, "token stats");
            (Some(p), Some(e))
        }
        _ => (None, None),
    };

    Ok(ChatSummary {
        output: visible,
        elapsed: format_elapsed(secs),
        tokens_per_sec: token_speed(secs, &content),
        prompt_eval_count,
        eval_count,
    })
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Deserialize)]
struct VersionResponse {
    #[serde(default)]
    version: String,
}

async fn get_json<T: serde::de::DeserializeOwned>(client: &Client, url: Url) -> Result<T> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::Other(format!("Failed to connect to {url}: {e}")))?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return Err(Error::Api { status, message });
    }

    Ok(response.json().await?)
}

/// Names of the models installed on the server.
pub(crate) async fn list_models(client: &Client, base: &str) -> Result<Vec<String>> {
    let tags: TagsResponse = get_json(client, api_url(base, "tags")?).await?;
    Ok(tags.models.into_iter().map(|m| m.name).collect())
}

pub(crate) async fn server_version(client: &Client, base: &str) -> Result<String> {
    let version: VersionResponse = get_json(client, api_url(base, "version")?).await?;
    if version.version.is_empty() {
        return Err(Error::Other(
            "server response did not include a version".into(),
        ));
    }
    Ok(version.version)
}
