//! Anthropic Messages API streaming client.
//!
//! Thin HTTP wrapper for `/v1/messages` with `stream: true`. Pure event
//! interpretation in `parse_messages_event` for testability.

use frames::{Role, SseEvent, WireMessage};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::stream::{EventAction, delta_stream, open_event_stream};
use super::types::{DeltaStream, LlmError, LlmStream};

const API_VERSION: &str = "2023-06-01";

// =============================================================================
// CLIENT
// =============================================================================

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicClient {
    #[must_use]
    pub fn new(http: reqwest::Client, api_key: String, base_url: String, max_tokens: u32) -> Self {
        Self { http, api_key, base_url, max_tokens }
    }
}

#[async_trait::async_trait]
impl LlmStream for AnthropicClient {
    async fn stream_chat(&self, model: &str, messages: &[WireMessage]) -> Result<DeltaStream, LlmError> {
        let (system, turns) = split_system(messages);
        let body = ApiRequest {
            model,
            max_tokens: self.max_tokens,
            system: if system.is_empty() { None } else { Some(system.as_str()) },
            messages: &turns,
            stream: true,
        };

        let request = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let response = open_event_stream(request).await?;
        Ok(delta_stream(response, parse_messages_event))
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [&'a WireMessage],
    stream: bool,
}

/// The Messages API takes system text as a top-level field, not as a turn.
fn split_system(messages: &[WireMessage]) -> (String, Vec<&WireMessage>) {
    let system = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let turns = messages.iter().filter(|m| m.role != Role::System).collect();
    (system, turns)
}

// =============================================================================
// EVENT PARSING
// =============================================================================

pub(crate) fn parse_messages_event(event: &SseEvent) -> Result<EventAction, LlmError> {
    let root: Value = match serde_json::from_str(&event.data) {
        Ok(root) => root,
        Err(e) => {
            warn!(error = %e, event = ?event.event, "skipping unparseable messages event");
            return Ok(EventAction::Skip);
        }
    };

    let kind = root
        .get("type")
        .and_then(Value::as_str)
        .or(event.event.as_deref());

    match kind {
        Some("content_block_delta") => {
            let Some(delta) = root.get("delta") else {
                return Ok(EventAction::Skip);
            };
            if delta.get("type").and_then(Value::as_str) != Some("text_delta") {
                return Ok(EventAction::Skip);
            }
            let text = delta.get("text").and_then(Value::as_str).unwrap_or("");
            if text.is_empty() { Ok(EventAction::Skip) } else { Ok(EventAction::Delta(text.to_string())) }
        }
        Some("message_stop") => Ok(EventAction::Stop),
        Some("error") => {
            let message = root
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            Err(LlmError::ApiStream(message.to_string()))
        }
        _ => Ok(EventAction::Skip),
    }
}

#[cfg(test)]
#[path = "anthropic_test.rs"]
mod tests;
