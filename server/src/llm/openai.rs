//! OpenAI-compatible streaming client for `/chat/completions`.

use frames::{DONE_SENTINEL, SseEvent, WireMessage};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::stream::{EventAction, delta_stream, open_event_stream};
use super::types::{DeltaStream, LlmError, LlmStream};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    #[must_use]
    pub fn new(http: reqwest::Client, api_key: String, base_url: String) -> Self {
        Self { http, api_key, base_url }
    }
}

#[async_trait::async_trait]
impl LlmStream for OpenAiClient {
    async fn stream_chat(&self, model: &str, messages: &[WireMessage]) -> Result<DeltaStream, LlmError> {
        let body = CcRequest { model, messages, stream: true };
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.http.post(url).bearer_auth(&self.api_key).json(&body);
        let response = open_event_stream(request).await?;
        Ok(delta_stream(response, parse_chat_completions_event))
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    messages: &'a [WireMessage],
    stream: bool,
}

// =============================================================================
// EVENT PARSING
// =============================================================================

/// Interpret one `chat.completion.chunk` event.
///
/// The delta text lives at `choices[0].delta.content`; chunks without it
/// (role preamble, finish reason, usage) are skipped.
pub(crate) fn parse_chat_completions_event(event: &SseEvent) -> Result<EventAction, LlmError> {
    if event.data.trim() == DONE_SENTINEL {
        return Ok(EventAction::Stop);
    }

    let root: Value = match serde_json::from_str(&event.data) {
        Ok(root) => root,
        Err(e) => {
            warn!(error = %e, "skipping unparseable chat_completions chunk");
            return Ok(EventAction::Skip);
        }
    };

    if let Some(error) = root.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(LlmError::ApiStream(message.to_string()));
    }

    let text = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("");

    if text.is_empty() { Ok(EventAction::Skip) } else { Ok(EventAction::Delta(text.to_string())) }
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
