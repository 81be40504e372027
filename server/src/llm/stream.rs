//! Shared plumbing for provider event streams.
//!
//! Both providers answer a streamed request with an SSE body. This module
//! sends the request, rejects non-success statuses, and turns the body into a
//! [`DeltaStream`] using a per-provider event interpreter.

use frames::{SseDecoder, SseEvent};
use futures::StreamExt;

use super::types::{DeltaStream, LlmError};

/// What a provider interpreter makes of one upstream event.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum EventAction {
    /// Text to forward.
    Delta(String),
    /// Nothing to forward (metadata, empty delta, unparseable event).
    Skip,
    /// The provider signalled end of output.
    Stop,
}

/// Send a streaming request and fail fast on a non-success status.
pub(crate) async fn open_event_stream(request: reqwest::RequestBuilder) -> Result<reqwest::Response, LlmError> {
    let response = request
        .send()
        .await
        .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::ApiResponse { status: status.as_u16(), body });
    }
    Ok(response)
}

/// Decode the response body as SSE and map each event through `interpret`.
pub(crate) fn delta_stream<F>(response: reqwest::Response, interpret: F) -> DeltaStream
where
    F: FnMut(&SseEvent) -> Result<EventAction, LlmError> + Send + 'static,
{
    deltas_from_bytes(Box::pin(response.bytes_stream()), interpret)
}

/// Body-agnostic core of [`delta_stream`], kept separate for tests.
pub(crate) fn deltas_from_bytes<S, B, E, F>(mut bytes: S, mut interpret: F) -> DeltaStream
where
    S: futures::Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: FnMut(&SseEvent) -> Result<EventAction, LlmError> + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut decoder = SseDecoder::new();
        let mut stopped = false;

        'read: while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| LlmError::ApiRequest(e.to_string()))?;
            for event in decoder.push(chunk.as_ref()) {
                match interpret(&event)? {
                    EventAction::Delta(text) => yield text,
                    EventAction::Skip => {}
                    EventAction::Stop => {
                        stopped = true;
                        break 'read;
                    }
                }
            }
        }

        if !stopped {
            if let Some(event) = decoder.finish() {
                if let EventAction::Delta(text) = interpret(&event)? {
                    yield text;
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod tests;
