//! `POST /api/chat`: stateless SSE relay.
//!
//! LIFECYCLE
//! =========
//! 1. Credential check (no network activity when it fails)
//! 2. Body parse → `ChatRequest`
//! 3. Open the upstream stream and wait for its first text delta
//! 4. Commit `200 text/event-stream`, relay one frame per delta
//! 5. Emit `data: [DONE]` once the upstream ends
//!
//! Failures up to step 3 become a `500` with a structured body. After the
//! response is committed, an upstream failure aborts the body instead, so the
//! sentinel is never sent for a broken stream.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use frames::{ChatRequest, Frame, encode_frame};
use futures::{Stream, StreamExt};
use tracing::{error, info};

use crate::error::{ErrorCode, RelayError};
use crate::llm::types::{DeltaStream, LlmError};
use crate::state::AppState;

pub async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Response, RelayError> {
    let Some(api_key) = state.llm.api_key() else {
        return Err(RelayError::MissingApiKey { provider: state.llm.provider.display_name() });
    };

    let request: ChatRequest = serde_json::from_slice(&body)?;
    info!(model = %request.model, messages = request.messages.len(), "relaying chat request");

    let client = state.connector.connect(&state.llm, api_key);
    let mut deltas = client.stream_chat(&request.model, &request.messages).await?;
    let first = next_delta(&mut deltas).await?;

    let body = Body::from_stream(relay_frames(first, deltas));
    Ok((
        [(CONTENT_TYPE, "text/event-stream"), (CACHE_CONTROL, "no-cache"), (CONNECTION, "keep-alive")],
        body,
    )
        .into_response())
}

/// Pull the next non-empty delta, or `None` once the upstream has ended.
async fn next_delta(deltas: &mut DeltaStream) -> Result<Option<String>, LlmError> {
    while let Some(delta) = deltas.next().await {
        let delta = delta?;
        if !delta.is_empty() {
            return Ok(Some(delta));
        }
    }
    Ok(None)
}

/// Encoded SSE frames: every delta, then exactly one sentinel.
fn relay_frames(first: Option<String>, mut deltas: DeltaStream) -> impl Stream<Item = Result<String, LlmError>> + Send {
    async_stream::try_stream! {
        let mut pending = first;
        let mut relayed = 0usize;

        while let Some(delta) = pending {
            yield encode_frame(&Frame::fragment(delta));
            relayed += 1;

            let next = next_delta(&mut deltas).await;
            if let Err(e) = &next {
                error!(code = e.error_code(), error = %e, relayed, "upstream failed mid-stream");
            }
            pending = next?;
        }

        info!(relayed, "chat stream complete");
        yield encode_frame(&Frame::Done);
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
