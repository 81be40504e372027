//! Turn driver: posts the conversation and consumes the relay's SSE stream.
//!
//! LIFECYCLE
//! =========
//! 1. `begin_turn` on the session (rejects blank input and overlapping turns)
//! 2. `POST {base_url}/api/chat`; a transport error or non-2xx is terminal
//! 3. Read the body chunk by chunk through `SseDecoder`
//! 4. Per event: `[DONE]` ends the turn, a fragment grows the reply, a
//!    malformed payload is logged and skipped
//! 5. `finish` with the outcome
//!
//! Cancellation is observed while waiting for the response and between
//! body chunks. Dropping the response closes the connection.

#[cfg(test)]
#[path = "consumer_test.rs"]
mod consumer_test;

use std::fmt::Display;
use std::time::Duration;

use frames::{ChatRequest, Frame, SseDecoder, SseEvent, decode_frame};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::state::{ChatError, ChatSession, TurnOutcome};

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("chat endpoint returned {0}")]
    Status(reqwest::StatusCode),
    #[error("chat stream read failed: {0}")]
    Body(String),
}

/// HTTP side of the consumer. Cheap to clone; shares the connection pool.
#[derive(Clone, Debug)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Request`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')) })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit `input` and stream the reply into `session`.
    ///
    /// Transport and stream failures are not errors here: they end the turn
    /// as [`TurnOutcome::Failed`] with the session's notice set.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError`] when the session refuses the submit.
    pub async fn run_turn(
        &self,
        session: &ChatSession,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ChatError> {
        let request = session.begin_turn(input)?;

        let outcome = match self.stream_turn(session, &request, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, model = %request.model, "chat turn failed");
                TurnOutcome::Failed
            }
        };

        session.finish(outcome);
        Ok(outcome)
    }

    async fn stream_turn(
        &self,
        session: &ChatSession,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ClientError> {
        let send = self.http.post(&self.endpoint).json(request).send();
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(TurnOutcome::Cancelled),
            response = send => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }

        session.mark_streaming();
        consume_stream(response.bytes_stream(), session, cancel).await
    }
}

/// Feed a chunked SSE body into the session until the sentinel, the end of
/// the body, a read error, or cancellation.
///
/// # Errors
///
/// Returns [`ClientError::Body`] when a chunk fails to read. Fragments
/// applied before the failure stay in the session.
pub async fn consume_stream<S, B, E>(
    body: S,
    session: &ChatSession,
    cancel: &CancellationToken,
) -> Result<TurnOutcome, ClientError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(TurnOutcome::Cancelled),
            chunk = body.next() => chunk,
        };
        let Some(chunk) = chunk else { break };
        let chunk = chunk.map_err(|e| ClientError::Body(e.to_string()))?;

        for event in decoder.push(chunk.as_ref()) {
            if apply_event(session, &event) == Flow::Done {
                return Ok(TurnOutcome::Completed);
            }
        }
    }

    // Body ended without a sentinel: flush whatever was left undelimited.
    if let Some(event) = decoder.finish() {
        apply_event(session, &event);
    }
    debug!("chat stream ended without sentinel");
    Ok(TurnOutcome::Completed)
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Done,
}

fn apply_event(session: &ChatSession, event: &SseEvent) -> Flow {
    match decode_frame(&event.data) {
        Ok(Frame::Done) => Flow::Done,
        Ok(Frame::Fragment(fragment)) => {
            session.apply_fragment(&fragment.content);
            Flow::Continue
        }
        Err(e) => {
            warn!(error = %e, data = %event.data, "skipping malformed stream frame");
            Flow::Continue
        }
    }
}
