//! Shared wire model and SSE codec for the chat relay.
//!
//! This crate owns the representation used by both `server` and `client`:
//! the `POST /api/chat` request body, the structured error body, and the
//! `data: <payload>\n\n` frames streamed back. The incremental
//! [`SseDecoder`] is also what the server uses to read the upstream
//! provider's own event stream.

use serde::{Deserialize, Serialize};

/// Literal payload of the terminal frame.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Error returned by [`decode_frame`].
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The event payload is neither the sentinel nor a `{ "content": ... }` object.
    #[error("malformed frame payload: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// REQUEST / ERROR BODIES
// =============================================================================

/// Speaker of a conversation entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One conversation entry as sent to the relay. Local ids are stripped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

/// Body of `POST /api/chat`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Dialogue history in insertion order.
    pub messages: Vec<WireMessage>,
    /// Model identifier, forwarded upstream verbatim.
    pub model: String,
}

/// Structured error body: `{ "error": { "message": "..." } }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

impl ErrorBody {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: ErrorDetail { message: message.into() } }
    }
}

// =============================================================================
// FRAMES
// =============================================================================

/// Payload of one non-terminal event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFragment {
    pub content: String,
}

/// A single event on the relay's response stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// Incremental text, appended by the consumer in arrival order.
    Fragment(StreamFragment),
    /// Terminal sentinel. Nothing follows it.
    Done,
}

impl Frame {
    pub fn fragment(content: impl Into<String>) -> Self {
        Self::Fragment(StreamFragment { content: content.into() })
    }
}

/// Encode a frame as one SSE event: `data: <payload>\n\n`.
#[must_use]
pub fn encode_frame(frame: &Frame) -> String {
    match frame {
        Frame::Fragment(fragment) => {
            let payload = serde_json::json!({ "content": fragment.content });
            format!("data: {payload}\n\n")
        }
        Frame::Done => format!("data: {DONE_SENTINEL}\n\n"),
    }
}

/// Decode the data payload of one event (the text after `data: `).
///
/// # Errors
///
/// Returns [`FrameError::Json`] when the payload is not the sentinel and
/// does not parse as a [`StreamFragment`].
pub fn decode_frame(data: &str) -> Result<Frame, FrameError> {
    if data.trim() == DONE_SENTINEL {
        return Ok(Frame::Done);
    }
    let fragment: StreamFragment = serde_json::from_str(data)?;
    Ok(Frame::Fragment(fragment))
}

// =============================================================================
// SSE DECODER
// =============================================================================

/// One complete server-sent event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if the producer set one.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// Incremental SSE parser fed with arbitrary byte chunks.
///
/// Bytes of a multi-byte character split across chunks are held back until
/// the rest arrives; event text split across chunks stays buffered until its
/// blank-line delimiter shows up. Buffered text is searched for a delimiter
/// only once, so a long event arriving in small chunks stays linear.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    text: String,
    /// Prefix of `text` already known to hold no delimiter.
    scanned: usize,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every event it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);
        self.decode_pending();

        let mut events = Vec::new();
        // A delimiter may straddle the previous scan end by up to 3 bytes.
        let mut start = 0;
        let mut from = self.scanned.saturating_sub(3);
        while let Some((end, next)) = find_boundary(&self.text, from) {
            if let Some(event) = parse_event(&self.text[start..end]) {
                events.push(event);
            }
            start = next;
            from = next;
        }
        self.text.drain(..start);
        self.scanned = self.text.len();
        events
    }

    /// Flush whatever is left once the byte stream has ended.
    ///
    /// A trailing event without its delimiter is still delivered; incomplete
    /// UTF-8 sequences are replaced with U+FFFD.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.pending.is_empty() {
            self.text.push_str(&String::from_utf8_lossy(&self.pending));
            self.pending.clear();
        }
        self.scanned = 0;
        let block = std::mem::take(&mut self.text);
        parse_event(&block)
    }

    /// Move the longest valid UTF-8 prefix of `pending` into `text`.
    fn decode_pending(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    self.text.push_str(s);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.text
                        .push_str(std::str::from_utf8(&self.pending[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes.
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Locate the first event delimiter at or after byte `from`. Returns
/// `(event_end, next_event_start)` as offsets into `text`.
fn find_boundary(text: &str, from: usize) -> Option<(usize, usize)> {
    let mut from = from.min(text.len());
    while !text.is_char_boundary(from) {
        from -= 1;
    }
    let rest = &text[from..];
    let lf = rest.find("\n\n").map(|i| (from + i, from + i + 2));
    let crlf = rest.find("\r\n\r\n").map(|i| (from + i, from + i + 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_event(block: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data: Option<String> = None;

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => match data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(value);
                }
                None => data = Some(value.to_owned()),
            },
            "event" => event = Some(value.to_owned()),
            _ => {}
        }
    }

    data.map(|data| SseEvent { event, data })
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
