//! Conversation state and the turn state machine.
//!
//! DESIGN
//! ======
//! `ChatSession` is the single writer. It owns a `watch` channel of
//! `ChatState` snapshots; renderers subscribe and redraw on change. Messages
//! are values: a growing assistant reply is replaced by a new
//! `ChatMessage` per fragment instead of being edited in place.
//!
//! LIFECYCLE
//! =========
//! `Idle -> Sending -> Streaming -> {Completed | Failed | Cancelled}`.
//! `Sending` may also end in `Failed` or `Cancelled`. A terminal phase
//! accepts the next submit; a submit during `Sending`/`Streaming` is
//! rejected.

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

use frames::{ChatRequest, Role, WireMessage};
use tokio::sync::watch;

use crate::models;

/// Notification shown when a turn fails for any reason.
pub const FAILURE_NOTICE: &str = "Failed to get response from AI. Please try again.";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyInput,
    #[error("a response is still streaming")]
    TurnInFlight,
    #[error("unknown model: {0}")]
    UnknownModel(String),
}

/// Where the current (or most recent) turn is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnPhase {
    #[default]
    Idle,
    Sending,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl TurnPhase {
    /// True while the loading indicator should show.
    #[must_use]
    pub fn is_loading(self) -> bool {
        matches!(self, Self::Sending | Self::Streaming)
    }
}

/// How a turn ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed,
    Cancelled,
}

impl From<TurnOutcome> for TurnPhase {
    fn from(outcome: TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::Completed => Self::Completed,
            TurnOutcome::Failed => Self::Failed,
            TurnOutcome::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { id: uuid::Uuid::new_v4().to_string(), role, content: content.into() }
    }

    /// A copy of this message with `fragment` appended. Same id.
    #[must_use]
    pub fn with_appended(&self, fragment: &str) -> Self {
        let mut content = String::with_capacity(self.content.len() + fragment.len());
        content.push_str(&self.content);
        content.push_str(fragment);
        Self { id: self.id.clone(), role: self.role, content }
    }

    #[must_use]
    pub fn to_wire(&self) -> WireMessage {
        WireMessage { role: self.role, content: self.content.clone() }
    }
}

/// Snapshot published to renderers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatState {
    pub messages: Vec<ChatMessage>,
    pub phase: TurnPhase,
    /// User-visible notification from the last failed turn.
    pub notice: Option<String>,
    pub model: String,
}

impl ChatState {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    /// The newest assistant reply, in flight or finished.
    #[must_use]
    pub fn last_reply(&self) -> Option<&ChatMessage> {
        self.messages.last().filter(|m| m.role == Role::Assistant)
    }
}

/// Owner of the conversation. Only the turn driver calls the mutating
/// methods; everything else reads through [`ChatSession::subscribe`].
#[derive(Debug)]
pub struct ChatSession {
    tx: watch::Sender<ChatState>,
}

impl ChatSession {
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(ChatState { model: model.into(), ..ChatState::default() });
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> ChatState {
        self.tx.borrow().clone()
    }

    /// Prepend a system prompt to the conversation.
    pub fn seed_system(&self, prompt: &str) {
        self.tx.send_modify(|state| state.messages.insert(0, ChatMessage::new(Role::System, prompt)));
    }

    /// Switch the model used by the next turn.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::UnknownModel`] for ids outside the allowlist.
    pub fn set_model(&self, id: &str) -> Result<(), ChatError> {
        let Some(model) = models::find_model(id) else {
            return Err(ChatError::UnknownModel(id.to_owned()));
        };
        self.tx.send_modify(|state| state.model = model.id.to_owned());
        Ok(())
    }

    /// Append the user message and an empty assistant placeholder, then
    /// return the request carrying every message before the placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyInput`] for blank input and
    /// [`ChatError::TurnInFlight`] while a previous turn is loading.
    pub fn begin_turn(&self, input: &str) -> Result<ChatRequest, ChatError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let mut request = None;
        self.tx.send_if_modified(|state| {
            if state.is_loading() {
                return false;
            }
            state.messages.push(ChatMessage::new(Role::User, text));
            request = Some(ChatRequest {
                messages: state.messages.iter().map(ChatMessage::to_wire).collect(),
                model: state.model.clone(),
            });
            state.messages.push(ChatMessage::new(Role::Assistant, ""));
            state.phase = TurnPhase::Sending;
            state.notice = None;
            true
        });

        request.ok_or(ChatError::TurnInFlight)
    }

    /// The relay accepted the request and the body is being read.
    pub fn mark_streaming(&self) {
        self.tx.send_if_modified(|state| {
            if state.phase != TurnPhase::Sending {
                return false;
            }
            state.phase = TurnPhase::Streaming;
            true
        });
    }

    /// Replace the in-progress reply with a copy that has `fragment`
    /// appended. Ignored outside `Streaming`.
    pub fn apply_fragment(&self, fragment: &str) {
        self.tx.send_if_modified(|state| {
            if state.phase != TurnPhase::Streaming {
                return false;
            }
            let Some(last) = state.messages.last_mut().filter(|m| m.role == Role::Assistant) else {
                return false;
            };
            *last = last.with_appended(fragment);
            true
        });
    }

    /// Close the current turn. Partial content is kept for every outcome.
    pub fn finish(&self, outcome: TurnOutcome) {
        self.tx.send_if_modified(|state| {
            if !state.is_loading() {
                return false;
            }
            state.phase = outcome.into();
            if outcome == TurnOutcome::Failed {
                state.notice = Some(FAILURE_NOTICE.to_owned());
            }
            true
        });
    }
}
