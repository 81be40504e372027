//! Stream consumer for the chat relay.
//!
//! SYSTEM CONTEXT
//! ==============
//! `state` holds the conversation and the turn state machine, `consumer`
//! drives one turn against `POST /api/chat` and feeds decoded fragments back
//! into the session, `models` is the selectable model allowlist and `render`
//! turns message content into HTML. Front-ends subscribe to the session's
//! watch channel and never mutate state themselves.

pub mod consumer;
pub mod models;
pub mod render;
pub mod state;
