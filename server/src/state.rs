//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It carries only immutable configuration and the connector that builds a
//! request-scoped upstream client; no mutable state is shared between
//! requests.

use std::sync::Arc;

use crate::llm::UpstreamConnector;
use crate::llm::config::LlmConfig;

/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<LlmConfig>,
    pub connector: Arc<dyn UpstreamConnector>,
}

impl AppState {
    #[must_use]
    pub fn new(llm: LlmConfig, connector: Arc<dyn UpstreamConnector>) -> Self {
        Self { llm: Arc::new(llm), connector }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
