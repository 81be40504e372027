//! LLM: multi-provider streaming adapter behind the chat relay.
//!
//! DESIGN
//! ======
//! No client lives for the whole process. The relay holds an
//! [`UpstreamConnector`] and asks it for a request-scoped [`LlmStream`]
//! built from the configuration handed to it. [`HttpConnector`] dispatches
//! to OpenAI or Anthropic based on `LLM_PROVIDER`; tests substitute their
//! own connector.

pub mod anthropic;
pub mod config;
pub mod openai;
mod stream;
pub mod types;

use std::time::Duration;

use config::{LlmConfig, LlmProviderKind, LlmTimeouts};
use frames::WireMessage;
use types::{DeltaStream, LlmError, LlmStream};

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete LLM client that dispatches to either OpenAI or Anthropic.
pub struct LlmClient {
    inner: LlmProvider,
}

enum LlmProvider {
    OpenAi(openai::OpenAiClient),
    Anthropic(anthropic::AnthropicClient),
}

impl LlmClient {
    /// Build a client for one request from typed config and a credential.
    #[must_use]
    pub fn new(config: &LlmConfig, api_key: &str, http: reqwest::Client) -> Self {
        let base_url = config.base_url.clone();
        let inner = match config.provider {
            LlmProviderKind::OpenAi => LlmProvider::OpenAi(openai::OpenAiClient::new(http, api_key.to_owned(), base_url)),
            LlmProviderKind::Anthropic => LlmProvider::Anthropic(anthropic::AnthropicClient::new(
                http,
                api_key.to_owned(),
                base_url,
                config.max_tokens,
            )),
        };
        Self { inner }
    }
}

#[async_trait::async_trait]
impl LlmStream for LlmClient {
    async fn stream_chat(&self, model: &str, messages: &[WireMessage]) -> Result<DeltaStream, LlmError> {
        match &self.inner {
            LlmProvider::OpenAi(c) => c.stream_chat(model, messages).await,
            LlmProvider::Anthropic(c) => c.stream_chat(model, messages).await,
        }
    }
}

// =============================================================================
// CONNECTOR
// =============================================================================

/// Builds the upstream client for a single relay request.
pub trait UpstreamConnector: Send + Sync {
    fn connect(&self, config: &LlmConfig, api_key: &str) -> Box<dyn LlmStream>;
}

/// Production connector. Owns only the pooled HTTP transport; every request
/// gets a fresh [`LlmClient`] bound to the config it was given.
pub struct HttpConnector {
    http: reqwest::Client,
}

impl HttpConnector {
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

impl UpstreamConnector for HttpConnector {
    fn connect(&self, config: &LlmConfig, api_key: &str) -> Box<dyn LlmStream> {
        Box::new(LlmClient::new(config, api_key, self.http.clone()))
    }
}
