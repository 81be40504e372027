//! Relay error taxonomy and its HTTP mapping.
//!
//! Every failure becomes `500` with an [`ErrorBody`]. Only the missing
//! credential message is specific; everything else is reported to the caller
//! with a fixed message while the detail goes to the server log.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use frames::ErrorBody;
use tracing::{error, warn};

use crate::llm::types::LlmError;

pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred during your request.";

/// Grepable error code and retryable flag for structured log fields.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No upstream credential configured. Reported before any network call.
    #[error("{provider} API key not configured")]
    MissingApiKey { provider: &'static str },

    /// The request body is not a valid chat request.
    #[error("invalid chat request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    /// The upstream call failed before the response was committed.
    #[error("upstream failure: {0}")]
    Upstream(#[from] LlmError),
}

impl ErrorCode for RelayError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::InvalidRequest(_) => "E_INVALID_REQUEST",
            Self::Upstream(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Upstream(e) if e.retryable())
    }
}

impl RelayError {
    /// Message safe to hand to the caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::MissingApiKey { .. } => self.to_string(),
            Self::InvalidRequest(_) | Self::Upstream(_) => GENERIC_ERROR_MESSAGE.to_owned(),
        }
    }

    /// Provider response body of a rejected upstream call. Server log only.
    #[must_use]
    pub fn upstream_detail(&self) -> Option<&str> {
        match self {
            Self::Upstream(LlmError::ApiResponse { body, .. }) => Some(body.as_str()),
            _ => None,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            Self::MissingApiKey { .. } => warn!(code = self.error_code(), "{self}"),
            _ => error!(
                code = self.error_code(),
                retryable = self.retryable(),
                error = %self,
                upstream_body = self.upstream_detail(),
                "chat relay failed"
            ),
        }
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(self.public_message()))).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
