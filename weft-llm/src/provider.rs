//! Provider trait for LLM backends.
//!
//! [`LlmProvider`] uses RPITIT (return-position `impl Trait` in traits) and
//! is intentionally NOT object-safe. The agent loop is generic over
//! `P: LlmProvider`, same as the teacher's `NeuronTurn<P: Provider>` — the
//! object-safe boundary in this system is `weft_tool::ToolDyn`, not the
//! model call.

use crate::types::{CompletionRequest, CompletionResponse};
use std::future::Future;
use thiserror::Error;
use weft_core::ErrorCode;

/// Errors from LLM providers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP or network request failed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Provider rate-limited the request.
    #[error("rate limited")]
    RateLimited,

    /// Authentication/authorization failed.
    #[error("auth failed: {0}")]
    AuthFailed(String),

    /// Could not parse the provider's response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Whether retrying this request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited | ProviderError::RequestFailed(_)
        )
    }
}

impl ErrorCode for ProviderError {
    fn code(&self) -> &'static str {
        match self {
            ProviderError::RequestFailed(_) => "PROVIDER_REQUEST_FAILED",
            ProviderError::RateLimited => "PROVIDER_RATE_LIMITED",
            ProviderError::AuthFailed(_) => "PROVIDER_AUTH_FAILED",
            ProviderError::InvalidResponse(_) => "PROVIDER_INVALID_RESPONSE",
            ProviderError::Other(_) => "PROVIDER_OTHER",
        }
    }
}

/// LLM provider interface.
///
/// Each provider (Anthropic, OpenAI, Gemini/Vertex) implements this trait.
/// Unlike the teacher's native tool-calling `ProviderResponse`, this
/// system's agent loop asks the model for a single JSON-envelope response
/// (`{"type":"final",...}` or `{"type":"tool_call",...}`) inside plain
/// assistant text, so `CompletionResponse` carries a text body rather than
/// structured content blocks — the envelope parsing lives in `weft-agent`,
/// not here.
pub trait LlmProvider: Send + Sync {
    /// Send a completion request to the provider.
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send;
}
