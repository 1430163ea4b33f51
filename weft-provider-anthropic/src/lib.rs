#![deny(missing_docs)]
//! Anthropic API provider for weft-llm.
//!
//! Implements [`weft_llm::LlmProvider`] for Anthropic's Messages API.

mod types;

use rust_decimal::Decimal;
use types::*;
use weft_llm::{CompletionRequest, CompletionResponse, LlmProvider, ProviderError, Role, TokenUsage};

/// Default model used when a request does not specify one.
const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Anthropic API provider.
pub struct AnthropicProvider {
    api_key: String,
    client: reqwest::Client,
    api_url: String,
    api_version: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            api_url: "https://api.anthropic.com/v1/messages".into(),
            api_version: "2023-06-01".into(),
        }
    }

    /// Override the API URL (for testing or proxies).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        let model = request.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into());
        let max_tokens = request.max_tokens.unwrap_or(4096);

        let messages: Vec<AnthropicMessage> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| AnthropicMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => unreachable!("filtered above"),
                },
                content: m.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model,
            max_tokens,
            messages,
            system: request.system.clone(),
            temperature: request.temperature,
        }
    }

    fn parse_response(&self, response: AnthropicResponse) -> CompletionResponse {
        let text = flatten_text(&response.content);

        let usage = TokenUsage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
            cache_read_tokens: response.usage.cache_read_input_tokens,
            cache_creation_tokens: response.usage.cache_creation_input_tokens,
        };

        // Haiku pricing as of this writing: $0.25/MTok input, $1.25/MTok output.
        let input_cost = Decimal::from(response.usage.input_tokens) * Decimal::new(25, 8);
        let output_cost = Decimal::from(response.usage.output_tokens) * Decimal::new(125, 8);

        CompletionResponse {
            text,
            usage,
            model: response.model,
            cost: Some(input_cost + output_cost),
        }
    }
}

impl LlmProvider for AnthropicProvider {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, ProviderError>> + Send {
        let api_request = self.build_request(&request);
        let http_request = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(&api_request);

        async move {
            let http_response = http_request
                .send()
                .await
                .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

            let status = http_response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(ProviderError::RateLimited);
            }
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                let body = http_response.text().await.unwrap_or_default();
                return Err(ProviderError::AuthFailed(body));
            }
            if !status.is_success() {
                let body = http_response.text().await.unwrap_or_default();
                return Err(ProviderError::RequestFailed(format!(
                    "HTTP {status}: {body}"
                )));
            }

            let api_response: AnthropicResponse = http_response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

            Ok(self.parse_response(api_response))
        }
    }
}
