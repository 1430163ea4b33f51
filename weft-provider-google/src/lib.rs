#![deny(missing_docs)]
//! Google Gemini and Vertex AI provider for weft-llm.
//!
//! Implements [`weft_llm::LlmProvider`] against the `generateContent` API,
//! which is shared byte-for-byte between the public Gemini API and Vertex
//! AI's Gemini publisher model endpoint. The two differ only in base URL
//! and authentication: Gemini uses an `x-goog-api-key` header, Vertex uses
//! a bearer token minted from a service account (see [`auth`]).

pub mod auth;
pub mod error;
mod types;

use auth::TokenProvider;
use error::GoogleError;
use rust_decimal::Decimal;
use std::sync::Arc;
use types::*;
use weft_llm::{CompletionRequest, CompletionResponse, LlmProvider, ProviderError, Role, TokenUsage};

/// Default model used when a request does not specify one.
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Which backend a [`GoogleProvider`] talks to.
enum Backend {
    /// Public Gemini API, authenticated with an API key header.
    Gemini { api_key: String },
    /// Vertex AI, authenticated with a bearer token from a [`TokenProvider`].
    Vertex {
        project: String,
        location: String,
        token_provider: Arc<dyn TokenProvider>,
    },
}

/// Google Gemini / Vertex AI provider.
pub struct GoogleProvider {
    backend: Backend,
    client: reqwest::Client,
}

impl GoogleProvider {
    /// Talk to the public Gemini API with an API key.
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self {
            backend: Backend::Gemini { api_key: api_key.into() },
            client: reqwest::Client::new(),
        }
    }

    /// Talk to Vertex AI's Gemini publisher model, authenticating via the
    /// given token provider (typically a [`auth::ServiceAccountTokenProvider`]).
    pub fn vertex(
        project: impl Into<String>,
        location: impl Into<String>,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            backend: Backend::Vertex {
                project: project.into(),
                location: location.into(),
                token_provider,
            },
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        match &self.backend {
            Backend::Gemini { .. } => format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent"
            ),
            Backend::Vertex { project, location, .. } => format!(
                "https://aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:generateContent"
            ),
        }
    }

    fn build_request(&self, request: &CompletionRequest) -> GenerateContentRequest {
        let contents = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant | Role::System => "model",
                };
                Content::text(Some(role), m.content.clone())
            })
            .collect();

        let system_instruction = request
            .system
            .as_ref()
            .map(|s| Content::text(None, s.clone()));

        let generation_config = if request.max_tokens.is_some() || request.temperature.is_some() {
            Some(GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            })
        } else {
            None
        };

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }

    fn parse_response(
        &self,
        model: &str,
        response: GenerateContentResponse,
    ) -> Result<CompletionResponse, ProviderError> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no candidates in response".into()))?;
        let content = candidate
            .content
            .ok_or_else(|| ProviderError::InvalidResponse("candidate has no content".into()))?;
        let text = flatten_text(&content);

        let usage = response.usage_metadata.unwrap_or_default();
        let token_usage = TokenUsage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            cache_read_tokens: usage.cached_content_token_count,
            cache_creation_tokens: None,
        };

        // gemini-2.0-flash pricing as of this writing: $0.10/MTok input, $0.40/MTok output.
        let input_cost = Decimal::from(usage.prompt_token_count) * Decimal::new(10, 8);
        let output_cost = Decimal::from(usage.candidates_token_count) * Decimal::new(40, 8);

        Ok(CompletionResponse {
            text,
            usage: token_usage,
            model: response.model_version.unwrap_or_else(|| model.to_string()),
            cost: Some(input_cost + output_cost),
        })
    }

    async fn auth_header(&self) -> Result<(&'static str, String), ProviderError> {
        match &self.backend {
            Backend::Gemini { api_key } => Ok(("x-goog-api-key", api_key.clone())),
            Backend::Vertex { token_provider, .. } => {
                let token = token_provider
                    .token()
                    .await
                    .map_err(|e: GoogleError| ProviderError::AuthFailed(e.to_string()))?;
                Ok(("authorization", format!("Bearer {token}")))
            }
        }
    }
}

impl LlmProvider for GoogleProvider {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, ProviderError>> + Send {
        let model = request.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into());
        let api_request = self.build_request(&request);
        let url = self.endpoint(&model);

        async move {
            let (header, value) = self.auth_header().await?;
            let http_response = self
                .client
                .post(&url)
                .header(header, value)
                .json(&api_request)
                .send()
                .await
                .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

            let status = http_response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(ProviderError::RateLimited);
            }
            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
                let body = http_response.text().await.unwrap_or_default();
                return Err(ProviderError::AuthFailed(body));
            }
            if !status.is_success() {
                let body = http_response.text().await.unwrap_or_default();
                return Err(ProviderError::RequestFailed(format!("HTTP {status}: {body}")));
            }

            let api_response: GenerateContentResponse = http_response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

            self.parse_response(&model, api_response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_llm::Message;

    fn request(system: Option<&str>, msgs: Vec<Message>) -> CompletionRequest {
        CompletionRequest {
            model: None,
            messages: msgs,
            max_tokens: None,
            temperature: None,
            system: system.map(String::from),
            extra: serde_json::Value::Null,
        }
    }

    #[test]
    fn gemini_endpoint_uses_public_api() {
        let provider = GoogleProvider::gemini("key");
        assert_eq!(
            provider.endpoint("gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn vertex_endpoint_includes_project_and_location() {
        let provider = GoogleProvider::vertex(
            "my-proj",
            "us-central1",
            Arc::new(auth::StaticTokenProvider::new("tok")),
        );
        assert_eq!(
            provider.endpoint("gemini-2.0-flash"),
            "https://aiplatform.googleapis.com/v1/projects/my-proj/locations/us-central1/publishers/google/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn build_request_maps_roles_and_filters_system() {
        let provider = GoogleProvider::gemini("key");
        let req = request(
            Some("Be helpful."),
            vec![Message::new(Role::User, "hi"), Message::new(Role::Assistant, "hello")],
        );
        let api_request = provider.build_request(&req);
        assert_eq!(api_request.contents.len(), 2);
        assert_eq!(api_request.contents[0].role.as_deref(), Some("user"));
        assert_eq!(api_request.contents[1].role.as_deref(), Some("model"));
        assert_eq!(
            api_request.system_instruction.unwrap().parts[0].text,
            "Be helpful."
        );
    }

    #[test]
    fn default_model_is_flash() {
        assert_eq!(DEFAULT_MODEL, "gemini-2.0-flash");
    }

    #[test]
    fn parse_response_extracts_text_and_usage() {
        let provider = GoogleProvider::gemini("key");
        let response = GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content::text(Some("model"), "Hello!")),
                finish_reason: Some("STOP".into()),
            }],
            usage_metadata: Some(UsageMetadata {
                prompt_token_count: 10,
                candidates_token_count: 5,
                cached_content_token_count: None,
            }),
            model_version: Some("gemini-2.0-flash-001".into()),
        };
        let parsed = provider.parse_response("gemini-2.0-flash", response).unwrap();
        assert_eq!(parsed.text, "Hello!");
        assert_eq!(parsed.usage.input_tokens, 10);
        assert_eq!(parsed.usage.output_tokens, 5);
        assert_eq!(parsed.model, "gemini-2.0-flash-001");
        assert!(parsed.cost.unwrap() > Decimal::ZERO);
    }

    #[test]
    fn parse_response_no_candidates_errors() {
        let provider = GoogleProvider::gemini("key");
        let response = GenerateContentResponse {
            candidates: vec![],
            usage_metadata: None,
            model_version: None,
        };
        assert!(provider.parse_response("gemini-2.0-flash", response).is_err());
    }
}
