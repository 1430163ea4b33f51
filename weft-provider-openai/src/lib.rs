#![deny(missing_docs)]
//! OpenAI API provider for weft-llm.
//!
//! Implements [`weft_llm::LlmProvider`] for OpenAI's Chat Completions API.

mod types;

use rust_decimal::Decimal;
use types::*;
use weft_llm::{CompletionRequest, CompletionResponse, LlmProvider, ProviderError, Role, TokenUsage};

/// Default model used when a request does not specify one.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI API provider.
pub struct OpenAIProvider {
    api_key: String,
    client: reqwest::Client,
    api_url: String,
    org_id: Option<String>,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            api_url: "https://api.openai.com/v1/chat/completions".into(),
            org_id: None,
        }
    }

    /// Override the API URL (for testing or proxies).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the OpenAI-Organization header for multi-org accounts.
    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> OpenAIRequest {
        let model = request.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into());

        let mut messages: Vec<OpenAIMessage> = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(OpenAIMessage {
                role: "system".into(),
                content: system.clone(),
            });
        }
        for m in &request.messages {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(OpenAIMessage {
                role: role.into(),
                content: m.content.clone(),
            });
        }

        let service_tier = request
            .extra
            .get("service_tier")
            .and_then(|v| v.as_str())
            .map(String::from);
        let reasoning_effort = request
            .extra
            .get("reasoning_effort")
            .and_then(|v| v.as_str())
            .map(String::from);

        OpenAIRequest {
            model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            service_tier,
            reasoning_effort,
        }
    }

    fn parse_response(&self, response: OpenAIResponse) -> Result<CompletionResponse, ProviderError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".into()))?;

        let usage = TokenUsage {
            input_tokens: response.usage.prompt_tokens,
            output_tokens: response.usage.completion_tokens,
            cache_read_tokens: response
                .usage
                .prompt_tokens_details
                .and_then(|d| d.cached_tokens),
            cache_creation_tokens: None,
        };

        // gpt-4o-mini pricing as of this writing: $0.15/MTok input, $0.60/MTok output.
        let input_cost = Decimal::from(response.usage.prompt_tokens) * Decimal::new(15, 8);
        let output_cost = Decimal::from(response.usage.completion_tokens) * Decimal::new(60, 8);

        Ok(CompletionResponse {
            text: choice.message.content,
            usage,
            model: response.model,
            cost: Some(input_cost + output_cost),
        })
    }
}

impl LlmProvider for OpenAIProvider {
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, ProviderError>> + Send {
        let api_request = self.build_request(&request);
        let mut http_request = self
            .client
            .post(&self.api_url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(ref org_id) = self.org_id {
            http_request = http_request.header("openai-organization", org_id);
        }

        let http_request = http_request.json(&api_request);

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

            let api_response: OpenAIResponse = http_response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

            self.parse_response(api_response)
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
    fn build_simple_request() {
        let provider = OpenAIProvider::new("test-key");
        let mut req = request(Some("Be helpful."), vec![Message::new(Role::User, "Hello")]);
        req.model = Some("gpt-4o-mini".into());
        req.max_tokens = Some(256);

        let api_request = provider.build_request(&req);
        assert_eq!(api_request.model, "gpt-4o-mini");
        assert_eq!(api_request.max_tokens, Some(256));
        assert_eq!(api_request.messages.len(), 2);
        assert_eq!(api_request.messages[0].role, "system");
        assert_eq!(api_request.messages[0].content, "Be helpful.");
        assert_eq!(api_request.messages[1].role, "user");
    }

    #[test]
    fn default_model_is_gpt4o_mini() {
        let provider = OpenAIProvider::new("test-key");
        let req = request(None, vec![Message::new(Role::User, "Hi")]);
        let api_request = provider.build_request(&req);
        assert_eq!(api_request.model, DEFAULT_MODEL);
    }

    #[test]
    fn service_tier_and_reasoning_effort_pulled_from_extra() {
        let provider = OpenAIProvider::new("test-key");
        let mut req = request(None, vec![Message::new(Role::User, "Hi")]);
        req.extra = serde_json::json!({
            "service_tier": "auto",
            "reasoning_effort": "high",
        });

        let api_request = provider.build_request(&req);
        assert_eq!(api_request.service_tier, Some("auto".into()));
        assert_eq!(api_request.reasoning_effort, Some("high".into()));
    }

    #[test]
    fn parse_simple_response() {
        let provider = OpenAIProvider::new("test-key");
        let api_response = OpenAIResponse {
            choices: vec![OpenAIChoice {
                message: OpenAIMessage {
                    role: "assistant".into(),
                    content: "Hello!".into(),
                },
                finish_reason: "stop".into(),
            }],
            model: "gpt-4o-mini".into(),
            usage: OpenAIUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                prompt_tokens_details: None,
            },
        };

        let response = provider.parse_response(api_response).unwrap();
        assert_eq!(response.text, "Hello!");
        assert_eq!(response.usage.input_tokens, 10);
        assert_eq!(response.usage.output_tokens, 5);
        assert!(response.cost.is_some());
    }

    #[test]
    fn parse_response_with_cached_tokens() {
        let provider = OpenAIProvider::new("test-key");
        let api_response = OpenAIResponse {
            choices: vec![OpenAIChoice {
                message: OpenAIMessage {
                    role: "assistant".into(),
                    content: "Cached.".into(),
                },
                finish_reason: "stop".into(),
            }],
            model: "gpt-4o-mini".into(),
            usage: OpenAIUsage {
                prompt_tokens: 100,
                completion_tokens: 10,
                prompt_tokens_details: Some(OpenAIPromptTokensDetails {
                    cached_tokens: Some(50),
                }),
            },
        };

        let response = provider.parse_response(api_response).unwrap();
        assert_eq!(response.usage.cache_read_tokens, Some(50));
    }

    #[test]
    fn parse_response_no_choices_errors() {
        let provider = OpenAIProvider::new("test-key");
        let api_response = OpenAIResponse {
            choices: vec![],
            model: "gpt-4o-mini".into(),
            usage: OpenAIUsage {
                prompt_tokens: 0,
                completion_tokens: 0,
                prompt_tokens_details: None,
            },
        };

        assert!(provider.parse_response(api_response).is_err());
    }

    #[test]
    fn with_url_overrides_api_url() {
        let provider = OpenAIProvider::new("test-key").with_url("https://proxy.example.com");
        assert_eq!(provider.api_url, "https://proxy.example.com");
    }

    #[test]
    fn with_org_sets_org_id() {
        let provider = OpenAIProvider::new("test-key").with_org("org-123");
        assert_eq!(provider.org_id, Some("org-123".into()));
    }

    #[test]
    fn cost_calculation_is_positive() {
        let provider = OpenAIProvider::new("test-key");
        let api_response = OpenAIResponse {
            choices: vec![OpenAIChoice {
                message: OpenAIMessage {
                    role: "assistant".into(),
                    content: "Hello".into(),
                },
                finish_reason: "stop".into(),
            }],
            model: "gpt-4o-mini".into(),
            usage: OpenAIUsage {
                prompt_tokens: 1000,
                completion_tokens: 500,
                prompt_tokens_details: None,
            },
        };

        let response = provider.parse_response(api_response).unwrap();
        assert!(response.cost.unwrap() > Decimal::ZERO);
    }
}
