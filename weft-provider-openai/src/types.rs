//! OpenAI Chat Completions API request/response types.

use serde::{Deserialize, Serialize};

/// OpenAI Chat Completions API request body.
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// Model identifier (e.g. "gpt-4o-mini").
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<OpenAIMessage>,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Service tier for the request (e.g. "auto", "default").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_tier: Option<String>,
    /// Reasoning effort level (e.g. "low", "medium", "high").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
}

/// A message in the OpenAI Chat Completions API format.
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    /// Plain-text message content.
    pub content: String,
}

/// OpenAI Chat Completions API response body.
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    /// Response choices.
    pub choices: Vec<OpenAIChoice>,
    /// Model that generated the response.
    pub model: String,
    /// Token usage statistics.
    pub usage: OpenAIUsage,
}

/// A single choice in the response.
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    /// The generated message.
    pub message: OpenAIMessage,
    /// Why generation stopped.
    pub finish_reason: String,
}

/// Token usage statistics from the OpenAI API.
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: u64,
    /// Number of tokens in the completion.
    pub completion_tokens: u64,
    /// Detailed breakdown of prompt token usage.
    #[serde(default)]
    pub prompt_tokens_details: Option<OpenAIPromptTokensDetails>,
}

/// Detailed breakdown of prompt token usage.
#[derive(Debug, Deserialize)]
pub struct OpenAIPromptTokensDetails {
    /// Number of cached tokens used.
    #[serde(default)]
    pub cached_tokens: Option<u64>,
}
