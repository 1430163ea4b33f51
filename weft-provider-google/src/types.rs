//! Gemini `generateContent` request/response wire types.
//!
//! Shared verbatim between the public Gemini API
//! (`generativelanguage.googleapis.com`) and Vertex AI's Gemini publisher
//! endpoint (`aiplatform.googleapis.com`) — the request/response body shape
//! is identical, only the base URL and auth header differ.

use serde::{Deserialize, Serialize};

/// Gemini `generateContent` request body.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    /// Conversation turns, in order.
    pub contents: Vec<Content>,
    /// Developer-set system instructions, kept separate from `contents`.
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemInstruction")]
    pub system_instruction: Option<Content>,
    /// Sampling / output configuration.
    #[serde(skip_serializing_if = "Option::is_none", rename = "generationConfig")]
    pub generation_config: Option<GenerationConfig>,
}

/// A single turn of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// "user" or "model". Absent on `systemInstruction`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Parts making up this turn. Only plain text parts are produced/consumed.
    pub parts: Vec<Part>,
}

impl Content {
    /// Build a single-part text content block.
    pub fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(String::from),
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// A piece of content. Only the text variant is modeled; image/function-call
/// parts are out of scope for this provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Plain text content.
    pub text: String,
}

/// Output generation controls.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationConfig {
    /// Maximum number of tokens in the generated candidate.
    #[serde(skip_serializing_if = "Option::is_none", rename = "maxOutputTokens")]
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Gemini `generateContent` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    /// Candidate responses. The API may return zero on a safety block.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Token usage for the request.
    #[serde(rename = "usageMetadata")]
    pub usage_metadata: Option<UsageMetadata>,
    /// Model version string reported by the API.
    #[serde(rename = "modelVersion")]
    pub model_version: Option<String>,
}

/// A single generated candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    /// The generated content.
    pub content: Option<Content>,
    /// Why generation stopped (e.g. "STOP", "MAX_TOKENS", "SAFETY").
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

/// Token usage metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageMetadata {
    /// Tokens in the prompt.
    #[serde(rename = "promptTokenCount", default)]
    pub prompt_token_count: u64,
    /// Tokens in the generated candidates.
    #[serde(rename = "candidatesTokenCount", default)]
    pub candidates_token_count: u64,
    /// Tokens served from the context cache.
    #[serde(rename = "cachedContentTokenCount", default)]
    pub cached_content_token_count: Option<u64>,
}

/// Flatten a candidate's parts into a single string.
pub fn flatten_text(content: &Content) -> String {
    content
        .parts
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("")
}
