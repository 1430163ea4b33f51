//! Anthropic Messages API request/response types.

use serde::{Deserialize, Serialize};

/// Anthropic API request body.
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    /// Model identifier.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Conversation messages.
    pub messages: Vec<AnthropicMessage>,
    /// Optional system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// A message in the Anthropic API format.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role: "user" or "assistant".
    pub role: String,
    /// Message content, as plain text.
    pub content: String,
}

/// A content block in an Anthropic response.
///
/// Only `text` blocks are produced: this system has no native tool-use
/// channel, so nothing in the request ever asks the model to emit
/// `tool_use`/`thinking`/image blocks. Anything unrecognized falls back to
/// empty text rather than erroring, since a future API addition here
/// should not break a provider that never opted into it.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicContentBlock {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Anything else the API might add.
    #[serde(other)]
    Unknown,
}

/// Anthropic API response body.
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    /// Response content blocks.
    pub content: Vec<AnthropicContentBlock>,
    /// Model that generated the response.
    pub model: String,
    /// Stop reason.
    pub stop_reason: String,
    /// Token usage.
    pub usage: AnthropicUsage,
}

/// Token usage from the Anthropic API.
#[derive(Debug, Deserialize)]
pub struct AnthropicUsage {
    /// Input tokens used.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
    /// Cache read tokens (prompt caching).
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
    /// Cache creation tokens (prompt caching).
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
}

/// Concatenate the text blocks of a response into a single string, the
/// shape the agent loop's envelope parser expects.
pub fn flatten_text(blocks: &[AnthropicContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|b| match b {
            AnthropicContentBlock::Text { text } => Some(text.as_str()),
            AnthropicContentBlock::Unknown => None,
        })
        .collect::<Vec<_>>()
        .join("")
}
