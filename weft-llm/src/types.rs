//! Wire types shared by every [`crate::LlmProvider`] implementation.
//!
//! Unlike a native tool-calling message model (`ContentPart::ToolUse`,
//! structured `ToolSchema` lists, provider-reported `StopReason`), this
//! system's agent loop drives tool use through a JSON envelope embedded in
//! plain assistant text (see `weft-agent`'s envelope parser), so a message
//! is just a role and a string. Providers are responsible for adapting this
//! flat shape to whatever their own API expects.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message (instructions).
    System,
    /// User message.
    User,
    /// Assistant (model) message.
    Assistant,
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// Plain-text content. Tool calls and tool results are both rendered
    /// as text (a JSON envelope for calls, a fenced result block for
    /// results) rather than structured content parts.
    pub content: String,
}

impl Message {
    /// Construct a message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request sent to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model to use (`None` lets the provider pick its default).
    pub model: Option<String>,
    /// Conversation messages, oldest first.
    pub messages: Vec<Message>,
    /// Maximum output tokens.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// System prompt. Carries the tool catalogue and envelope-format
    /// instructions, since this system has no native tool-use channel.
    pub system: Option<String>,
    /// Provider-specific config passthrough.
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// Token usage from a single provider call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
    /// Tokens read from cache (if supported).
    pub cache_read_tokens: Option<u64>,
    /// Tokens written to cache (if supported).
    pub cache_creation_tokens: Option<u64>,
}

/// Response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The assistant's reply text. The agent loop parses this for a JSON
    /// envelope (`{"type":"final",...}` or `{"type":"tool_call",...}`);
    /// a provider that returns anything else has its output treated as a
    /// malformed envelope, not as plain conversational text.
    pub text: String,
    /// Token usage.
    pub usage: TokenUsage,
    /// Actual model used.
    pub model: String,
    /// Cost calculated by the provider (`None` if unknown).
    pub cost: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serde_roundtrip() {
        for role in [Role::System, Role::User, Role::Assistant] {
            let json = serde_json::to_string(&role).unwrap();
            let back: Role = serde_json::from_str(&json).unwrap();
            assert_eq!(role, back);
        }
    }

    #[test]
    fn message_roundtrip() {
        let msg = Message::new(Role::User, "hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn token_usage_default() {
        let usage = TokenUsage::default();
        assert_eq!(usage.input_tokens, 0);
        assert_eq!(usage.output_tokens, 0);
        assert!(usage.cache_read_tokens.is_none());
    }

    #[test]
    fn completion_request_extra_defaults_to_null() {
        let req = CompletionRequest {
            model: None,
            messages: vec![Message::new(Role::User, "hi")],
            max_tokens: None,
            temperature: None,
            system: None,
            extra: serde_json::Value::default(),
        };
        assert!(req.extra.is_null());
    }
}
