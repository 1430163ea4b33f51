//! The JSON envelope an LLM response must parse as.
//!
//! Every model turn is expected to emit exactly one of these two shapes as
//! its entire text output — no native tool-use content blocks, no partial
//! text alongside a call. A response that parses as neither is
//! [`crate::error::AgentError::InvalidOutput`].

use serde::{Deserialize, Serialize};

/// The two shapes a model turn may produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEnvelope {
    /// The agent is done; `output` is the result (a plain string in text
    /// mode, or a value validated against the configured schema in json
    /// mode).
    Final {
        /// The final output.
        output: serde_json::Value,
    },
    /// The agent wants to invoke a tool before continuing.
    ToolCall {
        /// Tool identifier, e.g. `"shell.run"` or `"connector.github.create_issue"`.
        #[serde(rename = "toolId")]
        tool_id: String,
        /// Tool input arguments.
        input: serde_json::Value,
    },
}

impl AgentEnvelope {
    /// Parse a model's raw text response as an envelope.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_final_envelope() {
        let text = r#"{"type":"final","output":"done"}"#;
        match AgentEnvelope::parse(text).unwrap() {
            AgentEnvelope::Final { output } => assert_eq!(output, json!("done")),
            _ => panic!("expected Final"),
        }
    }

    #[test]
    fn parses_tool_call_envelope() {
        let text = r#"{"type":"tool_call","toolId":"shell.run","input":{"cmd":"ls"}}"#;
        match AgentEnvelope::parse(text).unwrap() {
            AgentEnvelope::ToolCall { tool_id, input } => {
                assert_eq!(tool_id, "shell.run");
                assert_eq!(input, json!({"cmd": "ls"}));
            }
            _ => panic!("expected ToolCall"),
        }
    }

    #[test]
    fn rejects_malformed_envelope() {
        assert!(AgentEnvelope::parse("not json").is_err());
        assert!(AgentEnvelope::parse(r#"{"type":"unknown"}"#).is_err());
        assert!(AgentEnvelope::parse(r#"{"output":"missing type tag"}"#).is_err());
    }
}
