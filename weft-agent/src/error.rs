//! Errors fatal to an agent loop turn.
//!
//! Tool-level failures (unknown tool, policy denial, tool execution error)
//! are deliberately NOT modeled here — they're captured as a failed
//! `tool_result` and fed back to the model, which may still recover and
//! return a successful `final`. Only failures that make continuing the
//! loop meaningless live in [`AgentError`].

use thiserror::Error;
use weft_core::ErrorCode;

/// Fatal errors from an agent loop turn.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model's response didn't parse as either envelope variant.
    #[error("invalid agent output: {0}")]
    InvalidOutput(String),

    /// `json` output mode is configured with a schema and the `final`
    /// envelope's `output` failed to validate against it.
    #[error("invalid agent json output: {0}")]
    InvalidJsonOutput(String),

    /// `ensureAvailable` on the configured credit ledger failed.
    #[error("credits exhausted")]
    CreditsExhausted,

    /// `turns` exceeded `maxTurns`.
    #[error("max turns exceeded ({0})")]
    MaxTurnsExceeded(u32),

    /// `toolCalls` exceeded `maxToolCalls`.
    #[error("max tool calls exceeded ({0})")]
    MaxToolCallsExceeded(u32),

    /// Wall-clock deadline (`timeoutMs`) elapsed.
    #[error("agent loop timed out")]
    Timeout,

    /// A `pendingRemoteResult` was supplied but didn't match the
    /// persisted `pendingToolCall`.
    #[error("remote result invalid: {0}")]
    RemoteResultInvalid(String),

    /// The underlying LLM provider failed non-retryably, or retries were
    /// exhausted before the deadline.
    #[error("provider error: {0}")]
    Provider(String),

    /// A named teammate referenced by `team.delegate`/`team.map` isn't
    /// configured.
    #[error("unknown teammate: {0}")]
    UnknownTeammate(String),
}

impl ErrorCode for AgentError {
    fn code(&self) -> &'static str {
        match self {
            AgentError::InvalidOutput(_) => "INVALID_AGENT_OUTPUT",
            AgentError::InvalidJsonOutput(_) => "INVALID_AGENT_JSON_OUTPUT",
            AgentError::CreditsExhausted => "CREDITS_EXHAUSTED",
            AgentError::MaxTurnsExceeded(_) => "AGENT_MAX_TURNS_EXCEEDED",
            AgentError::MaxToolCallsExceeded(_) => "AGENT_MAX_TOOL_CALLS_EXCEEDED",
            AgentError::Timeout => "AGENT_TIMEOUT",
            AgentError::RemoteResultInvalid(_) => "REMOTE_RESULT_INVALID",
            AgentError::Provider(_) => "LLM_TIMEOUT",
            AgentError::UnknownTeammate(_) => "INVALID_NODE_CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(AgentError::CreditsExhausted.code(), "CREDITS_EXHAUSTED");
        assert_eq!(
            AgentError::RemoteResultInvalid("x".into()).code(),
            "REMOTE_RESULT_INVALID"
        );
    }
}
