//! The result of a remote tool dispatch, injected back into a blocked run.
//!
//! Produced by the run continuation poller once a gateway request resolves,
//! and handed to [`crate::AgentLoop::run`] so it can validate the result
//! against the checkpointed [`crate::state::PendingToolCall`] and resume.

use serde::{Deserialize, Serialize};
use weft_core::RequestId;

/// Outcome of a dispatched tool call, as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteResultStatus {
    /// The executor completed the call.
    Succeeded {
        /// Tool output, fed back into the conversation as a `tool_result`.
        output: serde_json::Value,
    },
    /// The executor reported a failure, or disconnected before completing.
    Failed {
        /// Error message, fed back into the conversation as a failed
        /// `tool_result` rather than surfaced as a fatal [`crate::error::AgentError`].
        error: String,
    },
}

/// A resolved remote dispatch, to be matched against `pendingToolCall`
/// before being injected into the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRemoteResult {
    /// The gateway dispatch request this result answers.
    pub request_id: RequestId,
    /// The outcome reported by the executor.
    pub status: RemoteResultStatus,
}

impl PendingRemoteResult {
    /// True if this result answers `request_id`.
    pub fn matches(&self, request_id: &RequestId) -> bool {
        &self.request_id == request_id
    }
}
