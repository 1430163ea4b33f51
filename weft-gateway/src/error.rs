//! Error type for the dispatch core.

use weft_core::ErrorCode;

/// Errors the gateway can surface, mirroring the dispatch-layer failure
/// codes.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No registered executor matched the selector.
    #[error("no agent available for dispatch")]
    NoAgentAvailable,
    /// A selector pinned a specific executor that isn't currently routable.
    #[error("pinned executor {0} is offline")]
    PinnedAgentOffline(String),
    /// An executor disconnected while one of its requests was outstanding.
    #[error("executor {0} disconnected while a request was outstanding")]
    AgentDisconnected(String),
    /// The chosen executor is already at its in-flight limit.
    #[error("executor {0} is over capacity")]
    ExecutorOverCapacity(String),
    /// The org is already at its in-flight quota.
    #[error("org {0} exceeded its in-flight quota")]
    OrgQuotaExceeded(String),
    /// The transport failed to deliver the task.
    #[error("transport delivery failed: {0}")]
    TransportFailed(String),
}

impl ErrorCode for GatewayError {
    fn code(&self) -> &'static str {
        match self {
            GatewayError::NoAgentAvailable => "NO_AGENT_AVAILABLE",
            GatewayError::PinnedAgentOffline(_) => "PINNED_AGENT_OFFLINE",
            GatewayError::AgentDisconnected(_) => "AGENT_DISCONNECTED",
            GatewayError::ExecutorOverCapacity(_) => "EXECUTOR_OVER_CAPACITY",
            GatewayError::OrgQuotaExceeded(_) => "ORG_QUOTA_EXCEEDED",
            GatewayError::TransportFailed(_) => "GATEWAY_UNAVAILABLE",
        }
    }
}
