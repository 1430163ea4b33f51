//! Errors from the run state machine and node executor registry.

use thiserror::Error;
use weft_core::ErrorCode;
use weft_dsl::DslError;
use weft_queue::QueueError;
use weft_store::StoreError;

/// Errors raised while advancing a workflow run.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EngineError {
    /// A node's `config` did not deserialize into the shape its kind expects.
    #[error("invalid node config for '{node_id}': {message}")]
    InvalidNodeConfig {
        /// The offending node.
        node_id: String,
        /// What was wrong with it.
        message: String,
    },

    /// No [`crate::node::NodeExecutor`] is registered for a node's `kind`.
    #[error("no executor registered for node kind '{0}'")]
    UnknownNodeKind(String),

    /// A node ran and returned a terminal failure (exhausted retries, or a
    /// kind that never retries).
    #[error("node '{node_id}' failed: {message}")]
    NodeExecutionFailed {
        /// The failing node.
        node_id: String,
        /// The node's reported error.
        message: String,
    },

    /// A node exceeded its execution deadline.
    #[error("node '{0}' timed out")]
    NodeExecutionTimeout(String),

    /// The gateway accepted a dispatch but returned something this engine
    /// cannot interpret.
    #[error("gateway response invalid: {0}")]
    GatewayResponseInvalid(String),

    /// A blocked run's `pendingRemoteResult` did not match its
    /// `pendingToolCall`/`blockedRequestId`, or was present with nothing
    /// pending.
    #[error("remote result invalid: {0}")]
    RemoteResultInvalid(String),

    /// Graph validation failed for a workflow's DSL.
    #[error(transparent)]
    Dsl(#[from] DslError),

    /// A durable store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A work queue operation failed.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidNodeConfig { .. } => "INVALID_NODE_CONFIG",
            EngineError::UnknownNodeKind(_) => "INVALID_NODE_CONFIG",
            EngineError::NodeExecutionFailed { .. } => "NODE_EXECUTION_FAILED",
            EngineError::NodeExecutionTimeout(_) => "NODE_EXECUTION_TIMEOUT",
            EngineError::GatewayResponseInvalid(_) => "GATEWAY_RESPONSE_INVALID",
            EngineError::RemoteResultInvalid(_) => "REMOTE_RESULT_INVALID",
            EngineError::Dsl(e) => e.code(),
            EngineError::Store(e) => e.code(),
            EngineError::Queue(e) => e.code(),
            EngineError::Other(_) => "ENGINE_OTHER",
        }
    }
}
