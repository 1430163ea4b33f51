//! Graph validation errors.

use thiserror::Error;
use weft_core::ErrorCode;

/// Errors produced while statically validating a [`WorkflowGraph`](crate::model::WorkflowGraph).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DslError {
    /// Two or more nodes share the same ID.
    #[error("duplicate node id: '{0}'")]
    DuplicateNodeId(String),

    /// An edge references a node ID that doesn't exist in the graph.
    #[error("edge references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference {
        /// The missing node ID.
        node_id: String,
        /// Which endpoint of the edge was missing: `"from"` or `"to"`.
        side: &'static str,
    },

    /// The graph is not acyclic.
    #[error("workflow graph contains a cycle")]
    CycleDetected,

    /// A `condition` node does not have exactly one `cond_true` and one
    /// `cond_false` outgoing edge.
    #[error("condition node '{0}' must have exactly one cond_true and one cond_false outgoing edge")]
    ConditionEdgeConstraints(String),

    /// A `parallel.join` node's config names a non-default execution engine,
    /// which graph validation cannot route to.
    #[error("parallel.join node '{0}' references a remote executor, which is not supported")]
    ParallelRemoteNotSupported(String),
}

impl ErrorCode for DslError {
    fn code(&self) -> &'static str {
        match self {
            DslError::DuplicateNodeId(_) => "GRAPH_DUPLICATE_NODE_ID",
            DslError::UnknownNodeReference { .. } => "GRAPH_UNKNOWN_NODE_REFERENCE",
            DslError::CycleDetected => "GRAPH_CYCLE_DETECTED",
            DslError::ConditionEdgeConstraints(_) => "CONDITION_EDGE_CONSTRAINTS",
            DslError::ParallelRemoteNotSupported(_) => "PARALLEL_REMOTE_NOT_SUPPORTED",
        }
    }
}
