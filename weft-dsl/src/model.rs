//! Node and edge types shared by the v2 and v3 DSL generations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single node in a workflow graph.
///
/// `kind` names the executor that will run the node (`"http.request"`,
/// `"condition"`, `"parallel.join"`, `"connector.action"`, `"agent.execute"`,
/// or a custom kind); `config` is the kind-specific configuration blob,
/// interpreted by the matching `NodeExecutor` at run time, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Identifier unique within the workflow.
    pub id: String,
    /// Executor kind, e.g. `"http.request"`.
    pub kind: String,
    /// Kind-specific configuration.
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Which branch of a `condition` node an edge represents.
///
/// `Default` is used for every edge that isn't leaving a condition node;
/// `CondTrue`/`CondFalse` label the two edges leaving one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeLabel {
    /// An unconditional edge.
    Default,
    /// Taken when the condition node's predicate evaluates true.
    CondTrue,
    /// Taken when the condition node's predicate evaluates false.
    CondFalse,
}

impl Default for EdgeLabel {
    fn default() -> Self {
        EdgeLabel::Default
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Source node ID.
    pub from: String,
    /// Destination node ID.
    pub to: String,
    /// Branch label, see [`EdgeLabel`].
    #[serde(default)]
    pub label: EdgeLabel,
}

impl Edge {
    /// Construct an unconditional edge.
    pub fn plain(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: EdgeLabel::Default,
        }
    }
}

/// The v3 graph representation: nodes keyed by ID plus an explicit edge list.
///
/// This is the single representation the interpreter evaluates against; v2
/// workflows are upgraded into this shape before a run ever starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowGraph {
    /// Nodes keyed by their ID.
    pub nodes: HashMap<String, NodeDefinition>,
    /// Directed edges between nodes.
    pub edges: Vec<Edge>,
}

/// The v2 representation: a flat, ordered list of nodes executed in
/// sequence. No branching, no parallelism — each node's output becomes the
/// next node's input, same as a single chain in the v3 graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNodesV2 {
    /// Nodes in execution order.
    pub nodes: Vec<NodeDefinition>,
}

/// A workflow definition in either DSL generation.
///
/// Stored workflows always carry their original `version` so the upgrade
/// path is visible in audit logs even after in-memory upgrade to v3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum WorkflowDsl {
    /// Linear v2 definition.
    #[serde(rename = "2")]
    V2(WorkflowNodesV2),
    /// Graph v3 definition.
    #[serde(rename = "3")]
    V3(WorkflowGraph),
}
