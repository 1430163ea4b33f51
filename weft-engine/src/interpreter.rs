//! Pure graph-evaluation state: the execution frontier, condition
//! branch-skip propagation, and `parallel.join` fan-in tracking.
//!
//! Nothing in this module touches a store or a queue; [`RunCursor`] is the
//! exact shape serialized into `WorkflowRun::cursor`, and every function
//! here is a pure function of `(graph, cursor)` so the run state machine in
//! [`crate::run`] can reconstruct a run's position after a crash from the
//! cursor alone.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use weft_dsl::{Edge, WorkflowGraph};

/// A node blocked on a remote result, parked on the cursor until the run
/// continuation path resumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedNode {
    /// The blocked node's ID.
    pub node: String,
    /// The gateway dispatch request tracking this node, once known. `None`
    /// for the brief window between a node returning a blocked result and
    /// the engine completing the gateway dispatch that assigns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// The payload the node asked to have dispatched.
    pub payload: serde_json::Value,
    /// Routing hint for the gateway, if the node provided one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<serde_json::Value>,
}

/// The engine-owned execution position for one workflow run.
///
/// Stored opaquely in `WorkflowRun::cursor`; the store never interprets it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCursor {
    /// Nodes that have run to completion, in the order they completed.
    pub completed: Vec<String>,
    /// Nodes that will never run because a condition branch, or a
    /// `parallel.join`'s fan-in, made them unreachable.
    pub skipped: BTreeSet<String>,
    /// Recorded output for every completed node, keyed by node ID. Skipped
    /// nodes have no entry.
    pub node_outputs: BTreeMap<String, serde_json::Value>,
    /// Checkpointed `weft-agent` state for each `agent.run` node that has
    /// taken at least one turn, keyed by node ID.
    #[serde(default)]
    pub agent_states: BTreeMap<String, serde_json::Value>,
    /// Set while the run is suspended on a remote result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked: Option<BlockedNode>,
    /// Set by the run continuation poller once `blocked`'s request resolves,
    /// and consumed by the next [`crate::run::Engine::step`] that processes
    /// this run, which clears both `resume_result` and `blocked` together.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_result: Option<ResolvedRemoteResult>,
}

/// A remote result the continuation poller has fetched, awaiting delivery
/// back to the node that requested it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolvedRemoteResult {
    /// The remote executor completed successfully.
    Succeeded {
        /// Its output.
        output: serde_json::Value,
    },
    /// The remote executor reported a failure.
    Failed {
        /// Its error message.
        error: String,
    },
}

impl RunCursor {
    /// Whether every node has either completed or been skipped.
    pub fn is_complete(&self, graph: &WorkflowGraph) -> bool {
        graph
            .nodes
            .keys()
            .all(|id| self.completed.iter().any(|c| c == id) || self.skipped.contains(id))
    }

    fn is_resolved(&self, node: &str) -> bool {
        self.completed.iter().any(|c| c == node) || self.skipped.contains(node)
    }

    fn is_done(&self, node: &str) -> bool {
        self.completed.iter().any(|c| c == node)
    }
}

fn incoming_edges<'a>(graph: &'a WorkflowGraph, node: &str) -> Vec<&'a Edge> {
    graph.edges.iter().filter(|e| e.to == node).collect()
}

/// How a `parallel.join` node decides it has enough arrivals to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Fire once every incoming branch has completed or been skipped, and
    /// at least one completed.
    All,
    /// Fire as soon as one incoming branch completes; the rest are then
    /// ignored (not cancelled, just never required).
    Any,
}

impl Default for JoinMode {
    fn default() -> Self {
        JoinMode::All
    }
}

#[derive(Debug, Deserialize)]
struct JoinConfig {
    #[serde(default)]
    mode: JoinMode,
}

/// Read a `parallel.join` node's fan-in mode from its config, defaulting to
/// [`JoinMode::All`] when absent.
pub fn join_mode(config: &serde_json::Value) -> JoinMode {
    serde_json::from_value::<JoinConfig>(config.clone())
        .map(|c| c.mode)
        .unwrap_or_default()
}

fn join_ready(graph: &WorkflowGraph, cursor: &RunCursor, node: &str, mode: JoinMode) -> bool {
    let preds = incoming_edges(graph, node);
    if preds.is_empty() {
        return true;
    }
    match mode {
        JoinMode::All => {
            preds.iter().all(|e| cursor.is_resolved(&e.from)) && preds.iter().any(|e| cursor.is_done(&e.from))
        }
        JoinMode::Any => preds.iter().any(|e| cursor.is_done(&e.from)),
    }
}

/// Nodes whose dependencies are satisfied and that are ready to execute this
/// slice, in `order`'s relative order (the graph's topological order).
pub fn ready_nodes(graph: &WorkflowGraph, order: &[String], cursor: &RunCursor) -> Vec<String> {
    order
        .iter()
        .filter(|id| {
            if cursor.is_resolved(id) {
                return false;
            }
            let Some(def) = graph.nodes.get(*id) else {
                return false;
            };
            if def.kind == "parallel.join" {
                return join_ready(graph, cursor, id, join_mode(&def.config));
            }
            incoming_edges(graph, id).iter().all(|e| cursor.is_resolved(&e.from))
        })
        .cloned()
        .collect()
}

/// After a `parallel.join` with [`JoinMode::Any`] fires, the branches that
/// never arrived are ignored rather than awaited: mark every unresolved
/// direct predecessor skipped so they're never required again.
pub fn ignore_stragglers(graph: &WorkflowGraph, cursor: &mut RunCursor, join_node: &str) {
    let stragglers: Vec<String> = incoming_edges(graph, join_node)
        .into_iter()
        .map(|e| e.from.clone())
        .filter(|from| !cursor.is_resolved(from))
        .collect();
    for node in stragglers {
        cursor.skipped.insert(node);
    }
    propagate_skip(graph, cursor);
}

/// Mark `target` (the branch a `condition` node did not take) skipped, then
/// propagate: any node whose every incoming edge now comes from a skipped
/// source, and none from a completed one, is unreachable and is skipped too.
pub fn skip_branch(graph: &WorkflowGraph, cursor: &mut RunCursor, target: &str) {
    if cursor.is_resolved(target) {
        return;
    }
    cursor.skipped.insert(target.to_string());
    propagate_skip(graph, cursor);
}

fn propagate_skip(graph: &WorkflowGraph, cursor: &mut RunCursor) {
    loop {
        let mut changed = false;
        for id in graph.nodes.keys() {
            if cursor.is_resolved(id) {
                continue;
            }
            let preds = incoming_edges(graph, id);
            if preds.is_empty() {
                continue;
            }
            let all_skipped = preds.iter().all(|e| cursor.skipped.contains(&e.from));
            if all_skipped {
                cursor.skipped.insert(id.clone());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}
