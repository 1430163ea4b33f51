//! Static graph validation: uniqueness, edge endpoints, acyclicity, and the
//! shape constraints specific to `condition` and `parallel.join` nodes.

use crate::error::DslError;
use crate::model::{EdgeLabel, WorkflowGraph};
use serde::Deserialize;
use std::collections::{HashMap, HashSet, VecDeque};

/// The subset of a `parallel.join` node's config validation needs to see.
#[derive(Debug, Deserialize)]
struct ParallelJoinConfig {
    #[serde(default)]
    execution: Option<ExecutionConfig>,
}

#[derive(Debug, Deserialize)]
struct ExecutionConfig {
    mode: String,
}

/// Validate a workflow graph and return its nodes in topological execution
/// order.
///
/// # Errors
/// - [`DslError::DuplicateNodeId`] if two nodes share an ID.
/// - [`DslError::UnknownNodeReference`] if an edge references a missing node.
/// - [`DslError::CycleDetected`] if the graph is not acyclic.
/// - [`DslError::ConditionEdgeConstraints`] if a `condition` node's outgoing
///   edges aren't exactly one `cond_true` and one `cond_false`.
/// - [`DslError::ParallelRemoteNotSupported`] if a `parallel.join` node's
///   config selects a non-default execution engine.
pub fn validate_graph(graph: &WorkflowGraph) -> Result<Vec<String>, DslError> {
    // Node ids are already unique by construction (HashMap key), but a
    // caller building a WorkflowGraph by hand from deserialized data may
    // have lost nodes to key collisions before we ever see it, so this
    // check operates on the edge/node-kind level instead.
    let node_ids: HashSet<&str> = graph.nodes.keys().map(String::as_str).collect();

    for edge in &graph.edges {
        if !node_ids.contains(edge.from.as_str()) {
            return Err(DslError::UnknownNodeReference {
                node_id: edge.from.clone(),
                side: "from",
            });
        }
        if !node_ids.contains(edge.to.as_str()) {
            return Err(DslError::UnknownNodeReference {
                node_id: edge.to.clone(),
                side: "to",
            });
        }
    }

    validate_condition_nodes(graph)?;
    validate_parallel_join_nodes(graph)?;

    topological_sort(graph)
}

fn validate_condition_nodes(graph: &WorkflowGraph) -> Result<(), DslError> {
    for (id, node) in &graph.nodes {
        if node.kind != "condition" {
            continue;
        }
        let mut true_count = 0u32;
        let mut false_count = 0u32;
        for edge in graph.edges.iter().filter(|e| &e.from == id) {
            match edge.label {
                EdgeLabel::CondTrue => true_count += 1,
                EdgeLabel::CondFalse => false_count += 1,
                EdgeLabel::Default => {
                    return Err(DslError::ConditionEdgeConstraints(id.clone()));
                }
            }
        }
        if true_count != 1 || false_count != 1 {
            return Err(DslError::ConditionEdgeConstraints(id.clone()));
        }
    }
    Ok(())
}

fn validate_parallel_join_nodes(graph: &WorkflowGraph) -> Result<(), DslError> {
    for (id, node) in &graph.nodes {
        if node.kind != "parallel.join" {
            continue;
        }
        let Ok(config) = serde_json::from_value::<ParallelJoinConfig>(node.config.clone()) else {
            continue;
        };
        if let Some(exec) = config.execution {
            if exec.mode != "default" {
                return Err(DslError::ParallelRemoteNotSupported(id.clone()));
            }
        }
    }
    Ok(())
}

/// Kahn's algorithm. Edge labels don't affect reachability for the purpose
/// of cycle detection — a conditional branch is still a directed edge.
fn topological_sort(graph: &WorkflowGraph) -> Result<Vec<String>, DslError> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();

    for id in graph.nodes.keys() {
        adjacency.entry(id.as_str()).or_default();
        in_degree.entry(id.as_str()).or_insert(0);
    }

    for edge in &graph.edges {
        adjacency
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
        *in_degree.entry(edge.to.as_str()).or_insert(0) += 1;
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(graph.nodes.len());

    while let Some(node_id) = queue.pop_front() {
        sorted.push(node_id.to_owned());
        if let Some(neighbours) = adjacency.get(node_id) {
            for &neighbour in neighbours {
                let deg = in_degree.entry(neighbour).or_insert(0);
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(neighbour);
                }
            }
        }
    }

    if sorted.len() != graph.nodes.len() {
        return Err(DslError::CycleDetected);
    }

    Ok(sorted)
}
