//! Upgrading a v2 linear node list into the v3 graph shape.

use crate::model::{Edge, NodeDefinition, WorkflowGraph, WorkflowNodesV2};
use std::collections::HashMap;

/// Upgrade a v2 workflow into a v3 graph.
///
/// Nodes keep their declared order as an implicit chain: node *i* gets an
/// unconditional edge to node *i+1*. The resulting graph is what the
/// interpreter actually evaluates — v2 is purely a storage/authoring
/// convenience, there is no separate "v2 evaluation mode".
pub fn upgrade_v2_to_v3(v2: WorkflowNodesV2) -> WorkflowGraph {
    let mut edges = Vec::with_capacity(v2.nodes.len().saturating_sub(1));
    for pair in v2.nodes.windows(2) {
        edges.push(Edge::plain(pair[0].id.clone(), pair[1].id.clone()));
    }
    let nodes: HashMap<String, NodeDefinition> =
        v2.nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
    WorkflowGraph { nodes, edges }
}

/// Find the node immediately after `cursor_node_id` in v2 execution order.
///
/// v2 resume state is a cursor, not a frontier: this recovers "the next
/// unexecuted node" from the upgraded graph by following the chain of
/// default edges forward from the cursor.
pub fn v2_next_after(graph: &WorkflowGraph, cursor_node_id: &str) -> Option<&str> {
    graph
        .edges
        .iter()
        .find(|e| e.from == cursor_node_id)
        .map(|e| e.to.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeDefinition;

    fn node(id: &str) -> NodeDefinition {
        NodeDefinition {
            id: id.into(),
            kind: "http.request".into(),
            config: serde_json::Value::Null,
        }
    }

    #[test]
    fn linear_chain_becomes_sequential_edges() {
        let v2 = WorkflowNodesV2 {
            nodes: vec![node("a"), node("b"), node("c")],
        };
        let v3 = upgrade_v2_to_v3(v2);
        assert_eq!(v3.nodes.len(), 3);
        assert_eq!(v3.edges.len(), 2);
        assert_eq!(v3.edges[0].from, "a");
        assert_eq!(v3.edges[0].to, "b");
        assert_eq!(v3.edges[1].from, "b");
        assert_eq!(v3.edges[1].to, "c");
    }

    #[test]
    fn single_node_has_no_edges() {
        let v2 = WorkflowNodesV2 {
            nodes: vec![node("solo")],
        };
        let v3 = upgrade_v2_to_v3(v2);
        assert!(v3.edges.is_empty());
    }

    #[test]
    fn v2_next_after_follows_the_chain() {
        let v2 = WorkflowNodesV2 {
            nodes: vec![node("a"), node("b"), node("c")],
        };
        let v3 = upgrade_v2_to_v3(v2);
        assert_eq!(v2_next_after(&v3, "a"), Some("b"));
        assert_eq!(v2_next_after(&v3, "c"), None);
    }
}
