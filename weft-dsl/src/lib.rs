//! # weft-dsl — workflow graph DSL
//!
//! Defines the v2 (linear node list) and v3 (node map + edges) workflow
//! shapes, the v2→v3 upgrade, and static graph validation. This crate knows
//! nothing about execution — [`validate_graph`] and [`upgrade_v2_to_v3`] are
//! pure functions over data, run once at publish time and again whenever a
//! run starts, kept here so the interpreter in `weft-engine` evaluates a
//! single shape rather than branching on DSL generation at every step.

#![deny(missing_docs)]

pub mod error;
pub mod model;
pub mod upgrade;
pub mod validate;

pub use error::DslError;
pub use model::{Edge, EdgeLabel, NodeDefinition, WorkflowDsl, WorkflowGraph, WorkflowNodesV2};
pub use upgrade::{upgrade_v2_to_v3, v2_next_after};
pub use validate::validate_graph;
