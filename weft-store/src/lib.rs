//! # weft-store — durable, org-scoped storage
//!
//! Defines the [`DurableStore`] trait covering every entity in the data
//! model and ships [`MemoryStore`], an in-process reference implementation
//! used by tests and single-node deployments. Grounded on the teacher's
//! `StateStore`/`MemoryStore` pair, generalized from a single
//! scope-prefixed key-value table to typed, per-entity tables — this
//! system's entities have real relational shape (a run belongs to a
//! workflow belongs to an org) that a flat KV store would only simulate
//! through string-prefix conventions.

#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod model;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use model::{
    AgentSession, Membership, NodeCheckpoint, Organization, Role, RunStatus, Secret,
    SessionStatus, TriggerKind, TriggerSubscription, Workflow, WorkflowRun, WorkflowRunEvent,
};
pub use traits::DurableStore;
