//! # weft-core — shared identifiers and conventions
//!
//! This crate has no business logic of its own. It holds the typed IDs,
//! the [`DurationMs`] wire type, and the [`ErrorCode`] convention that
//! every other `weft-*` crate builds on, so that two crates never
//! accidentally disagree on what a `RunId` or a retry-after duration
//! looks like on the wire.
//!
//! ## Tenant scoping
//!
//! There is deliberately no `Scope` type here. Every entity in the data
//! model belongs to exactly one [`OrgId`], and every store/queue method
//! that touches tenant data takes the org as its first argument rather
//! than bundling it into a generic scope key. This keeps row-level
//! isolation visible at every call site instead of hidden inside a
//! composite key.

#![deny(missing_docs)]

pub mod duration;
pub mod error;
pub mod id;

pub use duration::DurationMs;
pub use error::ErrorCode;
pub use id::{
    ExecutorId, NodeId, OrgId, RequestId, RunId, SecretId, SessionId, SubscriptionId, UserId,
    WorkflowId,
};
