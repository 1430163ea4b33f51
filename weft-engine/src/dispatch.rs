//! The seam between the run state machine and the gateway.
//!
//! `weft-engine` dispatches blocked node payloads through this trait rather
//! than depending on `weft-gateway` directly, so the graph interpreter
//! stays a collaborator of the dispatch layer, not a dependent of it — a
//! deployment wires a concrete gateway client in, and so does
//! `tests/scenarios.rs` for this workspace's end-to-end coverage.

use async_trait::async_trait;
use serde_json::Value;
use weft_core::{OrgId, RequestId};

use crate::error::EngineError;

/// A resolved remote result, as the gateway reports it back to the engine.
#[derive(Debug, Clone)]
pub enum DispatchResult {
    /// The remote executor completed the task successfully.
    Succeeded {
        /// Its output.
        output: Value,
    },
    /// The remote executor reported a failure.
    Failed {
        /// Its error message.
        error: String,
    },
}

/// Submits blocked-node payloads to the gateway and polls for their result.
#[async_trait]
pub trait GatewayDispatcher: Send + Sync {
    /// Hand a blocked node's payload to the gateway for routing to a remote
    /// executor, returning the request ID that will later carry its result.
    async fn dispatch(
        &self,
        org: &OrgId,
        payload: Value,
        selector: Option<Value>,
    ) -> Result<RequestId, EngineError>;

    /// Check whether a previously dispatched request has resolved yet.
    /// Returns `Ok(None)` while still pending.
    async fn poll_result(
        &self,
        org: &OrgId,
        request_id: &RequestId,
    ) -> Result<Option<DispatchResult>, EngineError>;
}
