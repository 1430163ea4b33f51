//! Run continuation: polls the gateway for blocked runs' pending results
//! and re-queues the ones that have resolved.
//!
//! Kept separate from [`crate::run::Engine`] because it runs on its own
//! cadence (a background poll loop) rather than being driven by queue
//! claims — a blocked run isn't on the work queue at all until this poller
//! puts it back.

use std::sync::Arc;

use weft_core::{OrgId, RequestId};
use weft_queue::{QueueItem, WorkQueue};
use weft_store::{DurableStore, RunStatus};

use crate::dispatch::GatewayDispatcher;
use crate::error::EngineError;
use crate::interpreter::RunCursor;
use crate::run::{queue_key, resolved_from_dispatch};

/// Polls an org's blocked runs for a resolved remote result and resumes
/// the ones whose result has arrived.
pub struct ContinuationPoller {
    store: Arc<dyn DurableStore>,
    queue: Arc<dyn WorkQueue>,
    gateway: Arc<dyn GatewayDispatcher>,
}

impl ContinuationPoller {
    /// Assemble a poller from its collaborators.
    pub fn new(store: Arc<dyn DurableStore>, queue: Arc<dyn WorkQueue>, gateway: Arc<dyn GatewayDispatcher>) -> Self {
        Self { store, queue, gateway }
    }

    /// Check every currently blocked run in `org` once. Returns how many
    /// were resumed.
    pub async fn poll_once(&self, org: &OrgId) -> Result<usize, EngineError> {
        let blocked_runs = self.store.list_runs_by_status(org, RunStatus::Blocked).await?;
        let mut resumed = 0;
        for mut run in blocked_runs {
            let mut cursor: RunCursor = serde_json::from_value(run.cursor.clone()).unwrap_or_default();
            let Some(blocked) = cursor.blocked.clone() else {
                continue;
            };
            let Some(request_id) = blocked.request_id.clone() else {
                continue;
            };
            let request_id = RequestId::new(request_id);
            let Some(result) = self.gateway.poll_result(org, &request_id).await? else {
                continue;
            };

            tracing::info!(run = %run.id, node = %blocked.node, "run continuation resuming blocked node");
            cursor.resume_result = Some(resolved_from_dispatch(result));
            run.status = RunStatus::Queued;
            run.cursor = serde_json::to_value(&cursor).unwrap_or(serde_json::Value::Null);
            self.store.update_run(run.clone()).await?;
            self.queue
                .enqueue(QueueItem::new(queue_key(&run), crate::run::run_payload(&run)))
                .await?;
            resumed += 1;
        }
        Ok(resumed)
    }
}
