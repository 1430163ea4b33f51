//! The dispatch core: selects an executor, reserves capacity, delivers
//! the task, and stores whatever result eventually comes back.
//!
//! Implements `weft_engine::GatewayDispatcher` so `weft-engine` can drive
//! a blocked node's dispatch without depending on anything in this crate
//! beyond that trait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use weft_core::{ExecutorId, OrgId, RequestId};
use weft_engine::{DispatchResult, EngineError, GatewayDispatcher};

use crate::capacity::CapacityLedger;
use crate::error::GatewayError;
use crate::model::{ExecutorRoute, Selector};
use crate::registry::ExecutorRegistry;
use crate::transport::ExecutorTransport;

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Tuning knobs for the dispatch core.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// How stale a heartbeat may be before a route is no longer
    /// considered connected.
    pub route_ttl_ms: u64,
    /// Default per-org in-flight quota, used unless a caller supplies one.
    pub org_max_in_flight: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { route_ttl_ms: 60_000, org_max_in_flight: 100 }
    }
}

struct PendingDispatch {
    executor: ExecutorId,
    org: OrgId,
}

/// The gateway dispatch core: executor registry, capacity ledger, result
/// store, and a pluggable transport, composed behind the engine's
/// dispatcher seam.
pub struct Gateway {
    registry: ExecutorRegistry,
    capacity: CapacityLedger,
    pending: Mutex<HashMap<RequestId, PendingDispatch>>,
    results: Mutex<HashMap<RequestId, DispatchResult>>,
    transport: Arc<dyn ExecutorTransport>,
    config: GatewayConfig,
    request_counter: AtomicU64,
}

impl Gateway {
    /// Assemble a gateway around a transport and its tuning knobs.
    pub fn new(transport: Arc<dyn ExecutorTransport>, config: GatewayConfig) -> Self {
        Self {
            registry: ExecutorRegistry::new(),
            capacity: CapacityLedger::new(),
            pending: Mutex::new(HashMap::new()),
            results: Mutex::new(HashMap::new()),
            transport,
            config,
            request_counter: AtomicU64::new(0),
        }
    }

    fn next_request_id(&self) -> RequestId {
        let n = self.request_counter.fetch_add(1, Ordering::Relaxed);
        RequestId::new(format!("req_{n}"))
    }

    /// Register or refresh an executor's route.
    pub async fn register_executor(&self, route: ExecutorRoute) {
        self.registry.register(route).await;
    }

    /// Refresh an executor's heartbeat TTL without changing its route.
    pub async fn heartbeat(&self, executor: &ExecutorId, now: u64) {
        self.registry.heartbeat(executor, now).await;
    }

    /// Select an executor, reserve capacity, and deliver `payload`.
    /// Returns the request ID the caller should poll for a result.
    pub async fn dispatch_task(&self, org: &OrgId, payload: Value, selector: Selector) -> Result<RequestId, GatewayError> {
        let now = now_ms();
        let candidates = self
            .registry
            .candidates(org, &selector, now, self.config.route_ttl_ms, &self.capacity)
            .await;

        let chosen = candidates.into_iter().next().ok_or_else(|| {
            if let Some(executor_id) = &selector.executor_id {
                GatewayError::PinnedAgentOffline(executor_id.clone())
            } else {
                GatewayError::NoAgentAvailable
            }
        })?;

        self.capacity
            .reserve(&chosen.executor_id, chosen.max_in_flight, org, self.config.org_max_in_flight)
            .await?;

        let request_id = self.next_request_id();
        self.pending.lock().await.insert(
            request_id.clone(),
            PendingDispatch { executor: chosen.executor_id.clone(), org: org.clone() },
        );

        if let Err(e) = self.transport.send_task(&chosen.executor_id, &request_id, payload).await {
            self.pending.lock().await.remove(&request_id);
            self.capacity.release(&chosen.executor_id, org).await;
            return Err(e);
        }

        self.registry.mark_used(&chosen.executor_id, now).await;
        Ok(request_id)
    }

    /// Record a result an executor posted back, releasing the capacity it
    /// had reserved.
    pub async fn post_result(&self, request_id: RequestId, result: DispatchResult) {
        if let Some(dispatch) = self.pending.lock().await.remove(&request_id) {
            self.capacity.release(&dispatch.executor, &dispatch.org).await;
        }
        self.results.lock().await.insert(request_id, result);
    }

    /// An executor dropped its connection (TTL expiry or an observed
    /// socket close): synthesize `AGENT_DISCONNECTED` for every request
    /// still outstanding against it, release their capacity, and drop its
    /// route so it stops being a dispatch candidate.
    pub async fn handle_executor_disconnect(&self, executor: &ExecutorId) {
        self.transport.on_disconnect(executor).await;

        let mut pending = self.pending.lock().await;
        let affected: Vec<RequestId> = pending
            .iter()
            .filter(|(_, d)| &d.executor == executor)
            .map(|(id, _)| id.clone())
            .collect();
        for request_id in affected {
            if let Some(dispatch) = pending.remove(&request_id) {
                self.capacity.release(&dispatch.executor, &dispatch.org).await;
                self.results.lock().await.insert(
                    request_id,
                    DispatchResult::Failed { error: "AGENT_DISCONNECTED".to_string() },
                );
            }
        }
        drop(pending);

        self.registry.remove(executor).await;
    }
}

#[async_trait]
impl GatewayDispatcher for Gateway {
    async fn dispatch(&self, org: &OrgId, payload: Value, selector: Option<Value>) -> Result<RequestId, EngineError> {
        let selector: Selector = match selector {
            Some(v) => serde_json::from_value(v)
                .map_err(|e| EngineError::GatewayResponseInvalid(format!("bad selector: {e}")))?,
            None => Selector::default(),
        };
        self.dispatch_task(org, payload, selector)
            .await
            .map_err(|e| EngineError::Other(Box::new(e)))
    }

    async fn poll_result(&self, _org: &OrgId, request_id: &RequestId) -> Result<Option<DispatchResult>, EngineError> {
        Ok(self.results.lock().await.remove(request_id))
    }
}
