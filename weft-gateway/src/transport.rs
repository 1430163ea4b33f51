//! The boundary between the dispatch core and however a deployment
//! actually talks to executors (a WebSocket manager, an HTTP callback
//! listener, ...). Wiring a real transport is left to the deployment
//! layer; [`LocalTransport`] is the in-memory double used by this
//! workspace's own tests.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use weft_core::{ExecutorId, RequestId};

use crate::error::GatewayError;

/// Delivers tasks to connected executors and is notified when the gateway
/// considers one disconnected.
#[async_trait]
pub trait ExecutorTransport: Send + Sync {
    /// Push a task to `executor`, addressed by `request_id`.
    async fn send_task(&self, executor: &ExecutorId, request_id: &RequestId, payload: Value) -> Result<(), GatewayError>;

    /// Notifies the transport that the gateway has given up on `executor`
    /// (it missed its heartbeat TTL, or the caller observed its
    /// connection drop) so the transport can release its own resources.
    async fn on_disconnect(&self, executor: &ExecutorId);
}

/// An in-memory [`ExecutorTransport`] that just records what it was asked
/// to do, for assertions in tests.
#[derive(Default)]
pub struct LocalTransport {
    sent: Mutex<Vec<(ExecutorId, RequestId, Value)>>,
    disconnected: Mutex<Vec<ExecutorId>>,
}

impl LocalTransport {
    /// A transport with nothing sent yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every task handed to `send_task`, in order.
    pub async fn sent_tasks(&self) -> Vec<(ExecutorId, RequestId, Value)> {
        self.sent.lock().await.clone()
    }

    /// Every executor `on_disconnect` was called with, in order.
    pub async fn disconnected_executors(&self) -> Vec<ExecutorId> {
        self.disconnected.lock().await.clone()
    }
}

#[async_trait]
impl ExecutorTransport for LocalTransport {
    async fn send_task(&self, executor: &ExecutorId, request_id: &RequestId, payload: Value) -> Result<(), GatewayError> {
        self.sent.lock().await.push((executor.clone(), request_id.clone(), payload));
        Ok(())
    }

    async fn on_disconnect(&self, executor: &ExecutorId) {
        self.disconnected.lock().await.push(executor.clone());
    }
}
