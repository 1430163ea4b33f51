//! In-memory [`WorkQueue`], suitable for tests and single-process use.

use crate::error::QueueError;
use crate::model::{ClaimedItem, QueueConfig, QueueItem, ReceiptId};
use crate::traits::WorkQueue;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::time::Instant;
use weft_core::DurationMs;

struct State {
    ready: Vec<(Instant, QueueItem)>,
    in_flight: HashMap<ReceiptId, (Instant, QueueItem)>,
    dead_letters: Vec<QueueItem>,
    known_keys: HashSet<String>,
}

/// In-memory visibility-timeout queue, backed by a single `Mutex<State>`.
///
/// Visibility-timeout expiry is reaped lazily: every `claim` call first
/// moves any `in_flight` item whose timeout has passed back into `ready`
/// before picking the next item, so there is no background reaper task to
/// keep alive.
pub struct MemoryWorkQueue {
    state: Mutex<State>,
    config: QueueConfig,
    receipt_counter: AtomicU64,
}

impl MemoryWorkQueue {
    /// Create a new empty queue with the given retry policy.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            state: Mutex::new(State {
                ready: Vec::new(),
                in_flight: HashMap::new(),
                dead_letters: Vec::new(),
                known_keys: HashSet::new(),
            }),
            config,
            receipt_counter: AtomicU64::new(0),
        }
    }

    fn next_receipt(&self) -> ReceiptId {
        let n = self.receipt_counter.fetch_add(1, Ordering::Relaxed);
        ReceiptId(format!("receipt_{n}"))
    }
}

impl Default for MemoryWorkQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn enqueue(&self, item: QueueItem) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        if state.known_keys.contains(&item.idempotency_key) {
            return Ok(());
        }
        state.known_keys.insert(item.idempotency_key.clone());
        state.ready.push((Instant::now(), item));
        Ok(())
    }

    async fn claim(
        &self,
        visibility_timeout: DurationMs,
    ) -> Result<Option<ClaimedItem>, QueueError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        let expired: Vec<ReceiptId> = state
            .in_flight
            .iter()
            .filter(|(_, (expires_at, _))| *expires_at <= now)
            .map(|(receipt, _)| receipt.clone())
            .collect();
        for receipt in expired {
            if let Some((_, item)) = state.in_flight.remove(&receipt) {
                state.ready.push((now, item));
            }
        }

        let ready_index = state
            .ready
            .iter()
            .enumerate()
            .filter(|(_, (ready_at, _))| *ready_at <= now)
            .min_by_key(|(_, (ready_at, _))| *ready_at)
            .map(|(idx, _)| idx);

        let Some(idx) = ready_index else {
            return Ok(None);
        };
        let (_, item) = state.ready.remove(idx);
        let receipt = self.next_receipt();
        state
            .in_flight
            .insert(receipt.clone(), (now + visibility_timeout.to_std(), item.clone()));
        Ok(Some(ClaimedItem { receipt, item }))
    }

    async fn ack(&self, receipt: &ReceiptId) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let (_, item) = state
            .in_flight
            .remove(receipt)
            .ok_or_else(|| QueueError::UnknownReceipt(receipt.to_string()))?;
        state.known_keys.remove(&item.idempotency_key);
        Ok(())
    }

    async fn nack(&self, receipt: &ReceiptId) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let (_, mut item) = state
            .in_flight
            .remove(receipt)
            .ok_or_else(|| QueueError::UnknownReceipt(receipt.to_string()))?;
        item.attempt += 1;
        if item.attempt >= self.config.max_attempts {
            state.dead_letters.push(item);
        } else {
            let delay = self.config.backoff_for_attempt(item.attempt);
            state.ready.push((Instant::now() + delay.to_std(), item));
        }
        Ok(())
    }

    async fn dead_letters(&self) -> Result<Vec<QueueItem>, QueueError> {
        Ok(self.state.lock().await.dead_letters.clone())
    }
}
