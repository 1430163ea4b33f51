//! The queue boundary every backend implements.

use crate::error::QueueError;
use crate::model::{ClaimedItem, QueueItem, ReceiptId};
use async_trait::async_trait;
use weft_core::DurationMs;

/// A visibility-timeout work queue.
///
/// Modeled as claim/ack/nack rather than a plain pop, so a worker that
/// crashes mid-processing doesn't lose the item: it simply becomes visible
/// again once its visibility timeout elapses, for another worker to claim.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Enqueue an item. Idempotent: if an item with the same
    /// `idempotency_key` is already enqueued, claimed, or dead-lettered,
    /// this is a no-op.
    async fn enqueue(&self, item: QueueItem) -> Result<(), QueueError>;

    /// Claim the next ready item, if any, making it invisible to other
    /// claimants for `visibility_timeout`.
    async fn claim(
        &self,
        visibility_timeout: DurationMs,
    ) -> Result<Option<ClaimedItem>, QueueError>;

    /// Acknowledge successful processing, removing the item permanently.
    async fn ack(&self, receipt: &ReceiptId) -> Result<(), QueueError>;

    /// Report failed processing. Requeues with backoff unless the item's
    /// attempt count has exceeded the queue's retry policy, in which case
    /// it moves to the dead letter queue instead.
    async fn nack(&self, receipt: &ReceiptId) -> Result<(), QueueError>;

    /// List dead-lettered items, for inspection or manual replay.
    async fn dead_letters(&self) -> Result<Vec<QueueItem>, QueueError>;
}
