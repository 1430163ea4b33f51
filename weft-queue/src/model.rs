//! Queue item and receipt types.

use serde::{Deserialize, Serialize};
use weft_core::DurationMs;

/// An opaque receipt issued when an item is claimed, used to ack/nack it.
///
/// Not the same value across re-claims: every successful `claim` mints a
/// fresh receipt, so an ack carrying a stale receipt (from a worker that
/// held the item past its visibility timeout and lost the race to a second
/// claimant) is rejected rather than silently acking the wrong attempt.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReceiptId(pub String);

impl std::fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An item enqueued for later dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    /// Dedup key. Enqueuing with a key already present (and not yet
    /// acked or dead-lettered) is a no-op — this is what makes enqueue
    /// idempotent for callers that retry after an uncertain outcome.
    pub idempotency_key: String,
    /// Opaque payload, e.g. a run ID or `(run ID, node ID)` pair to resume.
    pub payload: serde_json::Value,
    /// How many times this item has been claimed and nacked so far.
    pub attempt: u32,
}

impl QueueItem {
    /// Construct a fresh item at attempt 0.
    pub fn new(idempotency_key: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            idempotency_key: idempotency_key.into(),
            payload,
            attempt: 0,
        }
    }
}

/// An item handed to a claimant, along with the receipt it must present to
/// ack or nack it.
#[derive(Debug, Clone)]
pub struct ClaimedItem {
    /// The receipt for this claim.
    pub receipt: ReceiptId,
    /// The claimed item.
    pub item: QueueItem,
}

/// Retry policy applied on `nack`.
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    /// Attempts beyond this count are moved to the dead letter queue
    /// instead of being requeued.
    pub max_attempts: u32,
    /// Base delay before the first retry.
    pub base_backoff: DurationMs,
    /// Upper bound on the computed backoff, regardless of attempt count.
    pub max_backoff: DurationMs,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: DurationMs::from_millis(500),
            max_backoff: DurationMs::from_secs(300),
        }
    }
}

impl QueueConfig {
    /// Exponential backoff for the given attempt count, capped at
    /// `max_backoff`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> DurationMs {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let candidate = self.base_backoff.saturating_mul(factor);
        candidate.min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        let cfg = QueueConfig {
            max_attempts: 5,
            base_backoff: DurationMs::from_millis(100),
            max_backoff: DurationMs::from_secs(10),
        };
        assert_eq!(cfg.backoff_for_attempt(0).as_millis(), 100);
        assert_eq!(cfg.backoff_for_attempt(1).as_millis(), 200);
        assert_eq!(cfg.backoff_for_attempt(2).as_millis(), 400);
        assert_eq!(cfg.backoff_for_attempt(10).as_millis(), 10_000);
    }
}
