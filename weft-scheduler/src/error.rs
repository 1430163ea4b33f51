//! Error type for the trigger poller.

use weft_core::ErrorCode;
use weft_queue::QueueError;
use weft_store::StoreError;

/// Errors the scheduler can surface. An invalid cron expression is not
/// included here: it is handled inline by deferring the subscription
/// rather than failing the whole tick, so one bad subscription never
/// stalls the rest.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The store rejected a read or write.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// The queue rejected an enqueue.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

impl ErrorCode for SchedulerError {
    fn code(&self) -> &'static str {
        match self {
            SchedulerError::Store(e) => e.code(),
            SchedulerError::Queue(e) => e.code(),
        }
    }
}
