//! Queue errors.

use thiserror::Error;
use weft_core::ErrorCode;

/// Errors from a [`WorkQueue`](crate::traits::WorkQueue).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum QueueError {
    /// The receipt does not correspond to a currently claimed item (already
    /// acked, already expired and reclaimed, or never issued).
    #[error("unknown or expired receipt: {0}")]
    UnknownReceipt(String),

    /// The underlying backend is unavailable (used by out-of-process
    /// implementations; the in-memory queue never returns this).
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ErrorCode for QueueError {
    fn code(&self) -> &'static str {
        match self {
            QueueError::UnknownReceipt(_) => "QUEUE_UNKNOWN_RECEIPT",
            QueueError::Unavailable(_) => "QUEUE_UNAVAILABLE",
            QueueError::Other(_) => "QUEUE_OTHER",
        }
    }
}
