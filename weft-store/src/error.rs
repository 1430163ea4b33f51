//! Store errors.

use thiserror::Error;
use weft_core::ErrorCode;

/// Errors from a [`DurableStore`](crate::traits::DurableStore).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched the lookup.
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (duplicate trigger key, duplicate
    /// workflow name, etc.).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The write could not be committed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "STORE_NOT_FOUND",
            StoreError::Conflict(_) => "STORE_CONFLICT",
            StoreError::WriteFailed(_) => "STORE_WRITE_FAILED",
            StoreError::Other(_) => "STORE_OTHER",
        }
    }
}
