//! # weft-queue — visibility-timeout work queue
//!
//! A claim/ack/nack queue for scheduling run dispatch and retries, rather
//! than a plain FIFO: a claimed item stays invisible to other workers only
//! until its visibility timeout, so a crashed worker's work is picked back
//! up automatically instead of being lost.

#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod model;
pub mod traits;

pub use error::QueueError;
pub use memory::MemoryWorkQueue;
pub use model::{ClaimedItem, QueueConfig, QueueItem, ReceiptId};
pub use traits::WorkQueue;
