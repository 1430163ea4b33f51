#![deny(missing_docs)]
//! # weft-scheduler — cron/heartbeat trigger poller
//!
//! A single-leader polling loop that finds trigger subscriptions due to
//! fire, claims each slot at most once through the store's unique
//! `(org, workflow, trigger_key)` constraint, and enqueues a run for
//! `weft-engine` to pick up. Cron parsing uses the `cron` crate; heartbeat
//! due-checks and catch-up are computed directly since `cron` has no
//! concept of a fixed-interval, skew-tolerant schedule.

pub mod error;
pub mod poller;

pub use error::SchedulerError;
pub use poller::TriggerPoller;
