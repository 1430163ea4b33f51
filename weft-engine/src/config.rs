//! Tunables for the run state machine.

use weft_core::DurationMs;

/// Bounds and timing for [`crate::run::Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Immediate in-process retries a single node gets (e.g. a flaky HTTP
    /// call) before the whole run is requeued for a backed-off retry.
    pub max_node_attempts: u32,
    /// How many whole-run attempts a run gets before a node failure that
    /// exhausted its in-process retries becomes a terminal failure.
    pub max_run_attempts: u32,
    /// Base delay between a node's in-process retries.
    pub node_retry_base: DurationMs,
    /// Per-node execution deadline.
    pub node_timeout: DurationMs,
    /// Visibility timeout used when claiming a run off the work queue.
    pub claim_visibility_timeout: DurationMs,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_node_attempts: 3,
            max_run_attempts: 3,
            node_retry_base: DurationMs::from_millis(200),
            node_timeout: DurationMs::from_secs(30),
            claim_visibility_timeout: DurationMs::from_secs(60),
        }
    }
}
