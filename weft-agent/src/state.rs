//! [`AgentRunState`], the resumable checkpoint for a blocked agent loop.
//!
//! This is the runtime subtree persisted onto `weft-store`'s
//! `AgentSession::run_state` (or a workflow run's `runtime.agentRuns[nodeId]`)
//! as an opaque `serde_json::Value` — this crate is the only reader/writer,
//! the store just carries the bytes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use weft_core::RequestId;
use weft_llm::Message;

/// Marks a tool call awaiting a remote executor's result.
///
/// The only field a resuming worker is allowed to write on a borrowed run —
/// every other part of `AgentRunState` is owned by whichever worker is
/// currently driving the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingToolCall {
    /// Index into `history`/`toolResultsByCallIndex` for this call.
    pub call_index: u32,
    /// The (possibly alias-expanded) tool id that was invoked.
    pub tool_id: String,
    /// The gateway dispatch request tracking this call.
    pub request_id: RequestId,
}

/// The resumable state of one agent loop run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRunState {
    /// Total tool calls made so far (bounded by `maxToolCalls`).
    pub tool_calls: u32,
    /// Total model turns taken so far (bounded by `maxTurns`).
    pub turns: u32,
    /// Conversation history, oldest first. Trimmed from the front when
    /// the serialized state exceeds `maxRuntimeChars`.
    pub history: Vec<Message>,
    /// Tool call results keyed by call index, for audit/replay.
    pub tool_results_by_call_index: HashMap<u32, serde_json::Value>,
    /// Set while waiting on a remote executor; cleared once the matching
    /// result is injected.
    pub pending_tool_call: Option<PendingToolCall>,
    /// Running total of input tokens across every turn, including ones
    /// from before a crash/resume — kept on the checkpoint since nothing
    /// else survives a worker restart mid-run.
    pub total_input_tokens: u64,
    /// Running total of output tokens across every turn.
    pub total_output_tokens: u64,
}

/// Minimum number of trailing history entries never trimmed, so an
/// in-flight tool call/result pair (and the turn that produced it) is
/// never split across the trim boundary.
const MIN_KEPT_HISTORY: usize = 4;

impl AgentRunState {
    /// Trim the oldest history entries until the serialized state fits
    /// within `max_chars`, always keeping at least `MIN_KEPT_HISTORY`
    /// trailing entries (and everything a pending tool call references).
    pub fn trim_to_budget(&mut self, max_chars: usize) {
        let floor = MIN_KEPT_HISTORY.max(self.min_retained_for_pending());
        while self.serialized_len() > max_chars && self.history.len() > floor {
            self.history.remove(0);
        }
    }

    fn min_retained_for_pending(&self) -> usize {
        match &self.pending_tool_call {
            // The pending call's own turn (assistant tool_call message) is
            // always the most recent history entry, so one suffices here;
            // MIN_KEPT_HISTORY already covers the common case generously.
            Some(_) => 1,
            None => 0,
        }
    }

    fn serialized_len(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }
}
