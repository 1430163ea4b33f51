//! Configuration for one [`crate::AgentLoop::run`] invocation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use weft_core::DurationMs;

/// Whether the loop's final output is free text or a schema-validated value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutputMode {
    /// `output` may be any JSON value; no validation.
    Text,
    /// `output` must validate against `schema` when present; a schema-less
    /// json mode still requires the envelope to parse as `final`, but
    /// performs no further structural check.
    Json {
        /// Optional JSON Schema the `final` envelope's `output` must satisfy.
        #[serde(skip_serializing_if = "Option::is_none")]
        schema: Option<serde_json::Value>,
    },
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Text
    }
}

/// Bounds enforced every turn; exceeding any is fatal to the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLoopLimits {
    /// Maximum model turns.
    pub max_turns: u32,
    /// Maximum tool calls across all turns.
    pub max_tool_calls: u32,
    /// Wall-clock budget for the whole loop, including retries.
    pub timeout_ms: DurationMs,
    /// Maximum length of a single tool-result summary injected into history.
    pub max_output_chars: usize,
    /// Maximum serialized size of the checkpointed [`crate::state::AgentRunState`].
    pub max_runtime_chars: usize,
}

impl Default for AgentLoopLimits {
    fn default() -> Self {
        Self {
            max_turns: 25,
            max_tool_calls: 50,
            timeout_ms: DurationMs::from_secs(300),
            max_output_chars: 4_000,
            max_runtime_chars: 200_000,
        }
    }
}

/// A named teammate reachable via `team.delegate`/`team.map`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeammateConfig {
    /// The name referenced as `team.delegate`'s/`team.map`'s `teammate` input.
    pub name: String,
    /// System prompt for the nested loop.
    pub system_prompt: String,
    /// Tool ids this teammate may call, independent of the parent's allow-list.
    /// Delegation tools (`team.delegate`, `team.map`) are excluded recursively
    /// regardless of what's listed here.
    pub tools_allow: BTreeSet<String>,
    /// Model id override for the nested loop; falls back to the parent's.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Delegation settings for `team.delegate`/`team.map`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamConfig {
    /// Teammates reachable by name.
    pub teammates: Vec<TeammateConfig>,
    /// Maximum teammates run concurrently by a single `team.map` call.
    pub max_parallel: usize,
}

impl TeamConfig {
    /// Look up a teammate by name.
    pub fn find(&self, name: &str) -> Option<&TeammateConfig> {
        self.teammates.iter().find(|t| t.name == name)
    }
}

/// Full configuration for one agent loop run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLoopConfig {
    /// Model identifier passed to the LLM provider.
    pub model: String,
    /// System prompt: policy plus the allowed tool ids, rendered by the caller.
    pub system_prompt: String,
    /// Tool ids executable by this loop. `connector.<conn>.<action>` aliases
    /// are matched against this set in their expanded `connector.action`
    /// form by the caller; the raw alias string is what callers list here.
    pub tools_allow: BTreeSet<String>,
    /// Whether `shell.run` is permitted for this org (`tools.shellRunEnabled`).
    pub shell_run_enabled: bool,
    /// Turn/tool-call/wall-time/size bounds.
    pub limits: AgentLoopLimits,
    /// Whether the final output is free text or schema-validated JSON.
    #[serde(default)]
    pub output_mode: OutputMode,
    /// Teammates reachable via `team.delegate`/`team.map`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamConfig>,
}
