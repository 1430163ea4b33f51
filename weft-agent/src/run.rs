//! The agent loop: drives a model through a bounded ReAct conversation,
//! arbitrating tool calls against an allowlist and suspending on remote
//! dispatch.
//!
//! Each turn enforces limits, calls the model, branches on its envelope,
//! executes any requested tool, checkpoints, and loops until a `final`
//! envelope, a suspension, or a fatal limit/error ends the run.

use crate::config::{AgentLoopConfig, AgentLoopLimits, OutputMode, TeammateConfig};
use crate::credits::{credits_for_tokens, CreditLedger};
use crate::envelope::AgentEnvelope;
use crate::error::AgentError;
use crate::remote::{PendingRemoteResult, RemoteResultStatus};
use crate::state::{AgentRunState, PendingToolCall};
use futures_util::future::join_all;
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use weft_core::{ErrorCode, OrgId, RequestId};
use weft_llm::{CompletionRequest, LlmProvider, Message, Role};
use weft_tool::{ToolOutcome, ToolRegistry};

/// Result of a completed (or suspended) agent loop run.
#[derive(Debug, Clone)]
pub enum AgentOutcome {
    /// The loop returned a `final` envelope that passed output validation.
    Succeeded {
        /// The validated output.
        output: Value,
    },
    /// A tool call was dispatched to a remote executor; the caller must
    /// checkpoint `state` and resume with a matching [`PendingRemoteResult`]
    /// once the gateway resolves `request_id`.
    Blocked {
        /// The gateway dispatch request the caller should wait on.
        request_id: RequestId,
    },
}

/// Drives one agent loop run against a specific model/tool/credit
/// configuration. Cheap to construct; holds only borrows.
pub struct AgentLoop<'a, P: LlmProvider> {
    /// LLM backend.
    pub provider: &'a P,
    /// Tools reachable by name, already restricted to this org/session's
    /// base set; the allow-list check against `config.tools_allow` happens
    /// per call, not at construction.
    pub tools: &'a ToolRegistry,
    /// Gates and charges model calls.
    pub credits: &'a dyn CreditLedger,
    /// Tenant this run belongs to, for credit accounting.
    pub org: &'a OrgId,
    /// Model, prompt, limits, and policy for this run.
    pub config: &'a AgentLoopConfig,
}

enum ToolLookup {
    Denied(String),
    Team(&'static str),
    Registry(String, Value),
}

impl<'a, P: LlmProvider> AgentLoop<'a, P> {
    /// Run (or resume) the loop to completion, suspension, or a fatal error.
    ///
    /// On the first call for a run, `state` should be
    /// [`AgentRunState::default`]; `run_input` seeds the initial user
    /// message. On resume after a [`AgentOutcome::Blocked`], pass the same
    /// `state` the caller checkpointed plus the [`PendingRemoteResult`] the
    /// gateway produced; `run_input` is ignored once history is non-empty.
    pub async fn run(
        &self,
        run_input: Value,
        state: &mut AgentRunState,
        pending_remote_result: Option<PendingRemoteResult>,
    ) -> Result<AgentOutcome, AgentError> {
        let limits = &self.config.limits;
        let deadline = Instant::now() + limits.timeout_ms.to_std();

        if state.history.is_empty() {
            state
                .history
                .push(Message::new(Role::User, render_run_input(&run_input)));
        }

        self.consume_pending_remote_result(state, pending_remote_result)?;

        loop {
            if Instant::now() >= deadline {
                return Err(AgentError::Timeout);
            }
            if state.turns >= limits.max_turns {
                return Err(AgentError::MaxTurnsExceeded(limits.max_turns));
            }
            self.credits
                .ensure_available(self.org, 1)
                .await
                .map_err(|_| AgentError::CreditsExhausted)?;

            let request = CompletionRequest {
                model: Some(self.config.model.clone()),
                messages: state.history.clone(),
                max_tokens: None,
                temperature: None,
                system: Some(self.config.system_prompt.clone()),
                extra: Value::Null,
            };

            let response = self.complete_with_retry(request, deadline).await?;
            state.turns += 1;
            state.total_input_tokens += response.usage.input_tokens;
            state.total_output_tokens += response.usage.output_tokens;
            let charge = credits_for_tokens(response.usage.input_tokens, response.usage.output_tokens);
            let _ = self.credits.charge(self.org, charge).await;

            let envelope = AgentEnvelope::parse(&response.text)
                .map_err(|e| AgentError::InvalidOutput(e.to_string()))?;

            match envelope {
                AgentEnvelope::Final { output } => {
                    self.validate_output(&output)?;
                    return Ok(AgentOutcome::Succeeded { output });
                }
                AgentEnvelope::ToolCall { tool_id, input } => {
                    if state.tool_calls >= limits.max_tool_calls {
                        return Err(AgentError::MaxToolCallsExceeded(limits.max_tool_calls));
                    }
                    state
                        .history
                        .push(Message::new(Role::Assistant, response.text.clone()));
                    let call_index = state.tool_calls;
                    state.tool_calls += 1;

                    if let Some(outcome) = self
                        .dispatch_tool_call(state, call_index, &tool_id, input, deadline)
                        .await?
                    {
                        return Ok(outcome);
                    }
                    state.trim_to_budget(limits.max_runtime_chars);
                }
            }
        }
    }

    fn consume_pending_remote_result(
        &self,
        state: &mut AgentRunState,
        pending_remote_result: Option<PendingRemoteResult>,
    ) -> Result<(), AgentError> {
        match (state.pending_tool_call.clone(), pending_remote_result) {
            (None, None) => Ok(()),
            (Some(pending), None) => Err(AgentError::RemoteResultInvalid(format!(
                "run is blocked on request {} with no remote result supplied",
                pending.request_id
            ))),
            (None, Some(result)) => Err(AgentError::RemoteResultInvalid(format!(
                "no pending tool call to match result for request {}",
                result.request_id
            ))),
            (Some(pending), Some(result)) => {
                if !result.matches(&pending.request_id) {
                    return Err(AgentError::RemoteResultInvalid(format!(
                        "expected result for request {}, got {}",
                        pending.request_id, result.request_id
                    )));
                }
                match result.status {
                    RemoteResultStatus::Succeeded { output } => {
                        record_succeeded(
                            state,
                            pending.call_index,
                            &output,
                            self.config.limits.max_output_chars,
                        );
                    }
                    RemoteResultStatus::Failed { error } => {
                        record_failed(
                            state,
                            pending.call_index,
                            &error,
                            self.config.limits.max_output_chars,
                        );
                    }
                }
                state.pending_tool_call = None;
                state.trim_to_budget(self.config.limits.max_runtime_chars);
                Ok(())
            }
        }
    }

    /// Returns `Ok(Some(outcome))` when the call blocked (the loop should
    /// return immediately), `Ok(None)` to keep looping.
    async fn dispatch_tool_call(
        &self,
        state: &mut AgentRunState,
        call_index: u32,
        tool_id: &str,
        input: Value,
        deadline: Instant,
    ) -> Result<Option<AgentOutcome>, AgentError> {
        let max_chars = self.config.limits.max_output_chars;
        match self.resolve_tool(tool_id, &input) {
            ToolLookup::Denied(code) => {
                record_failed(state, call_index, &code, max_chars);
                Ok(None)
            }
            ToolLookup::Team(kind) => {
                let value = self.run_team(kind, &input, deadline).await?;
                record_succeeded(state, call_index, &value, max_chars);
                Ok(None)
            }
            ToolLookup::Registry(name, expanded_input) => match self.tools.get(&name) {
                None => {
                    record_failed(state, call_index, &format!("TOOL_NOT_FOUND:{name}"), max_chars);
                    Ok(None)
                }
                Some(tool) => match tool.call(expanded_input).await {
                    Ok(ToolOutcome::Completed(value)) => {
                        record_succeeded(state, call_index, &value, max_chars);
                        Ok(None)
                    }
                    Ok(ToolOutcome::Blocked { request_id }) => {
                        state.pending_tool_call = Some(PendingToolCall {
                            call_index,
                            tool_id: tool_id.to_string(),
                            request_id: request_id.clone(),
                        });
                        state.trim_to_budget(self.config.limits.max_runtime_chars);
                        Ok(Some(AgentOutcome::Blocked { request_id }))
                    }
                    Err(e) => {
                        record_failed(state, call_index, &format!("{}:{}", e.code(), e), max_chars);
                        Ok(None)
                    }
                },
            },
        }
    }

    fn resolve_tool(&self, tool_id: &str, input: &Value) -> ToolLookup {
        if !self.config.tools_allow.contains(tool_id) {
            return ToolLookup::Denied(format!("TOOL_NOT_ALLOWED:{tool_id}"));
        }
        if tool_id == "shell.run" && !self.config.shell_run_enabled {
            return ToolLookup::Denied(format!("TOOL_POLICY_DENIED:{tool_id}"));
        }
        if tool_id == "team.delegate" {
            return ToolLookup::Team("delegate");
        }
        if tool_id == "team.map" {
            return ToolLookup::Team("map");
        }
        if let Some(rest) = tool_id.strip_prefix("connector.") {
            let mut parts = rest.splitn(2, '.');
            if let (Some(conn), Some(action)) = (parts.next(), parts.next()) {
                let mut expanded = input.clone();
                if let Value::Object(map) = &mut expanded {
                    map.insert("connectorId".to_string(), json!(conn));
                    map.insert("actionId".to_string(), json!(action));
                }
                return ToolLookup::Registry("connector.action".to_string(), expanded);
            }
        }
        ToolLookup::Registry(tool_id.to_string(), input.clone())
    }

    async fn complete_with_retry(
        &self,
        request: CompletionRequest,
        deadline: Instant,
    ) -> Result<weft_llm::CompletionResponse, AgentError> {
        let mut attempt = 0u32;
        loop {
            match self.provider.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(AgentError::Provider(err.to_string()));
                    }
                    let backoff = backoff_for_attempt(attempt).min(remaining);
                    attempt += 1;
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(AgentError::Provider(err.to_string())),
            }
        }
    }

    fn validate_output(&self, output: &Value) -> Result<(), AgentError> {
        match &self.config.output_mode {
            OutputMode::Text => Ok(()),
            OutputMode::Json { schema: None } => Ok(()),
            OutputMode::Json {
                schema: Some(schema),
            } => {
                let validator = jsonschema::validator_for(schema)
                    .map_err(|e| AgentError::InvalidJsonOutput(format!("invalid schema: {e}")))?;
                if validator.validate(output).is_err() {
                    let errors: Vec<String> =
                        validator.iter_errors(output).map(|e| e.to_string()).take(3).collect();
                    Err(AgentError::InvalidJsonOutput(errors.join("; ")))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Run `team.delegate`/`team.map`. Errors here are only ones that make
    /// the call a misconfiguration (unknown teammate); a teammate's own
    /// run failing, timing out, or blocking is captured in the returned
    /// value so the parent model sees it as an ordinary tool result.
    async fn run_team(&self, kind: &'static str, input: &Value, deadline: Instant) -> Result<Value, AgentError> {
        let team = self
            .config
            .team
            .as_ref()
            .ok_or_else(|| AgentError::UnknownTeammate("no team configured".to_string()))?;
        let teammate_name = input
            .get("teammate")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::UnknownTeammate("missing \"teammate\" field".to_string()))?;
        let teammate = team
            .find(teammate_name)
            .ok_or_else(|| AgentError::UnknownTeammate(teammate_name.to_string()))?;

        match kind {
            "delegate" => {
                let child_input = input.get("input").cloned().unwrap_or(Value::Null);
                let outcome = self.run_teammate(teammate, child_input, deadline).await;
                Ok(outcome_to_value(outcome))
            }
            "map" => {
                let inputs: Vec<Value> = input
                    .get("inputs")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let max_parallel = team.max_parallel.max(1);
                let semaphore = Arc::new(Semaphore::new(max_parallel));
                let results = join_all(inputs.into_iter().map(|item| {
                    let semaphore = Arc::clone(&semaphore);
                    async move {
                        let _permit = semaphore.acquire().await.expect("semaphore never closed");
                        self.run_teammate(teammate, item, deadline).await
                    }
                }))
                .await;
                Ok(Value::Array(results.into_iter().map(outcome_to_value).collect()))
            }
            _ => unreachable!("resolve_tool only produces \"delegate\"/\"map\""),
        }
    }

    fn run_teammate<'b>(
        &'b self,
        teammate: &'b TeammateConfig,
        input: Value,
        deadline: Instant,
    ) -> Pin<Box<dyn Future<Output = Result<AgentOutcome, AgentError>> + Send + 'b>> {
        Box::pin(async move {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let mut tools_allow = teammate.tools_allow.clone();
            tools_allow.remove("team.delegate");
            tools_allow.remove("team.map");
            let child_config = AgentLoopConfig {
                model: teammate.model.clone().unwrap_or_else(|| self.config.model.clone()),
                system_prompt: teammate.system_prompt.clone(),
                tools_allow,
                shell_run_enabled: self.config.shell_run_enabled,
                limits: AgentLoopLimits {
                    timeout_ms: weft_core::DurationMs::from_millis(remaining.as_millis() as u64),
                    ..self.config.limits.clone()
                },
                output_mode: OutputMode::Text,
                team: None,
            };
            let child_loop = AgentLoop {
                provider: self.provider,
                tools: self.tools,
                credits: self.credits,
                org: self.org,
                config: &child_config,
            };
            let mut child_state = AgentRunState::default();
            child_loop.run(input, &mut child_state, None).await
        })
    }
}

fn outcome_to_value(outcome: Result<AgentOutcome, AgentError>) -> Value {
    match outcome {
        Ok(AgentOutcome::Succeeded { output }) => output,
        Ok(AgentOutcome::Blocked { request_id }) => json!({
            "error": "TEAMMATE_BLOCKED",
            "requestId": request_id.as_str(),
        }),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

fn render_run_input(run_input: &Value) -> String {
    format!(
        "Run input:\n{}",
        serde_json::to_string_pretty(run_input).unwrap_or_else(|_| run_input.to_string())
    )
}

fn record_succeeded(state: &mut AgentRunState, call_index: u32, output: &Value, max_chars: usize) {
    record_tool_result(state, call_index, "succeeded", &truncate(&output.to_string(), max_chars), true);
}

fn record_failed(state: &mut AgentRunState, call_index: u32, error: &str, max_chars: usize) {
    record_tool_result(state, call_index, "failed", &truncate(error, max_chars), false);
}

fn record_tool_result(state: &mut AgentRunState, call_index: u32, status: &str, body: &str, succeeded: bool) {
    let mut payload = serde_json::Map::new();
    payload.insert("type".to_string(), json!("tool_result"));
    payload.insert("callIndex".to_string(), json!(call_index));
    payload.insert("status".to_string(), json!(status));
    payload.insert(
        (if succeeded { "output" } else { "error" }).to_string(),
        json!(body),
    );
    let value = Value::Object(payload);
    state.tool_results_by_call_index.insert(call_index, value.clone());
    state
        .history
        .push(Message::new(Role::User, format!("```tool_result\n{value}\n```")));
}

fn backoff_for_attempt(attempt: u32) -> Duration {
    let base = Duration::from_millis(200);
    let factor = 2u32.saturating_pow(attempt.min(16));
    base.saturating_mul(factor).min(Duration::from_secs(2))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(max_chars).collect();
    truncated.push_str("...<truncated>");
    truncated
}
