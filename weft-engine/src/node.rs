//! The node executor registry: one [`NodeExecutor`] per workflow node
//! `kind`, generalizing the two-way success/error executor contract into a
//! three-way one so a node can also suspend on a remote result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use weft_agent::{AgentLoop, AgentLoopConfig, AgentOutcome, AgentRunState, CreditLedger, PendingRemoteResult, RemoteResultStatus};
use weft_core::{OrgId, RequestId};
use weft_llm::LlmProvider;
use weft_tool::ToolRegistry;

use crate::error::EngineError;

/// Everything a node needs to execute, assembled by the run state machine
/// from the current [`crate::interpreter::RunCursor`] and the run's input.
pub struct ExecutionInput {
    /// Tenant this run belongs to.
    pub org: OrgId,
    /// The node's own configuration blob.
    pub config: Value,
    /// The run's trigger/invocation input.
    pub run_input: Value,
    /// Outputs of this node's direct predecessors, in edge order. Most
    /// executors only look at `steps[0]`; nodes with several inbound edges
    /// (a `parallel.join`) see all of them.
    pub steps: Vec<Value>,
    /// A previously dispatched remote result, present only when this call is
    /// resuming a node that returned [`NodeResult::Blocked`] earlier.
    pub pending_remote_result: Option<ResultEnvelope>,
    /// Checkpointed `weft-agent` state for this node, if it has taken a turn
    /// before (`agent.run` only).
    pub agent_state: Option<Value>,
}

/// A resolved remote result, handed back to the node that asked to be
/// blocked on it.
#[derive(Debug, Clone)]
pub enum ResultEnvelope {
    /// The remote side completed successfully.
    Succeeded {
        /// Its output.
        output: Value,
    },
    /// The remote side reported a failure.
    Failed {
        /// Its error message.
        error: String,
    },
}

/// The outcome of one [`NodeExecutor::execute`] call.
pub enum NodeResult {
    /// The node produced its output and is done.
    Succeeded {
        /// The node's output, threaded to its successors as an incoming step.
        output: Value,
    },
    /// The node failed. The engine decides whether this is retryable.
    Failed {
        /// What went wrong.
        error: String,
    },
    /// The node is waiting on a remote result before it can finish.
    Blocked {
        /// A request ID already assigned by a nested dispatch (`agent.run`'s
        /// tool calls go through the gateway themselves), or `None` if the
        /// engine still needs to dispatch `payload` via the gateway to get one.
        request_id: Option<RequestId>,
        /// What to dispatch (or what was dispatched).
        payload: Value,
        /// Routing hint for the gateway, if any.
        selector: Option<Value>,
    },
}

/// Executes one workflow node kind.
///
/// Unlike a tool call (see `weft_tool::ToolDyn`), a node executor's result
/// distinguishes "failed" from "blocked": a node can legitimately suspend a
/// run pending a remote answer without that being an error.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Run (or resume) this node.
    async fn execute(&self, input: ExecutionInput) -> Result<NodeResult, EngineError>;
}

/// Node executors keyed by `kind`.
#[derive(Default)]
pub struct NodeRegistry {
    executors: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor for a node kind, replacing any prior one.
    pub fn register(&mut self, kind: impl Into<String>, executor: Arc<dyn NodeExecutor>) {
        self.executors.insert(kind.into(), executor);
    }

    /// Look up the executor for a node kind.
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn NodeExecutor>> {
        self.executors.get(kind)
    }
}

fn json_path_get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| current.get(segment))
}

/// `condition`: evaluates a path against the run input and reports which
/// branch to take, without mutating anything.
pub struct ConditionExecutor;

#[derive(Debug, Deserialize)]
struct ConditionConfig {
    path: String,
    op: String,
    #[serde(default)]
    value: Value,
}

#[async_trait]
impl NodeExecutor for ConditionExecutor {
    async fn execute(&self, input: ExecutionInput) -> Result<NodeResult, EngineError> {
        let config: ConditionConfig =
            serde_json::from_value(input.config.clone()).map_err(|e| EngineError::InvalidNodeConfig {
                node_id: "condition".to_string(),
                message: e.to_string(),
            })?;
        let subject = input.steps.last().unwrap_or(&input.run_input);
        let found = json_path_get(subject, &config.path);
        let branch_true = match config.op.as_str() {
            "eq" => found == Some(&config.value),
            "ne" => found != Some(&config.value),
            "exists" => found.is_some(),
            "not_exists" => found.is_none(),
            other => {
                return Err(EngineError::InvalidNodeConfig {
                    node_id: "condition".to_string(),
                    message: format!("unknown condition op '{other}'"),
                })
            }
        };
        Ok(NodeResult::Succeeded {
            output: json!({
                "branch": if branch_true { "cond_true" } else { "cond_false" },
                "value": found,
            }),
        })
    }
}

/// `parallel.join`: the engine only invokes this once fan-in is satisfied
/// (see [`crate::interpreter::ready_nodes`]), so the executor itself is a
/// pass-through that reports the arrived branch outputs.
pub struct ParallelJoinExecutor;

#[async_trait]
impl NodeExecutor for ParallelJoinExecutor {
    async fn execute(&self, input: ExecutionInput) -> Result<NodeResult, EngineError> {
        Ok(NodeResult::Succeeded {
            output: json!({ "joined": input.steps }),
        })
    }
}

/// `http.request`: makes an outbound HTTP call.
pub struct HttpRequestExecutor {
    client: reqwest::Client,
}

impl HttpRequestExecutor {
    /// Build an executor backed by a fresh client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpRequestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct HttpRequestConfig {
    #[serde(default = "default_method")]
    method: String,
    url: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

#[async_trait]
impl NodeExecutor for HttpRequestExecutor {
    async fn execute(&self, input: ExecutionInput) -> Result<NodeResult, EngineError> {
        let config: HttpRequestConfig =
            serde_json::from_value(input.config.clone()).map_err(|e| EngineError::InvalidNodeConfig {
                node_id: "http.request".to_string(),
                message: e.to_string(),
            })?;
        let method = reqwest::Method::from_bytes(config.method.as_bytes()).map_err(|e| EngineError::InvalidNodeConfig {
            node_id: "http.request".to_string(),
            message: e.to_string(),
        })?;
        let mut request = self
            .client
            .request(method, &config.url)
            .timeout(Duration::from_millis(config.timeout_ms));
        for (name, value) in &config.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &config.body {
            request = request.json(body);
        }
        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body: Value = response.json().await.unwrap_or(Value::Null);
                Ok(NodeResult::Succeeded {
                    output: json!({ "status": status, "body": body }),
                })
            }
            Err(e) => Ok(NodeResult::Failed { error: e.to_string() }),
        }
    }
}

/// `connector.action`: invokes a third-party connector action, either inline
/// (`execution.mode = "cloud"`) or dispatched to a remote executor
/// (`execution.mode = "node"`).
pub struct ConnectorActionExecutor;

#[derive(Debug, Deserialize)]
struct ConnectorActionConfig {
    connector_id: String,
    action_id: String,
    #[serde(default)]
    input: Value,
    #[serde(default)]
    execution: ConnectorExecution,
}

#[derive(Debug, Default, Deserialize)]
struct ConnectorExecution {
    #[serde(default = "default_execution_mode")]
    mode: String,
    #[serde(default)]
    selector: Option<Value>,
}

fn default_execution_mode() -> String {
    "cloud".to_string()
}

#[async_trait]
impl NodeExecutor for ConnectorActionExecutor {
    async fn execute(&self, input: ExecutionInput) -> Result<NodeResult, EngineError> {
        if let Some(result) = input.pending_remote_result {
            return Ok(match result {
                ResultEnvelope::Succeeded { output } => NodeResult::Succeeded { output },
                ResultEnvelope::Failed { error } => NodeResult::Failed { error },
            });
        }
        let config: ConnectorActionConfig =
            serde_json::from_value(input.config.clone()).map_err(|e| EngineError::InvalidNodeConfig {
                node_id: "connector.action".to_string(),
                message: e.to_string(),
            })?;
        if config.execution.mode == "node" {
            return Ok(NodeResult::Blocked {
                request_id: None,
                payload: json!({
                    "connectorId": config.connector_id,
                    "actionId": config.action_id,
                    "input": config.input,
                }),
                selector: config.execution.selector,
            });
        }
        Ok(NodeResult::Succeeded {
            output: json!({
                "connectorId": config.connector_id,
                "actionId": config.action_id,
                "input": config.input,
            }),
        })
    }
}

/// `agent.execute`: hands off to an out-of-process agent session. Always
/// dispatches; the engine never runs this in-process (see `agent.run` for
/// the in-process variant).
pub struct AgentExecuteExecutor;

#[async_trait]
impl NodeExecutor for AgentExecuteExecutor {
    async fn execute(&self, input: ExecutionInput) -> Result<NodeResult, EngineError> {
        if let Some(result) = input.pending_remote_result {
            return Ok(match result {
                ResultEnvelope::Succeeded { output } => NodeResult::Succeeded { output },
                ResultEnvelope::Failed { error } => NodeResult::Failed { error },
            });
        }
        Ok(NodeResult::Blocked {
            request_id: None,
            payload: json!({ "kind": "agent.execute", "config": input.config }),
            selector: input.config.get("selector").cloned(),
        })
    }
}

/// `agent.run`: drives a `weft-agent` ReAct loop in-process. Generic over
/// the LLM provider so heterogeneous executors can still share one
/// object-safe [`NodeRegistry`] — the object safety boundary lives on
/// [`NodeExecutor`], not on `weft_llm::LlmProvider`.
pub struct AgentRunExecutor<P: LlmProvider + Send + Sync + 'static> {
    provider: P,
    tools: ToolRegistry,
    credits: Arc<dyn CreditLedger>,
}

impl<P: LlmProvider + Send + Sync + 'static> AgentRunExecutor<P> {
    /// Build an executor around a provider, its callable tools, and a
    /// credit ledger shared across agent runs.
    pub fn new(provider: P, tools: ToolRegistry, credits: Arc<dyn CreditLedger>) -> Self {
        Self {
            provider,
            tools,
            credits,
        }
    }
}

#[async_trait]
impl<P: LlmProvider + Send + Sync + 'static> NodeExecutor for AgentRunExecutor<P> {
    async fn execute(&self, input: ExecutionInput) -> Result<NodeResult, EngineError> {
        let config: AgentLoopConfig =
            serde_json::from_value(input.config.clone()).map_err(|e| EngineError::InvalidNodeConfig {
                node_id: "agent.run".to_string(),
                message: e.to_string(),
            })?;
        let mut state: AgentRunState = match input.agent_state {
            Some(value) => serde_json::from_value(value).map_err(|e| EngineError::InvalidNodeConfig {
                node_id: "agent.run".to_string(),
                message: e.to_string(),
            })?,
            None => AgentRunState::default(),
        };
        let pending = match input.pending_remote_result {
            Some(envelope) => {
                let request_id = state
                    .pending_tool_call
                    .as_ref()
                    .map(|p| p.request_id.clone())
                    .ok_or_else(|| EngineError::RemoteResultInvalid("agent.run has no pending tool call".to_string()))?;
                Some(PendingRemoteResult {
                    request_id,
                    status: match envelope {
                        ResultEnvelope::Succeeded { output } => RemoteResultStatus::Succeeded { output },
                        ResultEnvelope::Failed { error } => RemoteResultStatus::Failed { error },
                    },
                })
            }
            None => None,
        };

        let agent_loop = AgentLoop {
            provider: &self.provider,
            tools: &self.tools,
            credits: self.credits.as_ref(),
            org: &input.org,
            config: &config,
        };
        match agent_loop.run(input.run_input.clone(), &mut state, pending).await {
            Ok(AgentOutcome::Succeeded { output }) => Ok(NodeResult::Succeeded { output }),
            Ok(AgentOutcome::Blocked { request_id }) => Ok(NodeResult::Blocked {
                request_id: Some(request_id),
                payload: serde_json::to_value(&state).unwrap_or(Value::Null),
                selector: None,
            }),
            Err(e) => Ok(NodeResult::Failed { error: e.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_input(config: Value, run_input: Value) -> ExecutionInput {
        ExecutionInput {
            org: OrgId::new("org_1"),
            config,
            run_input,
            steps: vec![],
            pending_remote_result: None,
            agent_state: None,
        }
    }

    #[tokio::test]
    async fn condition_true_branch() {
        let executor = ConditionExecutor;
        let input = base_input(json!({"path": "flag", "op": "eq", "value": true}), json!({"flag": true}));
        match executor.execute(input).await.unwrap() {
            NodeResult::Succeeded { output } => assert_eq!(output["branch"], json!("cond_true")),
            _ => panic!("expected Succeeded"),
        }
    }

    #[tokio::test]
    async fn condition_false_branch() {
        let executor = ConditionExecutor;
        let input = base_input(json!({"path": "flag", "op": "eq", "value": true}), json!({"flag": false}));
        match executor.execute(input).await.unwrap() {
            NodeResult::Succeeded { output } => assert_eq!(output["branch"], json!("cond_false")),
            _ => panic!("expected Succeeded"),
        }
    }

    #[tokio::test]
    async fn condition_exists_op() {
        let executor = ConditionExecutor;
        let input = base_input(json!({"path": "missing", "op": "exists"}), json!({"flag": true}));
        match executor.execute(input).await.unwrap() {
            NodeResult::Succeeded { output } => assert_eq!(output["branch"], json!("cond_false")),
            _ => panic!("expected Succeeded"),
        }
    }

    #[tokio::test]
    async fn connector_action_cloud_mode_completes_inline() {
        let executor = ConnectorActionExecutor;
        let input = base_input(
            json!({"connectorId": "slack", "actionId": "post", "input": {"text": "hi"}}),
            json!({}),
        );
        match executor.execute(input).await.unwrap() {
            NodeResult::Succeeded { output } => assert_eq!(output["connectorId"], json!("slack")),
            _ => panic!("expected Succeeded"),
        }
    }

    #[tokio::test]
    async fn connector_action_node_mode_blocks() {
        let executor = ConnectorActionExecutor;
        let input = base_input(
            json!({"connectorId": "slack", "actionId": "post", "input": {}, "execution": {"mode": "node"}}),
            json!({}),
        );
        match executor.execute(input).await.unwrap() {
            NodeResult::Blocked { request_id, .. } => assert!(request_id.is_none()),
            _ => panic!("expected Blocked"),
        }
    }

    #[tokio::test]
    async fn connector_action_resumes_from_pending_result() {
        let executor = ConnectorActionExecutor;
        let mut input = base_input(json!({"connectorId": "slack", "actionId": "post"}), json!({}));
        input.pending_remote_result = Some(ResultEnvelope::Succeeded { output: json!({"ok": true}) });
        match executor.execute(input).await.unwrap() {
            NodeResult::Succeeded { output } => assert_eq!(output, json!({"ok": true})),
            _ => panic!("expected Succeeded"),
        }
    }

    #[tokio::test]
    async fn agent_execute_always_blocks_on_first_call() {
        let executor = AgentExecuteExecutor;
        let input = base_input(json!({}), json!({}));
        match executor.execute(input).await.unwrap() {
            NodeResult::Blocked { .. } => {}
            _ => panic!("expected Blocked"),
        }
    }
}
