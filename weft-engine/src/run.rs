//! The run state machine: claims a run off the work queue, advances its
//! execution frontier one slice at a time, and persists its position after
//! every node so a crash mid-run resumes rather than restarts.
//!
//! Grounded on the teacher's `WorkflowExecutor::run`/`execute_with_retry`
//! shape (claim, build context, walk nodes in topological order, retry
//! with backoff, persist), generalized from that executor's linear chain
//! to the frontier/condition-skip/parallel-join semantics a graph needs.

use std::sync::Arc;

use serde_json::Value;
use weft_dsl::{upgrade_v2_to_v3, validate_graph, WorkflowDsl, WorkflowGraph};
use weft_queue::{ClaimedItem, QueueItem, WorkQueue};
use weft_store::{DurableStore, RunStatus, Workflow, WorkflowRun, WorkflowRunEvent};

use crate::config::EngineConfig;
use crate::dispatch::{DispatchResult, GatewayDispatcher};
use crate::error::EngineError;
use crate::interpreter::{ignore_stragglers, join_mode, ready_nodes, skip_branch, JoinMode, ResolvedRemoteResult, RunCursor};
use crate::node::{ExecutionInput, NodeRegistry, NodeResult, ResultEnvelope};

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Idempotency key for a run's queue entry: one live entry per
/// `(run, attempt)`, so a crash-and-requeue of the same attempt never
/// double-enqueues.
pub(crate) fn queue_key(run: &WorkflowRun) -> String {
    format!("run:{}:{}", run.id, run.attempt_count)
}

/// Drives workflow runs to completion against a durable store, a work
/// queue, a node executor registry, and a gateway dispatcher.
pub struct Engine {
    store: Arc<dyn DurableStore>,
    queue: Arc<dyn WorkQueue>,
    gateway: Arc<dyn GatewayDispatcher>,
    registry: NodeRegistry,
    config: EngineConfig,
}

/// What happened to the one run a single [`Engine::step`] call advanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The run finished (successfully or not) or was checkpointed mid-flight;
    /// the queue item was acknowledged.
    Progressed(RunStatus),
    /// A node failed retryably and the run was requeued with backoff.
    Retrying,
}

enum Disposition {
    Ack(RunStatus),
    Retry,
}

impl Engine {
    /// Assemble an engine from its collaborators.
    pub fn new(
        store: Arc<dyn DurableStore>,
        queue: Arc<dyn WorkQueue>,
        gateway: Arc<dyn GatewayDispatcher>,
        registry: NodeRegistry,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            queue,
            gateway,
            registry,
            config,
        }
    }

    /// Persist a freshly created run and enqueue it for a worker to pick up.
    ///
    /// If the enqueue fails, the run is marked `failed` rather than left
    /// sitting in `queued` with nothing that will ever claim it — the
    /// store has no delete for a run, so this is the compensation that
    /// keeps the invariant that a `queued` row always has a live queue
    /// entry behind it.
    pub async fn start_run(&self, run: WorkflowRun) -> Result<(), EngineError> {
        let key = queue_key(&run);
        self.store.create_run(run.clone()).await?;
        if let Err(e) = self.queue.enqueue(QueueItem::new(key, run_payload(&run))).await {
            let mut failed = run;
            failed.status = RunStatus::Failed;
            failed.output = Some(serde_json::json!({ "error": "QUEUE_UNAVAILABLE" }));
            self.store.update_run(failed).await?;
            return Err(e.into());
        }
        Ok(())
    }

    /// Claim and advance one run by one slice. Returns `Ok(None)` if the
    /// queue had nothing ready.
    pub async fn step(&self) -> Result<Option<StepOutcome>, EngineError> {
        let Some(claimed) = self.queue.claim(self.config.claim_visibility_timeout).await? else {
            return Ok(None);
        };
        match self.advance_claim(&claimed).await {
            Ok(Disposition::Ack(status)) => {
                self.queue.ack(&claimed.receipt).await?;
                Ok(Some(StepOutcome::Progressed(status)))
            }
            Ok(Disposition::Retry) => {
                self.queue.nack(&claimed.receipt).await?;
                Ok(Some(StepOutcome::Retrying))
            }
            Err(e) => {
                self.queue.nack(&claimed.receipt).await?;
                Err(e)
            }
        }
    }

    async fn advance_claim(&self, claimed: &ClaimedItem) -> Result<Disposition, EngineError> {
        let (org, run_id) = parse_payload(&claimed.item.payload)?;
        let mut run = self.store.get_run(&org, &run_id).await?;
        if run.status == RunStatus::Blocked {
            tracing::warn!(run = %run_id, "blocked run was on the queue; skipping");
            return Ok(Disposition::Ack(run.status));
        }

        let workflow = self.store.get_workflow(&org, &run.workflow).await?;
        let (graph, order) = graph_for(&workflow)?;
        let mut cursor: RunCursor = serde_json::from_value(run.cursor.clone()).unwrap_or_default();

        run.status = RunStatus::Running;
        self.store.update_run(run.clone()).await?;
        self.store
            .append_run_event(WorkflowRunEvent {
                run: run.id.clone(),
                node: None,
                kind: "run_started".to_string(),
                payload: serde_json::json!({"attemptCount": run.attempt_count}),
                at_ms: now_ms(),
            })
            .await?;

        if let Some(blocked) = cursor.blocked.clone() {
            let Some(resolved) = cursor.resume_result.take() else {
                tracing::warn!(run = %run_id, node = %blocked.node, "resumed run had no resolved result yet");
                return Ok(Disposition::Ack(RunStatus::Blocked));
            };
            let envelope = match resolved {
                ResolvedRemoteResult::Succeeded { output } => ResultEnvelope::Succeeded { output },
                ResolvedRemoteResult::Failed { error } => ResultEnvelope::Failed { error },
            };
            cursor.blocked = None;
            let outcome = self
                .run_node(&org, &run, &graph, &blocked.node, &cursor, Some(envelope))
                .await?;
            if let Some(disposition) = self
                .apply_node_outcome(&org, &mut run, &graph, &mut cursor, &blocked.node, outcome)
                .await?
            {
                return self.finish_slice(&org, &mut run, &cursor, disposition).await;
            }
        }

        loop {
            let ready = ready_nodes(&graph, &order, &cursor);
            if ready.is_empty() {
                break;
            }
            for node_id in ready {
                let outcome = self.run_node(&org, &run, &graph, &node_id, &cursor, None).await?;
                if let Some(disposition) = self
                    .apply_node_outcome(&org, &mut run, &graph, &mut cursor, &node_id, outcome)
                    .await?
                {
                    return self.finish_slice(&org, &mut run, &cursor, disposition).await;
                }
            }
        }

        if cursor.is_complete(&graph) {
            self.finish_slice(&org, &mut run, &cursor, FinalDisposition::Succeeded).await
        } else {
            Err(EngineError::GatewayResponseInvalid(format!(
                "run {run_id} stalled: no ready nodes but graph is not complete"
            )))
        }
    }

    /// Execute one node, checking for (and writing) its exactly-once
    /// checkpoint before falling through to the registered executor.
    async fn run_node(
        &self,
        org: &weft_core::OrgId,
        run: &WorkflowRun,
        graph: &WorkflowGraph,
        node_id: &str,
        cursor: &RunCursor,
        pending_remote_result: Option<ResultEnvelope>,
    ) -> Result<NodeOutcome, EngineError> {
        if pending_remote_result.is_none() {
            if let Some(checkpoint) = self
                .store
                .get_checkpoint(org, &run.id, node_id, run.attempt_count)
                .await?
            {
                return Ok(NodeOutcome::Succeeded(checkpoint.output));
            }
        }

        let node_def = graph
            .nodes
            .get(node_id)
            .ok_or_else(|| EngineError::UnknownNodeKind(node_id.to_string()))?;
        let executor = self
            .registry
            .get(&node_def.kind)
            .ok_or_else(|| EngineError::UnknownNodeKind(node_def.kind.clone()))?;

        self.store
            .append_run_event(WorkflowRunEvent {
                run: run.id.clone(),
                node: Some(node_id.to_string()),
                kind: "node_started".to_string(),
                payload: Value::Null,
                at_ms: now_ms(),
            })
            .await?;

        let steps = predecessor_outputs(graph, node_id, cursor);
        let agent_state = cursor.agent_states.get(node_id).cloned();

        let mut last_error = String::new();
        for attempt in 0..self.config.max_node_attempts {
            let input = ExecutionInput {
                org: org.clone(),
                config: node_def.config.clone(),
                run_input: run.input.clone(),
                steps: steps.clone(),
                pending_remote_result: pending_remote_result.clone(),
                agent_state: agent_state.clone(),
            };
            let timeout = self.config.node_timeout.to_std();
            let result = tokio::time::timeout(timeout, executor.execute(input)).await;
            match result {
                Err(_) => return Err(EngineError::NodeExecutionTimeout(node_id.to_string())),
                Ok(Err(e)) => return Err(e),
                Ok(Ok(NodeResult::Succeeded { output })) => {
                    self.store
                        .put_checkpoint_if_absent(weft_store::NodeCheckpoint {
                            run: run.id.clone(),
                            node: node_id.to_string(),
                            attempt_count: run.attempt_count,
                            output: output.clone(),
                        })
                        .await?;
                    return Ok(NodeOutcome::Succeeded(output));
                }
                Ok(Ok(NodeResult::Blocked {
                    request_id,
                    payload,
                    selector,
                })) => {
                    return Ok(NodeOutcome::Blocked {
                        request_id,
                        payload,
                        selector,
                    })
                }
                Ok(Ok(NodeResult::Failed { error })) => {
                    last_error = error;
                    tracing::warn!(node = %node_id, attempt, error = %last_error, "node attempt failed");
                    if attempt + 1 < self.config.max_node_attempts {
                        let backoff = self.config.node_retry_base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
                        tokio::time::sleep(backoff.to_std()).await;
                    }
                }
            }
        }
        Ok(NodeOutcome::Failed(last_error))
    }

    /// Fold a node's outcome into the cursor. Returns `Some` when this
    /// node's outcome ends the slice (blocked or fatally failed); `None`
    /// means the caller should keep looking for more ready nodes.
    async fn apply_node_outcome(
        &self,
        org: &weft_core::OrgId,
        run: &mut WorkflowRun,
        graph: &WorkflowGraph,
        cursor: &mut RunCursor,
        node_id: &str,
        outcome: NodeOutcome,
    ) -> Result<Option<FinalDisposition>, EngineError> {
        match outcome {
            NodeOutcome::Succeeded(output) => {
                cursor.completed.push(node_id.to_string());
                cursor.node_outputs.insert(node_id.to_string(), output.clone());
                cursor.agent_states.remove(node_id);
                self.store
                    .append_run_event(WorkflowRunEvent {
                        run: run.id.clone(),
                        node: Some(node_id.to_string()),
                        kind: "node_succeeded".to_string(),
                        payload: output.clone(),
                        at_ms: now_ms(),
                    })
                    .await?;

                let node_def = &graph.nodes[node_id];
                if node_def.kind == "condition" {
                    apply_condition_skip(graph, cursor, node_id, &output);
                } else if node_def.kind == "parallel.join" && join_mode(&node_def.config) == JoinMode::Any {
                    ignore_stragglers(graph, cursor, node_id);
                }
                run.cursor = serde_json::to_value(&*cursor).unwrap_or(Value::Null);
                run.updated_at_ms = now_ms();
                self.store.update_run(run.clone()).await?;
                Ok(None)
            }
            NodeOutcome::Blocked {
                request_id,
                payload,
                selector,
            } => {
                let request_id = match request_id {
                    Some(id) => id,
                    None => self.gateway.dispatch(org, payload.clone(), selector.clone()).await?,
                };
                if graph.nodes[node_id].kind == "agent.run" {
                    cursor.agent_states.insert(node_id.to_string(), payload.clone());
                }
                cursor.blocked = Some(crate::interpreter::BlockedNode {
                    node: node_id.to_string(),
                    request_id: Some(request_id.to_string()),
                    payload,
                    selector,
                });
                self.store
                    .append_run_event(WorkflowRunEvent {
                        run: run.id.clone(),
                        node: Some(node_id.to_string()),
                        kind: "run_blocked".to_string(),
                        payload: Value::Null,
                        at_ms: now_ms(),
                    })
                    .await?;
                Ok(Some(FinalDisposition::Blocked))
            }
            NodeOutcome::Failed(error) => {
                self.store
                    .append_run_event(WorkflowRunEvent {
                        run: run.id.clone(),
                        node: Some(node_id.to_string()),
                        kind: "node_failed".to_string(),
                        payload: Value::String(error.clone()),
                        at_ms: now_ms(),
                    })
                    .await?;
                Ok(Some(FinalDisposition::Failed(error)))
            }
        }
    }

    async fn finish_slice(
        &self,
        org: &weft_core::OrgId,
        run: &mut WorkflowRun,
        cursor: &RunCursor,
        disposition: FinalDisposition,
    ) -> Result<Disposition, EngineError> {
        run.cursor = serde_json::to_value(cursor).unwrap_or(Value::Null);
        run.updated_at_ms = now_ms();
        match disposition {
            FinalDisposition::Succeeded => {
                run.status = RunStatus::Succeeded;
                run.output = Some(final_output(cursor));
                self.store.update_run(run.clone()).await?;
                self.store
                    .append_run_event(WorkflowRunEvent {
                        run: run.id.clone(),
                        node: None,
                        kind: "run_succeeded".to_string(),
                        payload: run.output.clone().unwrap_or(Value::Null),
                        at_ms: now_ms(),
                    })
                    .await?;
                Ok(Disposition::Ack(RunStatus::Succeeded))
            }
            FinalDisposition::Blocked => {
                run.status = RunStatus::Blocked;
                self.store.update_run(run.clone()).await?;
                let _ = org;
                Ok(Disposition::Ack(RunStatus::Blocked))
            }
            FinalDisposition::Failed(error) => {
                if run.attempt_count < self.config.max_run_attempts {
                    run.attempt_count += 1;
                    run.status = RunStatus::QueuedForRetry;
                    self.store.update_run(run.clone()).await?;
                    self.store
                        .append_run_event(WorkflowRunEvent {
                            run: run.id.clone(),
                            node: None,
                            kind: "run_retried".to_string(),
                            payload: Value::String(error),
                            at_ms: now_ms(),
                        })
                        .await?;
                    Ok(Disposition::Retry)
                } else {
                    run.status = RunStatus::Failed;
                    run.output = Some(Value::String(error.clone()));
                    self.store.update_run(run.clone()).await?;
                    self.store
                        .append_run_event(WorkflowRunEvent {
                            run: run.id.clone(),
                            node: None,
                            kind: "run_failed".to_string(),
                            payload: Value::String(error),
                            at_ms: now_ms(),
                        })
                        .await?;
                    Ok(Disposition::Ack(RunStatus::Failed))
                }
            }
        }
    }
}

enum NodeOutcome {
    Succeeded(Value),
    Blocked {
        request_id: Option<weft_core::RequestId>,
        payload: Value,
        selector: Option<Value>,
    },
    Failed(String),
}

/// What a slice's last node outcome implies for the run as a whole.
/// `Failed` isn't necessarily terminal: `finish_slice` turns it into either
/// a backed-off retry or a hard failure depending on the run's remaining
/// attempt budget.
enum FinalDisposition {
    Succeeded,
    Blocked,
    Failed(String),
}

fn apply_condition_skip(graph: &WorkflowGraph, cursor: &mut RunCursor, node_id: &str, output: &Value) {
    let branch_true = output.get("branch").and_then(Value::as_str) == Some("cond_true");
    let skip_label = if branch_true {
        weft_dsl::EdgeLabel::CondFalse
    } else {
        weft_dsl::EdgeLabel::CondTrue
    };
    let targets: Vec<String> = graph
        .edges
        .iter()
        .filter(|e| e.from == node_id && e.label == skip_label)
        .map(|e| e.to.clone())
        .collect();
    for target in targets {
        skip_branch(graph, cursor, &target);
    }
}

fn predecessor_outputs(graph: &WorkflowGraph, node_id: &str, cursor: &RunCursor) -> Vec<Value> {
    graph
        .edges
        .iter()
        .filter(|e| e.to == node_id)
        .filter_map(|e| cursor.node_outputs.get(&e.from).cloned())
        .collect()
}

fn final_output(cursor: &RunCursor) -> Value {
    cursor
        .completed
        .last()
        .and_then(|id| cursor.node_outputs.get(id))
        .cloned()
        .unwrap_or(Value::Null)
}

pub(crate) fn run_payload(run: &WorkflowRun) -> Value {
    serde_json::json!({ "org": run.org, "run": run.id })
}

fn parse_payload(payload: &Value) -> Result<(weft_core::OrgId, weft_core::RunId), EngineError> {
    #[derive(serde::Deserialize)]
    struct Payload {
        org: weft_core::OrgId,
        run: weft_core::RunId,
    }
    let parsed: Payload = serde_json::from_value(payload.clone())
        .map_err(|e| EngineError::GatewayResponseInvalid(format!("bad queue payload: {e}")))?;
    Ok((parsed.org, parsed.run))
}

/// Resolve a workflow's published DSL into the v3 graph shape the
/// interpreter evaluates, plus its topological execution order.
pub fn graph_for(workflow: &Workflow) -> Result<(WorkflowGraph, Vec<String>), EngineError> {
    let graph = match &workflow.dsl {
        WorkflowDsl::V3(graph) => graph.clone(),
        WorkflowDsl::V2(nodes) => upgrade_v2_to_v3(nodes.clone()),
    };
    let order = validate_graph(&graph)?;
    Ok((graph, order))
}

/// Convert a [`DispatchResult`] into the envelope stored on a run's cursor
/// once the continuation poller observes it.
pub fn resolved_from_dispatch(result: DispatchResult) -> ResolvedRemoteResult {
    match result {
        DispatchResult::Succeeded { output } => ResolvedRemoteResult::Succeeded { output },
        DispatchResult::Failed { error } => ResolvedRemoteResult::Failed { error },
    }
}
