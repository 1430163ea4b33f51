//! End-to-end coverage across `weft-engine`, `weft-gateway`, and
//! `weft-scheduler`: one test per workflow-run scenario a deployment
//! actually hits in production, built on the in-memory store, queue, and
//! transport each crate ships for exactly this purpose.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::{json, Value};

use weft_core::{ErrorCode, ExecutorId, OrgId, RequestId, RunId, SubscriptionId, WorkflowId};
use weft_dsl::{Edge, EdgeLabel, NodeDefinition, WorkflowDsl, WorkflowGraph, WorkflowNodesV2};
use weft_engine::node::{ConditionExecutor, ConnectorActionExecutor, NodeExecutor, ParallelJoinExecutor};
use weft_engine::{
    ContinuationPoller, DispatchResult, Engine, EngineConfig, EngineError, ExecutionInput, GatewayDispatcher,
    NodeRegistry, NodeResult, RunCursor, StepOutcome,
};
use weft_gateway::{ExecutorRoute, Gateway, GatewayConfig, LocalTransport, Pool};
use weft_queue::{ClaimedItem, MemoryWorkQueue, QueueConfig, QueueError, QueueItem, ReceiptId, WorkQueue};
use weft_scheduler::TriggerPoller;
use weft_store::{MemoryStore, RunStatus, TriggerKind, TriggerSubscription, Workflow, WorkflowRun};

fn node(id: &str, kind: &str, config: Value) -> NodeDefinition {
    NodeDefinition {
        id: id.to_string(),
        kind: kind.to_string(),
        config,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario 1 — a cron trigger fires at most once per slot
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn cron_trigger_fires_at_most_once_per_slot() {
    let org = OrgId::new("org_1");
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryWorkQueue::new(QueueConfig::default()));

    store
        .put_workflow(Workflow {
            id: WorkflowId::new("wf_1"),
            org: org.clone(),
            name: "cron demo".to_string(),
            dsl_version: 1,
            dsl: WorkflowDsl::V2(WorkflowNodesV2 { nodes: vec![] }),
            is_active: true,
        })
        .await
        .unwrap();

    // Walk "now" back to the most recent 10-minute cron boundary. Seeding
    // last_fired_at_ms one millisecond before that boundary makes the very
    // next `schedule.after` occurrence land exactly on it (due); the slot
    // after that is at least several minutes out, safely beyond any
    // plausible test runtime.
    let period_min: u64 = 10;
    let now_ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64;
    let now_min = now_ms / 60_000;
    let boundary_min = (now_min / period_min) * period_min;
    let boundary_ms = boundary_min * 60_000;

    let sub = TriggerSubscription {
        id: SubscriptionId::new("sub_1"),
        org: org.clone(),
        workflow: WorkflowId::new("wf_1"),
        trigger_key: String::new(),
        kind: TriggerKind::Cron { expression: "*/10 * * * *".to_string() },
        enabled: true,
        last_fired_at_ms: Some(boundary_ms - 1),
    };
    store.put_subscription(sub.clone()).await.unwrap();

    let poller = TriggerPoller::new(store.clone(), queue.clone());
    let fired_first = poller.tick(&org).await.unwrap();
    assert_eq!(fired_first, 1, "the slot just before boundary_ms should be due");

    let fired_second = poller.tick(&org).await.unwrap();
    assert_eq!(fired_second, 0, "the same slot must never fire twice");

    let updated = store.get_subscription(&org, &sub.id).await.unwrap();
    assert_eq!(updated.last_fired_at_ms, Some(boundary_ms));

    // Exactly one run landed on the queue.
    let claimed = queue.claim(weft_core::DurationMs::from_secs(30)).await.unwrap();
    assert!(claimed.is_some());
    assert!(queue.claim(weft_core::DurationMs::from_secs(30)).await.unwrap().is_none());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario 2 — a failed node retries the whole run, then succeeds
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct NoopGateway;

#[async_trait]
impl GatewayDispatcher for NoopGateway {
    async fn dispatch(&self, _org: &OrgId, _payload: Value, _selector: Option<Value>) -> Result<RequestId, EngineError> {
        Ok(RequestId::new("req_unused"))
    }

    async fn poll_result(&self, _org: &OrgId, _request_id: &RequestId) -> Result<Option<DispatchResult>, EngineError> {
        Ok(None)
    }
}

/// Fails once with `"boom"`, then succeeds on every subsequent call.
struct FlakyOnceExecutor {
    calls: AtomicUsize,
}

impl FlakyOnceExecutor {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl NodeExecutor for FlakyOnceExecutor {
    async fn execute(&self, _input: ExecutionInput) -> Result<NodeResult, EngineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            Ok(NodeResult::Failed { error: "boom".to_string() })
        } else {
            Ok(NodeResult::Succeeded { output: json!({"attempt": call}) })
        }
    }
}

fn single_node_graph(kind: &str) -> WorkflowGraph {
    let mut nodes = HashMap::new();
    nodes.insert("n1".to_string(), node("n1", kind, json!({})));
    WorkflowGraph { nodes, edges: vec![] }
}

async fn run_events(store: &MemoryStore, org: &OrgId, run: &RunId) -> Vec<String> {
    store
        .list_run_events(org, run)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.kind)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn a_node_failure_retries_the_whole_run_then_succeeds() {
    let org = OrgId::new("org_1");
    let store = Arc::new(MemoryStore::new());
    // A short, deterministic backoff so advancing the paused clock past it
    // is fast and exact.
    let queue = Arc::new(MemoryWorkQueue::new(QueueConfig {
        max_attempts: 5,
        base_backoff: weft_core::DurationMs::from_millis(10),
        max_backoff: weft_core::DurationMs::from_millis(50),
    }));

    store
        .put_workflow(Workflow {
            id: WorkflowId::new("wf_1"),
            org: org.clone(),
            name: "retry demo".to_string(),
            dsl_version: 1,
            dsl: WorkflowDsl::V3(single_node_graph("flaky.op")),
            is_active: true,
        })
        .await
        .unwrap();

    let mut registry = NodeRegistry::new();
    registry.register("flaky.op", Arc::new(FlakyOnceExecutor::new()));

    // max_node_attempts=1 so the node's very first failure immediately
    // exhausts its in-process budget and falls straight to a whole-run
    // retry; max_run_attempts=3 leaves plenty of room for the one retry
    // this scenario needs.
    let config = EngineConfig {
        max_node_attempts: 1,
        max_run_attempts: 3,
        ..EngineConfig::default()
    };
    let engine = Engine::new(store.clone(), queue.clone(), Arc::new(NoopGateway), registry, config);

    let run_id = RunId::new("run_1");
    let run = WorkflowRun {
        id: run_id.clone(),
        org: org.clone(),
        workflow: WorkflowId::new("wf_1"),
        dsl_version: 1,
        status: RunStatus::Queued,
        attempt_count: 1,
        input: Value::Null,
        cursor: Value::Null,
        output: None,
        created_at_ms: 0,
        updated_at_ms: 0,
    };
    engine.start_run(run).await.unwrap();

    let first = engine.step().await.unwrap().unwrap();
    assert_eq!(first, StepOutcome::Retrying);
    assert_eq!(
        run_events(&store, &org, &run_id).await,
        vec!["run_started", "node_started", "node_failed", "run_retried"]
    );
    let mid = store.get_run(&org, &run_id).await.unwrap();
    assert_eq!(mid.status, RunStatus::QueuedForRetry);
    assert_eq!(mid.attempt_count, 2);

    // The requeued item is invisible until its backoff elapses.
    assert!(engine.step().await.unwrap().is_none());
    tokio::time::advance(Duration::from_millis(60)).await;

    let second = engine.step().await.unwrap().unwrap();
    assert_eq!(second, StepOutcome::Progressed(RunStatus::Succeeded));
    assert_eq!(
        run_events(&store, &org, &run_id).await,
        vec![
            "run_started",
            "node_started",
            "node_failed",
            "run_retried",
            "run_started",
            "node_started",
            "node_succeeded",
            "run_succeeded",
        ]
    );
    let done = store.get_run(&org, &run_id).await.unwrap();
    assert_eq!(done.status, RunStatus::Succeeded);
    assert_eq!(done.attempt_count, 2);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario 3 — a blocked node resumes once the gateway has a result
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn a_blocked_node_resumes_once_its_dispatch_result_arrives() {
    let org = OrgId::new("org_1");
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryWorkQueue::new(QueueConfig::default()));

    let transport = Arc::new(LocalTransport::new());
    let gateway = Arc::new(Gateway::new(transport, GatewayConfig::default()));
    gateway
        .register_executor(ExecutorRoute::new(ExecutorId::new("exec_1"), org.clone(), Pool::Managed, 5, 0))
        .await;

    let mut nodes = HashMap::new();
    nodes.insert(
        "n1".to_string(),
        node(
            "n1",
            "connector.action",
            json!({
                "connectorId": "github",
                "actionId": "create_issue",
                "input": {"title": "hello"},
                "execution": {"mode": "node"},
            }),
        ),
    );
    let graph = WorkflowGraph { nodes, edges: vec![] };

    store
        .put_workflow(Workflow {
            id: WorkflowId::new("wf_1"),
            org: org.clone(),
            name: "block and resume demo".to_string(),
            dsl_version: 1,
            dsl: WorkflowDsl::V3(graph),
            is_active: true,
        })
        .await
        .unwrap();

    let mut registry = NodeRegistry::new();
    registry.register("connector.action", Arc::new(ConnectorActionExecutor));

    let gateway_dispatcher: Arc<dyn GatewayDispatcher> = gateway.clone();
    let engine = Engine::new(store.clone(), queue.clone(), gateway_dispatcher.clone(), registry, EngineConfig::default());
    let continuation = ContinuationPoller::new(store.clone(), queue.clone(), gateway_dispatcher);

    let run_id = RunId::new("run_1");
    let run = WorkflowRun {
        id: run_id.clone(),
        org: org.clone(),
        workflow: WorkflowId::new("wf_1"),
        dsl_version: 1,
        status: RunStatus::Queued,
        attempt_count: 1,
        input: Value::Null,
        cursor: Value::Null,
        output: None,
        created_at_ms: 0,
        updated_at_ms: 0,
    };
    engine.start_run(run).await.unwrap();

    let outcome = engine.step().await.unwrap().unwrap();
    assert_eq!(outcome, StepOutcome::Progressed(RunStatus::Blocked));
    let blocked = store.get_run(&org, &run_id).await.unwrap();
    assert_eq!(blocked.status, RunStatus::Blocked);

    let cursor: RunCursor = serde_json::from_value(blocked.cursor.clone()).unwrap();
    let blocked_node = cursor.blocked.expect("run should record its blocked node");
    let request_id = RequestId::new(blocked_node.request_id.expect("gateway dispatch should have assigned a request id"));

    gateway
        .post_result(request_id, DispatchResult::Succeeded { output: json!({"issueNumber": 42}) })
        .await;

    let resumed = continuation.poll_once(&org).await.unwrap();
    assert_eq!(resumed, 1);

    let outcome = engine.step().await.unwrap().unwrap();
    assert_eq!(outcome, StepOutcome::Progressed(RunStatus::Succeeded));
    let done = store.get_run(&org, &run_id).await.unwrap();
    assert_eq!(done.status, RunStatus::Succeeded);
    assert_eq!(done.output, Some(json!({"issueNumber": 42})));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario 4 — a parallel join waits for every branch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A trivial pass-through executor for graph-shape tests that don't care
/// about any particular node's effect, only the order nodes run in.
struct EchoExecutor;

#[async_trait]
impl NodeExecutor for EchoExecutor {
    async fn execute(&self, input: ExecutionInput) -> Result<NodeResult, EngineError> {
        Ok(NodeResult::Succeeded { output: json!({"steps": input.steps}) })
    }
}

#[tokio::test]
async fn a_parallel_join_waits_for_both_branches_before_continuing() {
    let org = OrgId::new("org_1");
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryWorkQueue::new(QueueConfig::default()));

    let mut nodes = HashMap::new();
    nodes.insert("a".to_string(), node("a", "echo", json!({})));
    nodes.insert("b".to_string(), node("b", "echo", json!({})));
    nodes.insert("join".to_string(), node("join", "parallel.join", json!({"mode": "all"})));
    nodes.insert("end".to_string(), node("end", "echo", json!({})));
    let graph = WorkflowGraph {
        nodes,
        edges: vec![
            Edge::plain("a", "join"),
            Edge::plain("b", "join"),
            Edge::plain("join", "end"),
        ],
    };

    store
        .put_workflow(Workflow {
            id: WorkflowId::new("wf_1"),
            org: org.clone(),
            name: "join demo".to_string(),
            dsl_version: 1,
            dsl: WorkflowDsl::V3(graph),
            is_active: true,
        })
        .await
        .unwrap();

    let mut registry = NodeRegistry::new();
    registry.register("echo", Arc::new(EchoExecutor));
    registry.register("parallel.join", Arc::new(ParallelJoinExecutor));

    let engine = Engine::new(store.clone(), queue.clone(), Arc::new(NoopGateway), registry, EngineConfig::default());

    let run_id = RunId::new("run_1");
    let run = WorkflowRun {
        id: run_id.clone(),
        org: org.clone(),
        workflow: WorkflowId::new("wf_1"),
        dsl_version: 1,
        status: RunStatus::Queued,
        attempt_count: 1,
        input: Value::Null,
        cursor: Value::Null,
        output: None,
        created_at_ms: 0,
        updated_at_ms: 0,
    };
    engine.start_run(run).await.unwrap();

    // The frontier walk inside one `step()` keeps consuming newly ready
    // nodes without returning to the queue, so this whole four-node graph
    // completes in a single claim.
    let outcome = engine.step().await.unwrap().unwrap();
    assert_eq!(outcome, StepOutcome::Progressed(RunStatus::Succeeded));

    let done = store.get_run(&org, &run_id).await.unwrap();
    let cursor: RunCursor = serde_json::from_value(done.cursor).unwrap();
    for expected in ["a", "b", "join", "end"] {
        assert!(cursor.completed.iter().any(|c| c == expected), "{expected} should have completed");
    }
    let pos = |id: &str| cursor.completed.iter().position(|c| c == id).unwrap();
    assert!(pos("join") > pos("a"));
    assert!(pos("join") > pos("b"));
    assert!(pos("end") > pos("join"));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario 5 — a condition node skips its untaken branch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn a_condition_node_skips_the_branch_it_does_not_take() {
    let org = OrgId::new("org_1");
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryWorkQueue::new(QueueConfig::default()));

    let mut nodes = HashMap::new();
    nodes.insert("c".to_string(), node("c", "condition", json!({"path": "flag", "op": "eq", "value": true})));
    nodes.insert("yes".to_string(), node("yes", "echo", json!({})));
    nodes.insert("no".to_string(), node("no", "echo", json!({})));
    let graph = WorkflowGraph {
        nodes,
        edges: vec![
            Edge { from: "c".to_string(), to: "yes".to_string(), label: EdgeLabel::CondTrue },
            Edge { from: "c".to_string(), to: "no".to_string(), label: EdgeLabel::CondFalse },
        ],
    };

    store
        .put_workflow(Workflow {
            id: WorkflowId::new("wf_1"),
            org: org.clone(),
            name: "condition demo".to_string(),
            dsl_version: 1,
            dsl: WorkflowDsl::V3(graph),
            is_active: true,
        })
        .await
        .unwrap();

    let mut registry = NodeRegistry::new();
    registry.register("condition", Arc::new(ConditionExecutor));
    registry.register("echo", Arc::new(EchoExecutor));

    let engine = Engine::new(store.clone(), queue.clone(), Arc::new(NoopGateway), registry, EngineConfig::default());

    let run_id = RunId::new("run_1");
    let run = WorkflowRun {
        id: run_id.clone(),
        org: org.clone(),
        workflow: WorkflowId::new("wf_1"),
        dsl_version: 1,
        status: RunStatus::Queued,
        attempt_count: 1,
        input: json!({"flag": true}),
        cursor: Value::Null,
        output: None,
        created_at_ms: 0,
        updated_at_ms: 0,
    };
    engine.start_run(run).await.unwrap();

    let outcome = engine.step().await.unwrap().unwrap();
    assert_eq!(outcome, StepOutcome::Progressed(RunStatus::Succeeded));

    let done = store.get_run(&org, &run_id).await.unwrap();
    let cursor: RunCursor = serde_json::from_value(done.cursor).unwrap();
    assert!(cursor.completed.iter().any(|c| c == "yes"));
    assert!(!cursor.completed.iter().any(|c| c == "no"));
    assert!(cursor.skipped.contains("no"));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenario 6 — starting a run when the queue is unavailable fails closed
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A queue whose `enqueue` always reports the backend as unavailable, the
/// same shape a Redis/SQS outage would surface through a real `WorkQueue`.
struct FailingQueue;

#[async_trait]
impl WorkQueue for FailingQueue {
    async fn enqueue(&self, _item: QueueItem) -> Result<(), QueueError> {
        Err(QueueError::Unavailable("backend unreachable".to_string()))
    }

    async fn claim(&self, _visibility_timeout: weft_core::DurationMs) -> Result<Option<ClaimedItem>, QueueError> {
        unimplemented!("not exercised by start_run")
    }

    async fn ack(&self, _receipt: &ReceiptId) -> Result<(), QueueError> {
        unimplemented!("not exercised by start_run")
    }

    async fn nack(&self, _receipt: &ReceiptId) -> Result<(), QueueError> {
        unimplemented!("not exercised by start_run")
    }

    async fn dead_letters(&self) -> Result<Vec<QueueItem>, QueueError> {
        unimplemented!("not exercised by start_run")
    }
}

#[tokio::test]
async fn starting_a_run_fails_closed_when_the_queue_is_unavailable() {
    let org = OrgId::new("org_1");
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(FailingQueue);
    let engine = Engine::new(store.clone(), queue, Arc::new(NoopGateway), NodeRegistry::new(), EngineConfig::default());

    let run_id = RunId::new("run_1");
    let run = WorkflowRun {
        id: run_id.clone(),
        org: org.clone(),
        workflow: WorkflowId::new("wf_1"),
        dsl_version: 1,
        status: RunStatus::Queued,
        attempt_count: 1,
        input: Value::Null,
        cursor: Value::Null,
        output: None,
        created_at_ms: 0,
        updated_at_ms: 0,
    };
    let err = engine.start_run(run).await.unwrap_err();
    assert_eq!(err.code(), "QUEUE_UNAVAILABLE");

    // No durable row is left sitting in `queued` with nothing that will
    // ever claim it.
    let stored = store.get_run(&org, &run_id).await.unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
}
