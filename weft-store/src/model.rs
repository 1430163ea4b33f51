//! Entities persisted by a [`DurableStore`](crate::traits::DurableStore).
//!
//! Every entity that belongs to a tenant carries an explicit `org: OrgId`
//! field, and every store method that touches one takes the org as its
//! first argument. There is no generic `Scope` key here — row-level
//! isolation is a field on the row, not a string prefix.

use serde::{Deserialize, Serialize};
use weft_core::{OrgId, RunId, SessionId, SubscriptionId, UserId, WorkflowId};
use weft_dsl::WorkflowDsl;
use weft_secret::EncryptedSecretRecord;

/// A tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier.
    pub id: OrgId,
    /// Display name.
    pub name: String,
    /// Creation timestamp, milliseconds since epoch.
    pub created_at_ms: u64,
}

/// A user's role within an org.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full administrative control, including membership and billing.
    Owner,
    /// Can manage workflows, secrets, and triggers, but not membership.
    Admin,
    /// Can view and run workflows, not edit them.
    Member,
}

/// A user's membership in an org.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// The org this membership belongs to.
    pub org: OrgId,
    /// The user.
    pub user: UserId,
    /// Their role within the org.
    pub role: Role,
}

/// An encrypted secret plus the metadata a store needs to look it up by name.
///
/// Wraps [`EncryptedSecretRecord`] (the ciphertext shape from `weft-secret`)
/// without adding fields of its own; kept as a distinct type so callers
/// import `weft_store::Secret` rather than reaching into `weft-secret`
/// directly for the storage-facing type.
pub type Secret = EncryptedSecretRecord;

/// A stored workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier.
    pub id: WorkflowId,
    /// Owning org.
    pub org: OrgId,
    /// Display name.
    pub name: String,
    /// Monotonically increasing version; each publish creates a new version.
    pub dsl_version: u32,
    /// The graph or linear DSL for this version.
    pub dsl: WorkflowDsl,
    /// Whether this workflow can currently be triggered.
    pub is_active: bool,
}

/// The lifecycle state of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Waiting to be picked up by a worker.
    Queued,
    /// Currently being interpreted.
    Running,
    /// Finished, every node either completed or was skipped by a condition.
    Succeeded,
    /// Finished with an unrecoverable node failure.
    Failed,
    /// Paused pending an external event (e.g. a remote tool result, a
    /// delegated agent run) that will resume the run via `weft-engine`'s
    /// run-continuation path.
    Blocked,
    /// A node failed retryably; the run will be re-enqueued after backoff.
    QueuedForRetry,
}

/// A workflow run.
///
/// `cursor` is an opaque, engine-owned blob: for a v2 run it's a node
/// index, for a v3 run it's the serialized execution frontier. The store
/// persists it as `serde_json::Value` and never interprets it, so the
/// engine's cursor shape can evolve without a store migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Unique identifier.
    pub id: RunId,
    /// Owning org.
    pub org: OrgId,
    /// The workflow this run executes.
    pub workflow: WorkflowId,
    /// Which published version of the workflow this run is pinned to.
    pub dsl_version: u32,
    /// Current lifecycle state.
    pub status: RunStatus,
    /// How many times this run has been attempted (starts at 1).
    pub attempt_count: u32,
    /// Trigger input, or the manual invocation payload.
    pub input: serde_json::Value,
    /// Engine-owned execution cursor/frontier.
    pub cursor: serde_json::Value,
    /// Final output, set once `status` is terminal.
    pub output: Option<serde_json::Value>,
    /// Creation timestamp, milliseconds since epoch.
    pub created_at_ms: u64,
    /// Last-updated timestamp, milliseconds since epoch.
    pub updated_at_ms: u64,
}

/// An append-only event on a run's timeline (node started, node completed,
/// retry scheduled, run blocked, run resumed, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunEvent {
    /// The run this event belongs to.
    pub run: RunId,
    /// The node this event concerns, if any.
    pub node: Option<String>,
    /// Event kind, e.g. `"node_succeeded"`, `"run_blocked"`.
    pub kind: String,
    /// Event-specific payload.
    pub payload: serde_json::Value,
    /// Timestamp, milliseconds since epoch.
    pub at_ms: u64,
}

/// A checkpoint recording that one node attempt has already produced its
/// effect, keyed by `(run, node, attempt_count)`.
///
/// The engine writes this *before* acknowledging the node's effect as
/// durable, and consults it before re-running a node after a crash or
/// retry — this is what makes node effects exactly-once rather than
/// at-least-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCheckpoint {
    /// The run this checkpoint belongs to.
    pub run: RunId,
    /// The node this checkpoint belongs to.
    pub node: String,
    /// Which attempt of the run produced this checkpoint.
    pub attempt_count: u32,
    /// The node's recorded output.
    pub output: serde_json::Value,
}

/// What kind of event a [`TriggerSubscription`] fires on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerKind {
    /// Fires on a POSIX cron schedule.
    Cron {
        /// Five-field cron expression.
        expression: String,
    },
    /// Fires on a periodic heartbeat, with catch-up tolerance.
    Heartbeat {
        /// Nominal interval between fires, in milliseconds.
        interval_ms: u64,
        /// Maximum allowed clock skew before a scheduled fire is
        /// considered missed rather than late, in milliseconds.
        max_skew_ms: u64,
    },
}

/// A subscription binding a workflow to a trigger.
///
/// `trigger_key` plus `(org, workflow)` is unique per fire: the scheduler
/// enforces at-most-once delivery through the store's unique-constraint
/// check on `(org, workflow, trigger_key)`, not through in-memory
/// deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSubscription {
    /// Unique identifier.
    pub id: SubscriptionId,
    /// Owning org.
    pub org: OrgId,
    /// The workflow this subscription triggers.
    pub workflow: WorkflowId,
    /// Identifies a single scheduled occurrence, e.g. the cron-computed
    /// fire timestamp formatted as RFC 3339.
    pub trigger_key: String,
    /// Cron or heartbeat configuration.
    pub kind: TriggerKind,
    /// Whether this subscription is currently armed.
    pub enabled: bool,
    /// When this subscription last fired, milliseconds since epoch.
    pub last_fired_at_ms: Option<u64>,
}

/// The lifecycle state of an agent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The agent loop is actively running or between resumable turns.
    Active,
    /// Waiting on a pending tool call or remote result.
    Suspended,
    /// Finished with a final answer.
    Completed,
    /// Finished because a bound (turns, cost, time) was hit.
    Exhausted,
    /// Finished with an unrecoverable error.
    Failed,
}

/// An agent session record.
///
/// `run_state` is an opaque JSON blob owned by `weft-agent`'s
/// `AgentRunState`; the store persists and returns it without
/// interpreting it, the same way `WorkflowRun::cursor` works for the
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSession {
    /// Unique identifier.
    pub id: SessionId,
    /// Owning org.
    pub org: OrgId,
    /// The run this session was spawned from, if it was started by an
    /// `agent.execute` node rather than directly.
    pub run: Option<RunId>,
    /// Current lifecycle state.
    pub status: SessionStatus,
    /// Opaque, agent-crate-owned checkpoint state.
    pub run_state: serde_json::Value,
    /// Creation timestamp, milliseconds since epoch.
    pub created_at_ms: u64,
    /// Last-updated timestamp, milliseconds since epoch.
    pub updated_at_ms: u64,
}
