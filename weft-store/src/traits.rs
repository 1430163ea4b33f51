//! The storage boundary every durable backend implements.

use crate::error::StoreError;
use crate::model::{
    AgentSession, Membership, NodeCheckpoint, Organization, RunStatus, Secret, TriggerSubscription,
    Workflow, WorkflowRun, WorkflowRunEvent,
};
use async_trait::async_trait;
use weft_core::{OrgId, RunId, SessionId, SubscriptionId, WorkflowId};

/// Org-scoped durable storage for every entity in the data model.
///
/// Every method that reads or writes tenant data takes `org: &OrgId` as its
/// first argument, even where a backend could technically look a row up by
/// its own ID alone — this keeps the tenant boundary visible and makes a
/// cross-tenant row leak a type error at the call site, not a runtime bug.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Create an org. Errors with [`StoreError::Conflict`] if the ID is
    /// already taken.
    async fn create_organization(&self, org: Organization) -> Result<(), StoreError>;

    /// Fetch an org by ID.
    async fn get_organization(&self, id: &OrgId) -> Result<Organization, StoreError>;

    /// Upsert a membership.
    async fn put_membership(&self, membership: Membership) -> Result<(), StoreError>;

    /// List all memberships for an org.
    async fn list_memberships(&self, org: &OrgId) -> Result<Vec<Membership>, StoreError>;

    /// Upsert a secret. Overwrites any existing secret with the same name
    /// in this org.
    async fn put_secret(&self, org: &OrgId, secret: Secret) -> Result<(), StoreError>;

    /// Fetch a secret by name.
    async fn get_secret(&self, org: &OrgId, name: &str) -> Result<Secret, StoreError>;

    /// Delete a secret by name. Not an error if it didn't exist.
    async fn delete_secret(&self, org: &OrgId, name: &str) -> Result<(), StoreError>;

    /// Publish a new workflow version, or the first version if none exists.
    async fn put_workflow(&self, workflow: Workflow) -> Result<(), StoreError>;

    /// Fetch the latest version of a workflow.
    async fn get_workflow(&self, org: &OrgId, id: &WorkflowId) -> Result<Workflow, StoreError>;

    /// Create a new run. Errors with [`StoreError::Conflict`] if the run ID
    /// already exists.
    async fn create_run(&self, run: WorkflowRun) -> Result<(), StoreError>;

    /// Fetch a run by ID.
    async fn get_run(&self, org: &OrgId, id: &RunId) -> Result<WorkflowRun, StoreError>;

    /// Replace a run's stored state (status, cursor, attempt count, ...).
    async fn update_run(&self, run: WorkflowRun) -> Result<(), StoreError>;

    /// List runs in a given status, used by the retry poller and the run
    /// continuation path to find work without an external queue.
    async fn list_runs_by_status(
        &self,
        org: &OrgId,
        status: RunStatus,
    ) -> Result<Vec<WorkflowRun>, StoreError>;

    /// Append an event to a run's timeline.
    async fn append_run_event(&self, event: WorkflowRunEvent) -> Result<(), StoreError>;

    /// List a run's timeline in append order.
    async fn list_run_events(
        &self,
        org: &OrgId,
        run: &RunId,
    ) -> Result<Vec<WorkflowRunEvent>, StoreError>;

    /// Record a node checkpoint. If a checkpoint already exists for this
    /// exact `(run, node, attempt_count)`, the existing one is returned
    /// instead of being overwritten — this is the exactly-once guarantee:
    /// callers that crashed after checkpointing but before acknowledging
    /// will see their own prior checkpoint on retry rather than re-running
    /// the node's effect.
    async fn put_checkpoint_if_absent(
        &self,
        checkpoint: NodeCheckpoint,
    ) -> Result<NodeCheckpoint, StoreError>;

    /// Fetch a node checkpoint, if one exists.
    async fn get_checkpoint(
        &self,
        org: &OrgId,
        run: &RunId,
        node: &str,
        attempt_count: u32,
    ) -> Result<Option<NodeCheckpoint>, StoreError>;

    /// Claim a trigger subscription's firing slot. Errors with
    /// [`StoreError::Conflict`] if `(org, workflow, trigger_key)` has
    /// already been claimed — this is the at-most-once enforcement point
    /// for the scheduler.
    async fn claim_trigger_firing(
        &self,
        subscription: TriggerSubscription,
    ) -> Result<(), StoreError>;

    /// List active trigger subscriptions for an org (distinct
    /// subscriptions, not individual firing claims).
    async fn list_active_subscriptions(
        &self,
        org: &OrgId,
    ) -> Result<Vec<TriggerSubscription>, StoreError>;

    /// Upsert a subscription's configuration (distinct from
    /// [`claim_trigger_firing`](Self::claim_trigger_firing), which records
    /// one occurrence).
    async fn put_subscription(&self, subscription: TriggerSubscription) -> Result<(), StoreError>;

    /// Fetch a subscription by ID.
    async fn get_subscription(
        &self,
        org: &OrgId,
        id: &SubscriptionId,
    ) -> Result<TriggerSubscription, StoreError>;

    /// Upsert an agent session.
    async fn put_agent_session(&self, session: AgentSession) -> Result<(), StoreError>;

    /// Fetch an agent session by ID.
    async fn get_agent_session(
        &self,
        org: &OrgId,
        id: &SessionId,
    ) -> Result<AgentSession, StoreError>;
}
