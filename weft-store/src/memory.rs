//! In-memory [`DurableStore`], backed by `RwLock<HashMap<..>>` tables.
//!
//! Suitable for tests and single-process deployments. Nothing here
//! persists across restarts; a production deployment swaps this for a
//! SQL- or KV-backed implementation of the same trait.

use crate::error::StoreError;
use crate::model::{
    AgentSession, Membership, NodeCheckpoint, Organization, RunStatus, Secret, TriggerSubscription,
    Workflow, WorkflowRun, WorkflowRunEvent,
};
use crate::traits::DurableStore;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use weft_core::{OrgId, RunId, SessionId, SubscriptionId, WorkflowId};

type OrgKey = (String, String);

/// In-memory store, one `RwLock<HashMap<..>>` table per entity kind.
#[derive(Default)]
pub struct MemoryStore {
    organizations: RwLock<HashMap<String, Organization>>,
    memberships: RwLock<HashMap<String, Vec<Membership>>>,
    secrets: RwLock<HashMap<OrgKey, Secret>>,
    workflows: RwLock<HashMap<OrgKey, Workflow>>,
    runs: RwLock<HashMap<OrgKey, WorkflowRun>>,
    run_events: RwLock<HashMap<String, Vec<WorkflowRunEvent>>>,
    checkpoints: RwLock<HashMap<(String, String, u32), NodeCheckpoint>>,
    subscriptions: RwLock<HashMap<OrgKey, TriggerSubscription>>,
    trigger_claims: RwLock<HashSet<(String, String, String)>>,
    agent_sessions: RwLock<HashMap<OrgKey, AgentSession>>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn org_key(org: &OrgId, id: &str) -> OrgKey {
    (org.as_str().to_string(), id.to_string())
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn create_organization(&self, org: Organization) -> Result<(), StoreError> {
        let mut table = self.organizations.write().await;
        if table.contains_key(org.id.as_str()) {
            return Err(StoreError::Conflict(format!(
                "organization {} already exists",
                org.id
            )));
        }
        table.insert(org.id.as_str().to_string(), org);
        Ok(())
    }

    async fn get_organization(&self, id: &OrgId) -> Result<Organization, StoreError> {
        self.organizations
            .read()
            .await
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("organization {id}")))
    }

    async fn put_membership(&self, membership: Membership) -> Result<(), StoreError> {
        let mut table = self.memberships.write().await;
        let members = table.entry(membership.org.as_str().to_string()).or_default();
        members.retain(|m| m.user != membership.user);
        members.push(membership);
        Ok(())
    }

    async fn list_memberships(&self, org: &OrgId) -> Result<Vec<Membership>, StoreError> {
        Ok(self
            .memberships
            .read()
            .await
            .get(org.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn put_secret(&self, org: &OrgId, secret: Secret) -> Result<(), StoreError> {
        self.secrets
            .write()
            .await
            .insert(org_key(org, &secret.name), secret);
        Ok(())
    }

    async fn get_secret(&self, org: &OrgId, name: &str) -> Result<Secret, StoreError> {
        self.secrets
            .read()
            .await
            .get(&org_key(org, name))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("secret {name} in org {org}")))
    }

    async fn delete_secret(&self, org: &OrgId, name: &str) -> Result<(), StoreError> {
        self.secrets.write().await.remove(&org_key(org, name));
        Ok(())
    }

    async fn put_workflow(&self, workflow: Workflow) -> Result<(), StoreError> {
        self.workflows
            .write()
            .await
            .insert(org_key(&workflow.org, workflow.id.as_str()), workflow);
        Ok(())
    }

    async fn get_workflow(&self, org: &OrgId, id: &WorkflowId) -> Result<Workflow, StoreError> {
        self.workflows
            .read()
            .await
            .get(&org_key(org, id.as_str()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("workflow {id} in org {org}")))
    }

    async fn create_run(&self, run: WorkflowRun) -> Result<(), StoreError> {
        let mut table = self.runs.write().await;
        let key = org_key(&run.org, run.id.as_str());
        if table.contains_key(&key) {
            return Err(StoreError::Conflict(format!("run {} already exists", run.id)));
        }
        table.insert(key, run);
        Ok(())
    }

    async fn get_run(&self, org: &OrgId, id: &RunId) -> Result<WorkflowRun, StoreError> {
        self.runs
            .read()
            .await
            .get(&org_key(org, id.as_str()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("run {id} in org {org}")))
    }

    async fn update_run(&self, run: WorkflowRun) -> Result<(), StoreError> {
        let key = org_key(&run.org, run.id.as_str());
        let mut table = self.runs.write().await;
        if !table.contains_key(&key) {
            return Err(StoreError::NotFound(format!("run {} in org {}", run.id, run.org)));
        }
        table.insert(key, run);
        Ok(())
    }

    async fn list_runs_by_status(
        &self,
        org: &OrgId,
        status: RunStatus,
    ) -> Result<Vec<WorkflowRun>, StoreError> {
        Ok(self
            .runs
            .read()
            .await
            .values()
            .filter(|r| &r.org == org && r.status == status)
            .cloned()
            .collect())
    }

    async fn append_run_event(&self, event: WorkflowRunEvent) -> Result<(), StoreError> {
        self.run_events
            .write()
            .await
            .entry(event.run.as_str().to_string())
            .or_default()
            .push(event);
        Ok(())
    }

    async fn list_run_events(
        &self,
        _org: &OrgId,
        run: &RunId,
    ) -> Result<Vec<WorkflowRunEvent>, StoreError> {
        Ok(self
            .run_events
            .read()
            .await
            .get(run.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn put_checkpoint_if_absent(
        &self,
        checkpoint: NodeCheckpoint,
    ) -> Result<NodeCheckpoint, StoreError> {
        let key = (
            checkpoint.run.as_str().to_string(),
            checkpoint.node.clone(),
            checkpoint.attempt_count,
        );
        let mut table = self.checkpoints.write().await;
        if let Some(existing) = table.get(&key) {
            return Ok(existing.clone());
        }
        table.insert(key, checkpoint.clone());
        Ok(checkpoint)
    }

    async fn get_checkpoint(
        &self,
        _org: &OrgId,
        run: &RunId,
        node: &str,
        attempt_count: u32,
    ) -> Result<Option<NodeCheckpoint>, StoreError> {
        let key = (run.as_str().to_string(), node.to_string(), attempt_count);
        Ok(self.checkpoints.read().await.get(&key).cloned())
    }

    async fn claim_trigger_firing(
        &self,
        subscription: TriggerSubscription,
    ) -> Result<(), StoreError> {
        let claim_key = (
            subscription.org.as_str().to_string(),
            subscription.workflow.as_str().to_string(),
            subscription.trigger_key.clone(),
        );
        let mut claims = self.trigger_claims.write().await;
        if !claims.insert(claim_key) {
            return Err(StoreError::Conflict(format!(
                "trigger key {} for workflow {} already fired",
                subscription.trigger_key, subscription.workflow
            )));
        }
        Ok(())
    }

    async fn list_active_subscriptions(
        &self,
        org: &OrgId,
    ) -> Result<Vec<TriggerSubscription>, StoreError> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| &s.org == org && s.enabled)
            .cloned()
            .collect())
    }

    async fn put_subscription(&self, subscription: TriggerSubscription) -> Result<(), StoreError> {
        self.subscriptions
            .write()
            .await
            .insert(org_key(&subscription.org, subscription.id.as_str()), subscription);
        Ok(())
    }

    async fn get_subscription(
        &self,
        org: &OrgId,
        id: &SubscriptionId,
    ) -> Result<TriggerSubscription, StoreError> {
        self.subscriptions
            .read()
            .await
            .get(&org_key(org, id.as_str()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("subscription {id} in org {org}")))
    }

    async fn put_agent_session(&self, session: AgentSession) -> Result<(), StoreError> {
        self.agent_sessions
            .write()
            .await
            .insert(org_key(&session.org, session.id.as_str()), session);
        Ok(())
    }

    async fn get_agent_session(
        &self,
        org: &OrgId,
        id: &SessionId,
    ) -> Result<AgentSession, StoreError> {
        self.agent_sessions
            .read()
            .await
            .get(&org_key(org, id.as_str()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("agent session {id} in org {org}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunStatus, TriggerKind};
    use weft_core::SubscriptionId;

    fn run(org: &OrgId, id: &str, status: RunStatus) -> WorkflowRun {
        WorkflowRun {
            id: RunId::new(id),
            org: org.clone(),
            workflow: WorkflowId::new("wf_1"),
            dsl_version: 1,
            status,
            attempt_count: 1,
            input: serde_json::json!({}),
            cursor: serde_json::json!({}),
            output: None,
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    #[tokio::test]
    async fn create_run_rejects_duplicate_id() {
        let store = MemoryStore::new();
        let org = OrgId::new("org_1");
        store.create_run(run(&org, "run_1", RunStatus::Queued)).await.unwrap();
        let err = store
            .create_run(run(&org, "run_1", RunStatus::Queued))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_runs_by_status_filters_by_org_and_status() {
        let store = MemoryStore::new();
        let org_a = OrgId::new("org_a");
        let org_b = OrgId::new("org_b");
        store.create_run(run(&org_a, "r1", RunStatus::Queued)).await.unwrap();
        store.create_run(run(&org_a, "r2", RunStatus::Running)).await.unwrap();
        store.create_run(run(&org_b, "r3", RunStatus::Queued)).await.unwrap();

        let queued = store.list_runs_by_status(&org_a, RunStatus::Queued).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].id.as_str(), "r1");
    }

    #[tokio::test]
    async fn checkpoint_is_idempotent_per_attempt() {
        let store = MemoryStore::new();
        let org = OrgId::new("org_1");
        let run_id = RunId::new("run_1");
        let cp = NodeCheckpoint {
            run: run_id.clone(),
            node: "node_a".into(),
            attempt_count: 1,
            output: serde_json::json!({"ok": true}),
        };
        let first = store.put_checkpoint_if_absent(cp.clone()).await.unwrap();
        let mut conflicting = cp.clone();
        conflicting.output = serde_json::json!({"ok": false});
        let second = store.put_checkpoint_if_absent(conflicting).await.unwrap();
        assert_eq!(first.output, second.output);
        assert_eq!(second.output, serde_json::json!({"ok": true}));

        let fetched = store
            .get_checkpoint(&org, &run_id, "node_a", 1)
            .await
            .unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn trigger_firing_is_at_most_once() {
        let store = MemoryStore::new();
        let org = OrgId::new("org_1");
        let sub = TriggerSubscription {
            id: SubscriptionId::new("sub_1"),
            org: org.clone(),
            workflow: WorkflowId::new("wf_1"),
            trigger_key: "2026-07-26T09:00:00Z".into(),
            kind: TriggerKind::Cron {
                expression: "0 9 * * *".into(),
            },
            enabled: true,
            last_fired_at_ms: None,
        };
        store.claim_trigger_firing(sub.clone()).await.unwrap();
        let err = store.claim_trigger_firing(sub).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
