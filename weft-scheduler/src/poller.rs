//! The trigger poller: finds due cron/heartbeat subscriptions, fires each
//! at most once per slot, and enqueues the resulting run.
//!
//! Deliberately talks to `weft-engine` only through the store and the
//! queue, the same way `weft-engine::dispatch` talks to the gateway only
//! through a trait — the poller and the engine agree on the queue
//! payload shape (`{"org": ..., "run": ...}`) as a wire contract, not a
//! Rust-level dependency between the two crates.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde_json::json;
use weft_core::{OrgId, RunId};
use weft_queue::{QueueItem, WorkQueue};
use weft_store::{DurableStore, RunStatus, StoreError, TriggerKind, TriggerSubscription, WorkflowRun};

use crate::error::SchedulerError;

/// How long an invalid cron expression defers its subscription's next
/// check, to avoid spinning a tight loop on a typo.
const INVALID_CRON_DEFER_MS: u64 = 5 * 60 * 1000;

fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

fn millis_to_datetime(ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms as i64).unwrap_or_else(Utc::now)
}

fn slot_key_suffix(ms: u64) -> String {
    millis_to_datetime(ms).to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn kind_tag(kind: &TriggerKind) -> &'static str {
    match kind {
        TriggerKind::Cron { .. } => "cron",
        TriggerKind::Heartbeat { .. } => "heartbeat",
    }
}

/// The result of checking one subscription against the clock.
enum DueCheck {
    NotDue,
    Due { slot_ms: u64, next_base_ms: u64 },
    InvalidCron,
}

fn check_due(kind: &TriggerKind, last_fired_at_ms: Option<u64>, now: u64) -> DueCheck {
    match kind {
        TriggerKind::Cron { expression } => {
            let Ok(schedule) = Schedule::from_str(expression) else {
                return DueCheck::InvalidCron;
            };
            let base = millis_to_datetime(last_fired_at_ms.unwrap_or(0));
            let Some(next) = schedule.after(&base).next() else {
                return DueCheck::NotDue;
            };
            let slot_ms = next.timestamp_millis().max(0) as u64;
            if slot_ms > now {
                return DueCheck::NotDue;
            }
            DueCheck::Due {
                slot_ms,
                next_base_ms: slot_ms,
            }
        }
        TriggerKind::Heartbeat { interval_ms, max_skew_ms } => {
            let Some(last) = last_fired_at_ms else {
                return DueCheck::Due { slot_ms: now, next_base_ms: now };
            };
            let nominal_next = last.saturating_add(*interval_ms);
            if nominal_next > now {
                return DueCheck::NotDue;
            }
            let next_base_ms = if now.saturating_sub(nominal_next) > *max_skew_ms {
                now
            } else {
                nominal_next
            };
            DueCheck::Due { slot_ms: nominal_next, next_base_ms }
        }
    }
}

/// Polls every active trigger subscription in an org and fires the ones
/// whose slot has arrived.
pub struct TriggerPoller {
    store: Arc<dyn DurableStore>,
    queue: Arc<dyn WorkQueue>,
}

impl TriggerPoller {
    /// Assemble a poller from its collaborators.
    pub fn new(store: Arc<dyn DurableStore>, queue: Arc<dyn WorkQueue>) -> Self {
        Self { store, queue }
    }

    /// Check every active subscription in `org` once. Returns how many
    /// runs were enqueued.
    pub async fn tick(&self, org: &OrgId) -> Result<usize, SchedulerError> {
        let subscriptions = self.store.list_active_subscriptions(org).await?;
        let now = now_ms();
        let mut fired = 0;
        for subscription in subscriptions {
            if self.fire_if_due(org, subscription, now).await? {
                fired += 1;
            }
        }
        Ok(fired)
    }

    async fn fire_if_due(&self, org: &OrgId, subscription: TriggerSubscription, now: u64) -> Result<bool, SchedulerError> {
        match check_due(&subscription.kind, subscription.last_fired_at_ms, now) {
            DueCheck::NotDue => Ok(false),
            DueCheck::InvalidCron => {
                tracing::warn!(subscription = %subscription.id, "invalid cron expression, deferring");
                let mut deferred = subscription;
                deferred.last_fired_at_ms = Some(now.saturating_add(INVALID_CRON_DEFER_MS));
                self.store.put_subscription(deferred).await?;
                Ok(false)
            }
            DueCheck::Due { slot_ms, next_base_ms } => {
                self.fire_slot(org, subscription, slot_ms, next_base_ms).await
            }
        }
    }

    async fn fire_slot(
        &self,
        org: &OrgId,
        subscription: TriggerSubscription,
        slot_ms: u64,
        next_base_ms: u64,
    ) -> Result<bool, SchedulerError> {
        let trigger_key = format!("{}:{}:{}", kind_tag(&subscription.kind), subscription.id, slot_key_suffix(slot_ms));

        let claim = TriggerSubscription {
            trigger_key: trigger_key.clone(),
            ..subscription.clone()
        };
        match self.store.claim_trigger_firing(claim).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        let workflow = self.store.get_workflow(org, &subscription.workflow).await?;
        let run = WorkflowRun {
            id: RunId::new(format!("run_{trigger_key}")),
            org: org.clone(),
            workflow: subscription.workflow.clone(),
            dsl_version: workflow.dsl_version,
            status: RunStatus::Queued,
            attempt_count: 1,
            input: json!({}),
            cursor: serde_json::Value::Null,
            output: None,
            created_at_ms: slot_ms,
            updated_at_ms: slot_ms,
        };

        match self.store.create_run(run.clone()).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let enqueue_result = self
            .queue
            .enqueue(QueueItem::new(run.id.as_str().to_string(), json!({ "org": run.org, "run": run.id })))
            .await;

        if let Err(e) = enqueue_result {
            tracing::warn!(run = %run.id, error = %e, "trigger_queue_unavailable");
            let mut failed = run.clone();
            failed.status = RunStatus::Failed;
            failed.output = Some(json!({ "error": "QUEUE_UNAVAILABLE" }));
            self.store.update_run(failed).await?;
            return Err(e.into());
        }

        let mut updated = subscription;
        updated.last_fired_at_ms = Some(next_base_ms);
        self.store.put_subscription(updated).await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::{SubscriptionId, WorkflowId};
    use weft_dsl::{WorkflowDsl, WorkflowNodesV2};
    use weft_queue::{MemoryWorkQueue, QueueConfig};
    use weft_store::{MemoryStore, Workflow};

    async fn seeded(org: &OrgId) -> (Arc<MemoryStore>, Arc<MemoryWorkQueue>) {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryWorkQueue::new(QueueConfig::default()));
        store
            .put_workflow(Workflow {
                id: WorkflowId::new("wf_1"),
                org: org.clone(),
                name: "demo".to_string(),
                dsl_version: 1,
                dsl: WorkflowDsl::V2(WorkflowNodesV2 { nodes: vec![] }),
                is_active: true,
            })
            .await
            .unwrap();
        (store, queue)
    }

    #[tokio::test]
    async fn cron_subscription_fires_exactly_once_per_slot() {
        let org = OrgId::new("org_1");
        let (store, queue) = seeded(&org).await;
        let slot = DateTime::parse_from_rfc3339("2026-02-16T12:05:00Z").unwrap().with_timezone(&Utc);
        let sub = TriggerSubscription {
            id: SubscriptionId::new("sub_1"),
            org: org.clone(),
            workflow: WorkflowId::new("wf_1"),
            trigger_key: String::new(),
            kind: TriggerKind::Cron { expression: "*/5 * * * *".to_string() },
            enabled: true,
            last_fired_at_ms: Some(slot.timestamp_millis() as u64 - 1),
        };
        store.put_subscription(sub.clone()).await.unwrap();

        let poller = TriggerPoller::new(store.clone(), queue.clone());
        let now = slot.timestamp_millis() as u64 + 500;

        let fired_first = poller.fire_if_due(&org, store.get_subscription(&org, &sub.id).await.unwrap(), now).await.unwrap();
        assert!(fired_first);
        let fired_second = poller.fire_if_due(&org, store.get_subscription(&org, &sub.id).await.unwrap(), now).await.unwrap();
        assert!(!fired_second);

        let updated = store.get_subscription(&org, &sub.id).await.unwrap();
        assert_eq!(updated.last_fired_at_ms, Some(slot.timestamp_millis() as u64));

        // The slot that fired is now the base; the next tick only becomes
        // due once the clock reaches the following cron occurrence.
        let expected_next = DateTime::parse_from_rfc3339("2026-02-16T12:10:00Z").unwrap().with_timezone(&Utc);
        let still_not_due = poller
            .fire_if_due(&org, store.get_subscription(&org, &sub.id).await.unwrap(), expected_next.timestamp_millis() as u64 - 1)
            .await
            .unwrap();
        assert!(!still_not_due);
        let due_at_next_slot = poller
            .fire_if_due(&org, store.get_subscription(&org, &sub.id).await.unwrap(), expected_next.timestamp_millis() as u64)
            .await
            .unwrap();
        assert!(due_at_next_slot);
    }

    #[tokio::test]
    async fn heartbeat_catches_up_when_skew_exceeds_tolerance() {
        let org = OrgId::new("org_1");
        let (store, queue) = seeded(&org).await;
        let sub = TriggerSubscription {
            id: SubscriptionId::new("sub_2"),
            org: org.clone(),
            workflow: WorkflowId::new("wf_1"),
            trigger_key: String::new(),
            kind: TriggerKind::Heartbeat { interval_ms: 1_000, max_skew_ms: 500 },
            enabled: true,
            last_fired_at_ms: Some(0),
        };
        store.put_subscription(sub.clone()).await.unwrap();

        let poller = TriggerPoller::new(store.clone(), queue);
        let now = 10_000;
        let fired = poller.fire_if_due(&org, store.get_subscription(&org, &sub.id).await.unwrap(), now).await.unwrap();
        assert!(fired);
        let updated = store.get_subscription(&org, &sub.id).await.unwrap();
        assert_eq!(updated.last_fired_at_ms, Some(now));
    }

    #[tokio::test]
    async fn invalid_cron_expression_defers_without_failing_the_tick() {
        let org = OrgId::new("org_1");
        let (store, queue) = seeded(&org).await;
        let sub = TriggerSubscription {
            id: SubscriptionId::new("sub_3"),
            org: org.clone(),
            workflow: WorkflowId::new("wf_1"),
            trigger_key: String::new(),
            kind: TriggerKind::Cron { expression: "not a cron expr".to_string() },
            enabled: true,
            last_fired_at_ms: None,
        };
        store.put_subscription(sub.clone()).await.unwrap();

        let poller = TriggerPoller::new(store.clone(), queue);
        let fired = poller.tick(&org).await.unwrap();
        assert_eq!(fired, 0);
        let updated = store.get_subscription(&org, &sub.id).await.unwrap();
        assert!(updated.last_fired_at_ms.unwrap() >= INVALID_CRON_DEFER_MS);
    }
}
