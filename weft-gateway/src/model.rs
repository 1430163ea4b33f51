//! Executor routes and the selector that matches a dispatch against them.

use std::collections::BTreeSet;

use serde::Deserialize;
use weft_core::{ExecutorId, OrgId};

/// Which pool an executor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    /// Platform-hosted executor.
    Managed,
    /// Bring-your-own-node executor.
    Byon,
}

/// A connected executor's advertised capabilities, refreshed by heartbeat.
#[derive(Debug, Clone)]
pub struct ExecutorRoute {
    /// The executor's identifier.
    pub executor_id: ExecutorId,
    /// The org this executor is bound to. Routing is strictly tenant-scoped:
    /// an executor registered for one org never matches another's dispatch.
    pub org: OrgId,
    /// Which pool this executor belongs to.
    pub pool: Pool,
    /// Labels this executor advertises.
    pub labels: BTreeSet<String>,
    /// Dispatch kinds this executor can handle (`connector.action`,
    /// `agent.execute`, `agent.run`).
    pub kinds: BTreeSet<String>,
    /// Optional group pin.
    pub group: Option<String>,
    /// Optional tag pin.
    pub tag: Option<String>,
    /// Maximum concurrent in-flight requests this executor will accept.
    pub max_in_flight: u32,
    /// Last heartbeat timestamp, milliseconds since epoch.
    pub last_seen_at_ms: u64,
    /// Last time this executor was picked for a dispatch, used for the
    /// least-recently-used tie-break.
    pub last_used_at_ms: u64,
}

impl ExecutorRoute {
    /// A freshly registered route, never yet used.
    pub fn new(executor_id: ExecutorId, org: OrgId, pool: Pool, max_in_flight: u32, now_ms: u64) -> Self {
        Self {
            executor_id,
            org,
            pool,
            labels: BTreeSet::new(),
            kinds: BTreeSet::new(),
            group: None,
            tag: None,
            max_in_flight,
            last_seen_at_ms: now_ms,
            last_used_at_ms: 0,
        }
    }

    /// Builder: attach advertised dispatch kinds.
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = String>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    /// Builder: attach advertised labels.
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.labels = labels.into_iter().collect();
        self
    }

    /// Builder: pin a group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Builder: pin a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Routing constraints for one dispatch, parsed from the node's optional
/// selector payload. `kind` folds in the dispatch kind the node wants
/// routed, since the engine's dispatch trait carries only `payload` and
/// `selector` and no separate field for it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Selector {
    /// Restrict to this pool, if set.
    #[serde(default)]
    pub pool: Option<Pool>,
    /// Every listed label must be present on the executor.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Restrict to this group, if set.
    #[serde(default)]
    pub group: Option<String>,
    /// Restrict to this tag, if set.
    #[serde(default)]
    pub tag: Option<String>,
    /// Pin a specific executor.
    #[serde(default, rename = "executorId")]
    pub executor_id: Option<String>,
    /// The dispatch kind being routed. When absent, any executor capable
    /// of at least one kind is considered a match.
    #[serde(default)]
    pub kind: Option<String>,
}

impl Selector {
    /// Whether `route` satisfies every constraint this selector states.
    pub fn matches(&self, route: &ExecutorRoute) -> bool {
        if let Some(pool) = self.pool {
            if route.pool != pool {
                return false;
            }
        }
        if !self.labels.iter().all(|l| route.labels.contains(l)) {
            return false;
        }
        if let Some(group) = &self.group {
            if route.group.as_deref() != Some(group.as_str()) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if route.tag.as_deref() != Some(tag.as_str()) {
                return false;
            }
        }
        if let Some(executor_id) = &self.executor_id {
            if route.executor_id.as_str() != executor_id {
                return false;
            }
        }
        if let Some(kind) = &self.kind {
            if !route.kinds.contains(kind) {
                return false;
            }
        }
        true
    }
}
