//! The table of currently routable executors and the tie-break that picks
//! one among several selector matches.

use std::collections::HashMap;

use tokio::sync::Mutex;
use weft_core::{ExecutorId, OrgId};

use crate::capacity::CapacityLedger;
use crate::model::{ExecutorRoute, Selector};

/// Live executor routes, keyed by executor ID.
pub struct ExecutorRegistry {
    routes: Mutex<HashMap<ExecutorId, ExecutorRoute>>,
}

impl ExecutorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { routes: Mutex::new(HashMap::new()) }
    }

    /// Register a newly connected executor, or replace its prior route.
    pub async fn register(&self, route: ExecutorRoute) {
        self.routes.lock().await.insert(route.executor_id.clone(), route);
    }

    /// Refresh an executor's last-seen timestamp without touching its
    /// advertised capabilities.
    pub async fn heartbeat(&self, executor: &ExecutorId, now_ms: u64) {
        if let Some(route) = self.routes.lock().await.get_mut(executor) {
            route.last_seen_at_ms = now_ms;
        }
    }

    /// Drop a route entirely, e.g. on disconnect.
    pub async fn remove(&self, executor: &ExecutorId) {
        self.routes.lock().await.remove(executor);
    }

    /// Executors matching `selector` for `org`, within `ttl_ms` of their
    /// last heartbeat, ordered best-candidate-first: most specialized
    /// (fewest advertised kinds) first, then fewest in-flight, then least
    /// recently used, then stable by executor ID.
    pub async fn candidates(
        &self,
        org: &OrgId,
        selector: &Selector,
        now_ms: u64,
        ttl_ms: u64,
        capacity: &CapacityLedger,
    ) -> Vec<ExecutorRoute> {
        let routes = self.routes.lock().await;
        let mut matches: Vec<ExecutorRoute> = routes
            .values()
            .filter(|r| &r.org == org)
            .filter(|r| now_ms.saturating_sub(r.last_seen_at_ms) <= ttl_ms)
            .filter(|r| selector.matches(r))
            .cloned()
            .collect();
        drop(routes);

        let mut ranked = Vec::with_capacity(matches.len());
        for route in matches.drain(..) {
            let in_flight = capacity.in_flight_for(&route.executor_id).await;
            ranked.push((route.kinds.len(), in_flight, route.last_used_at_ms, route.executor_id.to_string(), route));
        }
        ranked.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
                .then(a.3.cmp(&b.3))
        });
        ranked.into_iter().map(|(_, _, _, _, route)| route).collect()
    }

    /// Record that `executor` was just picked for a dispatch.
    pub async fn mark_used(&self, executor: &ExecutorId, now_ms: u64) {
        if let Some(route) = self.routes.lock().await.get_mut(executor) {
            route.last_used_at_ms = now_ms;
        }
    }

    /// Whether a specific executor is currently routable for `org`.
    pub async fn is_routable(&self, executor: &ExecutorId, org: &OrgId, now_ms: u64, ttl_ms: u64) -> bool {
        self.routes
            .lock()
            .await
            .get(executor)
            .is_some_and(|r| &r.org == org && now_ms.saturating_sub(r.last_seen_at_ms) <= ttl_ms)
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Pool;

    fn route(id: &str, org: &OrgId, kinds: &[&str], max_in_flight: u32, now_ms: u64) -> ExecutorRoute {
        ExecutorRoute::new(ExecutorId::new(id), org.clone(), Pool::Managed, max_in_flight, now_ms)
            .with_kinds(kinds.iter().map(|s| s.to_string()))
    }

    #[tokio::test]
    async fn prefers_the_more_specialized_executor() {
        let registry = ExecutorRegistry::new();
        let capacity = CapacityLedger::new();
        let org = OrgId::new("org_1");
        registry.register(route("generalist", &org, &["connector.action", "agent.execute"], 5, 0)).await;
        registry.register(route("specialist", &org, &["connector.action"], 5, 0)).await;

        let selector = Selector { kind: Some("connector.action".to_string()), ..Default::default() };
        let ranked = registry.candidates(&org, &selector, 0, 60_000, &capacity).await;
        assert_eq!(ranked[0].executor_id.as_str(), "specialist");
    }

    #[tokio::test]
    async fn stale_heartbeat_excludes_a_route() {
        let registry = ExecutorRegistry::new();
        let capacity = CapacityLedger::new();
        let org = OrgId::new("org_1");
        registry.register(route("exec_1", &org, &["connector.action"], 5, 0)).await;

        let selector = Selector::default();
        let ranked = registry.candidates(&org, &selector, 100_000, 60_000, &capacity).await;
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn a_different_orgs_executor_never_matches() {
        let registry = ExecutorRegistry::new();
        let capacity = CapacityLedger::new();
        let org_a = OrgId::new("org_a");
        let org_b = OrgId::new("org_b");
        registry.register(route("exec_1", &org_a, &["connector.action"], 5, 0)).await;

        let selector = Selector::default();
        let ranked = registry.candidates(&org_b, &selector, 0, 60_000, &capacity).await;
        assert!(ranked.is_empty());
    }
}
