//! The in-process analogue of the atomic capacity-reservation script: a
//! single `Mutex`-guarded table of in-flight counters, incremented and
//! decremented together so a reservation never leaves one counter
//! updated and the other not.

use std::collections::HashMap;

use tokio::sync::Mutex;
use weft_core::{ExecutorId, OrgId};

use crate::error::GatewayError;

struct CapacityState {
    executor_in_flight: HashMap<ExecutorId, u32>,
    org_in_flight: HashMap<OrgId, u32>,
}

/// Tracks how many requests are outstanding per executor and per org, and
/// enforces both limits atomically on reservation.
pub struct CapacityLedger {
    state: Mutex<CapacityState>,
}

impl CapacityLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CapacityState {
                executor_in_flight: HashMap::new(),
                org_in_flight: HashMap::new(),
            }),
        }
    }

    /// Reserve one slot against both `executor` and `org`. Either both
    /// counters are incremented or neither is.
    pub async fn reserve(
        &self,
        executor: &ExecutorId,
        executor_max: u32,
        org: &OrgId,
        org_max: u32,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        let executor_count = *state.executor_in_flight.get(executor).unwrap_or(&0);
        if executor_count + 1 > executor_max {
            return Err(GatewayError::ExecutorOverCapacity(executor.to_string()));
        }
        let org_count = *state.org_in_flight.get(org).unwrap_or(&0);
        if org_count + 1 > org_max {
            return Err(GatewayError::OrgQuotaExceeded(org.to_string()));
        }
        *state.executor_in_flight.entry(executor.clone()).or_insert(0) += 1;
        *state.org_in_flight.entry(org.clone()).or_insert(0) += 1;
        Ok(())
    }

    /// Release one slot from both counters. A no-op (saturating) if either
    /// counter is already at zero, so a double-release from a racing
    /// disconnect-and-result never underflows.
    pub async fn release(&self, executor: &ExecutorId, org: &OrgId) {
        let mut state = self.state.lock().await;
        if let Some(count) = state.executor_in_flight.get_mut(executor) {
            *count = count.saturating_sub(1);
        }
        if let Some(count) = state.org_in_flight.get_mut(org) {
            *count = count.saturating_sub(1);
        }
    }

    /// Current in-flight count for one executor, used by the selector's
    /// fewest-in-flight tie-break.
    pub async fn in_flight_for(&self, executor: &ExecutorId) -> u32 {
        *self.state.lock().await.executor_in_flight.get(executor).unwrap_or(&0)
    }
}

impl Default for CapacityLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reservation_fails_cleanly_without_mutating_either_counter() {
        let ledger = CapacityLedger::new();
        let executor = ExecutorId::new("exec_1");
        let org = OrgId::new("org_1");
        ledger.reserve(&executor, 1, &org, 10).await.unwrap();
        let err = ledger.reserve(&executor, 1, &org, 10).await.unwrap_err();
        assert!(matches!(err, GatewayError::ExecutorOverCapacity(_)));
        assert_eq!(ledger.in_flight_for(&executor).await, 1);
    }

    #[tokio::test]
    async fn release_is_idempotent_against_double_release() {
        let ledger = CapacityLedger::new();
        let executor = ExecutorId::new("exec_1");
        let org = OrgId::new("org_1");
        ledger.reserve(&executor, 5, &org, 5).await.unwrap();
        ledger.release(&executor, &org).await;
        ledger.release(&executor, &org).await;
        assert_eq!(ledger.in_flight_for(&executor).await, 0);
    }

    #[tokio::test]
    async fn org_quota_independent_of_executor_max() {
        let ledger = CapacityLedger::new();
        let executor_a = ExecutorId::new("exec_a");
        let executor_b = ExecutorId::new("exec_b");
        let org = OrgId::new("org_1");
        ledger.reserve(&executor_a, 10, &org, 1).await.unwrap();
        let err = ledger.reserve(&executor_b, 10, &org, 1).await.unwrap_err();
        assert!(matches!(err, GatewayError::OrgQuotaExceeded(_)));
    }
}
