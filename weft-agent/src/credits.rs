//! A pluggable credit ledger gating and charging LLM turns.
//!
//! A managed-credits ledger is consulted before every model call and
//! charged afterward. This trait, plus an in-memory reference
//! implementation, follows the same pluggable-backend-with-in-tree-dev-impl
//! shape as `weft-secret`'s `CipherProvider`/`LocalAesGcmCipher` split.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use weft_core::OrgId;

/// A source of credits an org draws down against while running agent loops.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Returns `Ok(())` if at least `amount` credits are available for
    /// `org`, without reserving them. Called once per turn before the
    /// LLM is invoked.
    async fn ensure_available(&self, org: &OrgId, amount: u64) -> Result<(), CreditError>;

    /// Deduct `amount` credits from `org`'s balance. Called once per turn
    /// after the LLM call returns, proportional to tokens used.
    async fn charge(&self, org: &OrgId, amount: u64) -> Result<(), CreditError>;
}

/// Credit ledger failures.
#[derive(Debug, thiserror::Error)]
pub enum CreditError {
    /// The org has fewer than the requested credits available.
    #[error("insufficient credits for org {0}")]
    Insufficient(String),
}

/// An in-memory [`CreditLedger`] for tests and single-process deployments.
///
/// Balances start at `u64::MAX` for orgs never explicitly funded, so a
/// ledger can be dropped in without a setup step unless a test wants to
/// exercise exhaustion.
pub struct InMemoryCreditLedger {
    balances: Mutex<HashMap<String, u64>>,
}

impl InMemoryCreditLedger {
    /// An empty ledger; every org starts unfunded until [`Self::fund`] is called.
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
        }
    }

    /// Set `org`'s balance to exactly `amount`.
    pub fn fund(&self, org: &OrgId, amount: u64) {
        self.balances
            .lock()
            .expect("credit ledger mutex poisoned")
            .insert(org.as_str().to_string(), amount);
    }

    fn balance_or_unfunded(&self, org: &OrgId) -> u64 {
        self.balances
            .lock()
            .expect("credit ledger mutex poisoned")
            .get(org.as_str())
            .copied()
            .unwrap_or(u64::MAX)
    }
}

impl Default for InMemoryCreditLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CreditLedger for InMemoryCreditLedger {
    async fn ensure_available(&self, org: &OrgId, amount: u64) -> Result<(), CreditError> {
        if self.balance_or_unfunded(org) >= amount {
            Ok(())
        } else {
            Err(CreditError::Insufficient(org.as_str().to_string()))
        }
    }

    async fn charge(&self, org: &OrgId, amount: u64) -> Result<(), CreditError> {
        let mut balances = self.balances.lock().expect("credit ledger mutex poisoned");
        let entry = balances.entry(org.as_str().to_string()).or_insert(u64::MAX);
        *entry = entry.saturating_sub(amount);
        Ok(())
    }
}

/// Charge proportional to tokens used this turn: `ceil((input+output)/1000)`.
pub fn credits_for_tokens(input_tokens: u64, output_tokens: u64) -> u64 {
    let total = input_tokens + output_tokens;
    total.div_ceil(1000).max(if total > 0 { 1 } else { 0 })
}
