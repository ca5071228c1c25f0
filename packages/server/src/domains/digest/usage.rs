//! Daily usage ledger.
//!
//! Counters are keyed by (user, action, calendar day) in the cache store, so
//! a day rollover is just a new key and old buckets fall out by TTL. The
//! calling workflow is responsible for the ordering contract: check the
//! quota before performing the action, record usage only after the action
//! confirmed success. A failed attempt must never consume quota.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::common::UserId;
use crate::kernel::{BaseClock, BaseKeyedStore};

/// Buckets outlive their day by one more, covering clock skew between the
/// API instances that write them.
const USAGE_TTL: Duration = Duration::from_secs(2 * 24 * 60 * 60);

pub struct UsageLedger {
    store: Arc<dyn BaseKeyedStore>,
    clock: Arc<dyn BaseClock>,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn BaseKeyedStore>, clock: Arc<dyn BaseClock>) -> Self {
        Self { store, clock }
    }

    fn key_for_today(&self, user_id: UserId, action: &str) -> String {
        let day = self.clock.now().format("%Y-%m-%d");
        format!("usage:{}:{}:{}", user_id, action, day)
    }

    /// True when the user is still under `limit` for `action` today.
    pub async fn check_quota(&self, user_id: UserId, action: &str, limit: u32) -> Result<bool> {
        let key = self.key_for_today(user_id, action);
        let count = self
            .store
            .get(&key)
            .await?
            .map(|raw| raw.parse::<i64>())
            .transpose()?
            .unwrap_or(0);
        Ok(count < i64::from(limit))
    }

    /// Count one confirmed completion of `action`. Returns today's total.
    pub async fn record_usage(&self, user_id: UserId, action: &str) -> Result<i64> {
        let key = self.key_for_today(user_id, action);
        self.store.increment(&key, USAGE_TTL).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{ManualClock, MemoryKeyedStore};
    use chrono::Duration as ChronoDuration;

    fn ledger() -> (UsageLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(MemoryKeyedStore::new(clock.clone()));
        (UsageLedger::new(store, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_quota_exhausts_after_limit_recorded() {
        let (ledger, _clock) = ledger();
        let user = UserId::new();

        for _ in 0..3 {
            assert!(ledger.check_quota(user, "send_reply", 3).await.unwrap());
            ledger.record_usage(user, "send_reply").await.unwrap();
        }

        // The N+1th check within the same day observes the limit
        assert!(!ledger.check_quota(user, "send_reply", 3).await.unwrap());
    }

    #[tokio::test]
    async fn test_counts_are_monotonic_within_a_day() {
        let (ledger, _clock) = ledger();
        let user = UserId::new();

        let first = ledger.record_usage(user, "send_reply").await.unwrap();
        let second = ledger.record_usage(user, "send_reply").await.unwrap();
        assert_eq!((first, second), (1, 2));
    }

    #[tokio::test]
    async fn test_day_rollover_resets_the_bucket() {
        let (ledger, clock) = ledger();
        let user = UserId::new();

        ledger.record_usage(user, "send_reply").await.unwrap();
        assert!(!ledger.check_quota(user, "send_reply", 1).await.unwrap());

        clock.advance(ChronoDuration::days(1));
        assert!(ledger.check_quota(user, "send_reply", 1).await.unwrap());
        assert_eq!(ledger.record_usage(user, "send_reply").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_actions_and_users_are_counted_separately() {
        let (ledger, _clock) = ledger();
        let user_a = UserId::new();
        let user_b = UserId::new();

        ledger.record_usage(user_a, "send_reply").await.unwrap();
        ledger.record_usage(user_a, "create_digest").await.unwrap();

        assert!(!ledger.check_quota(user_a, "send_reply", 1).await.unwrap());
        assert!(ledger.check_quota(user_a, "create_digest", 2).await.unwrap());
        assert!(ledger.check_quota(user_b, "send_reply", 1).await.unwrap());
    }
}
