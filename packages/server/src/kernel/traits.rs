// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like the digest submit ordering) lives in domain code that
// uses these traits.
//
// Naming convention: Base* for trait names (e.g., BaseKeyedStore, BaseJobQueue)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::common::UserId;
use crate::domains::auth::models::User;
use crate::domains::entitlements::FeatureGrant;
use crate::kernel::analytics::AnalyticsEvent;

// =============================================================================
// Keyed Store Trait (Infrastructure - cache store with expiry)
// =============================================================================

/// Key-value store with per-key expiry.
///
/// Backs both the digest job records (`digest:<user_id>`) and the daily usage
/// counters (`usage:<user_id>:<action>:<day>`). Values are JSON strings.
#[async_trait]
pub trait BaseKeyedStore: Send + Sync {
    /// Read a value, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value with a time-to-live, overwriting any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Atomically increment a counter key and return the new value.
    ///
    /// The ttl applies only when the increment creates the key; an existing
    /// key keeps its original expiry. Atomicity per key is what keeps
    /// concurrent usage increments from undercounting.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64>;
}

// =============================================================================
// Job Queue Trait (Infrastructure)
// =============================================================================

/// Hand-off point to the external worker fleet.
///
/// The API only enqueues; claiming, retries, and status transitions on the
/// queue side belong to the workers.
#[async_trait]
pub trait BaseJobQueue: Send + Sync {
    /// Enqueue a job for the external workers. Returns the queue entry id.
    ///
    /// `run_at` of `None` means "as soon as a worker is free".
    async fn enqueue(
        &self,
        job_type: &str,
        payload: serde_json::Value,
        run_at: Option<DateTime<Utc>>,
    ) -> Result<Uuid>;
}

// =============================================================================
// Analytics Trait (Infrastructure)
// =============================================================================

/// Fire-and-forget event capture.
///
/// Implementations must return once the event is accepted for processing;
/// delivery failures are their own to log, never the caller's to handle.
#[async_trait]
pub trait BaseAnalytics: Send + Sync {
    async fn capture(&self, event: AnalyticsEvent) -> Result<()>;
}

// =============================================================================
// Clock Trait (Infrastructure)
// =============================================================================

/// Injectable time source.
///
/// Day-bucketed usage counters and record timestamps go through this so tests
/// can roll the calendar deterministically.
pub trait BaseClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// =============================================================================
// User Store Trait (Infrastructure - active-account lookup)
// =============================================================================

#[async_trait]
pub trait BaseUserStore: Send + Sync {
    /// Look up an account by id, returning it only if the account is active.
    async fn find_active_user(&self, user_id: UserId) -> Result<Option<User>>;
}

// =============================================================================
// Entitlements Trait (Infrastructure - feature grant lookup)
// =============================================================================

#[async_trait]
pub trait BaseEntitlements: Send + Sync {
    /// Current-truth lookup of a named feature grant for a user.
    async fn find_granted_feature(
        &self,
        feature: &str,
        user_id: UserId,
    ) -> Result<Option<FeatureGrant>>;
}
