// TestDependencies - in-memory implementations for testing
//
// Provides doubles for every kernel trait plus a bundle that wires them into
// the domain services. The clock is manual so tests can roll the calendar
// (usage day buckets, record expiry) deterministically.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use super::analytics::AnalyticsEvent;
use super::{
    BaseAnalytics, BaseClock, BaseEntitlements, BaseJobQueue, BaseKeyedStore, BaseUserStore,
};
use crate::common::UserId;
use crate::domains::auth::models::User;
use crate::domains::auth::JwtService;
use crate::domains::digest::{DigestLifecycle, FeedbackSink};
use crate::domains::entitlements::FeatureGrant;

// =============================================================================
// Manual Clock
// =============================================================================

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Starts at a fixed mid-day instant so a test advancing by hours does
    /// not trip over a day boundary unless it means to.
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// =============================================================================
// In-memory Keyed Store
// =============================================================================

/// Keyed store holding entries in a map, expiring them against the shared
/// test clock.
pub struct MemoryKeyedStore {
    clock: Arc<dyn BaseClock>,
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryKeyedStore {
    pub fn new(clock: Arc<dyn BaseClock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((_, expires_at)) if *expires_at <= now => {
                entries.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }
}

#[async_trait]
impl BaseKeyedStore for MemoryKeyedStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = self.clock.now() + ChronoDuration::from_std(ttl)?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn increment(&self, key: &str, ttl: Duration) -> Result<i64> {
        let current = self.live_value(key);
        let mut entries = self.entries.lock().unwrap();
        let next = current
            .as_deref()
            .map(|raw| raw.parse::<i64>())
            .transpose()?
            .unwrap_or(0)
            + 1;
        let expires_at = match entries.get(key) {
            // Existing key keeps its expiry, matching Redis INCR semantics
            Some((_, expires_at)) => *expires_at,
            None => self.clock.now() + ChronoDuration::from_std(ttl)?,
        };
        entries.insert(key.to_string(), (next.to_string(), expires_at));
        Ok(next)
    }
}

// =============================================================================
// Recording Job Queue
// =============================================================================

/// Arguments captured from an enqueue call.
#[derive(Debug, Clone)]
pub struct EnqueuedJob {
    pub job_type: String,
    pub payload: serde_json::Value,
    pub run_at: Option<DateTime<Utc>>,
}

/// Job queue that records every enqueue instead of persisting it.
pub struct RecordingJobQueue {
    calls: Mutex<Vec<EnqueuedJob>>,
    fail_next: AtomicBool,
}

impl RecordingJobQueue {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make the next enqueue call fail, for dependency-failure tests.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<EnqueuedJob> {
        self.calls.lock().unwrap().clone()
    }

    pub fn enqueue_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for RecordingJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseJobQueue for RecordingJobQueue {
    async fn enqueue(
        &self,
        job_type: &str,
        payload: serde_json::Value,
        run_at: Option<DateTime<Utc>>,
    ) -> Result<Uuid> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("queue unavailable"));
        }
        self.calls.lock().unwrap().push(EnqueuedJob {
            job_type: job_type.to_string(),
            payload,
            run_at,
        });
        Ok(Uuid::new_v4())
    }
}

// =============================================================================
// Recording Analytics
// =============================================================================

/// Analytics sink that captures events synchronously for assertions.
pub struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
    fail_next: AtomicBool,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Default for RecordingAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAnalytics for RecordingAnalytics {
    async fn capture(&self, event: AnalyticsEvent) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("collector unreachable"));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

// =============================================================================
// Static User Store / Entitlements
// =============================================================================

/// Account directory seeded directly by tests.
pub struct StaticUserStore {
    users: Mutex<HashMap<UserId, User>>,
}

impl StaticUserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }
}

impl Default for StaticUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseUserStore for StaticUserStore {
    async fn find_active_user(&self, user_id: UserId) -> Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .get(&user_id)
            .filter(|user| user.is_active())
            .cloned())
    }
}

/// Grant table seeded directly by tests.
pub struct StaticEntitlements {
    grants: Mutex<HashMap<(UserId, String), FeatureGrant>>,
}

impl StaticEntitlements {
    pub fn new() -> Self {
        Self {
            grants: Mutex::new(HashMap::new()),
        }
    }

    pub fn grant(&self, user_id: UserId, feature: &str) {
        let grant = FeatureGrant {
            id: Uuid::new_v4(),
            user_id,
            feature: feature.to_string(),
            granted_at: Utc::now(),
            expires_at: None,
        };
        self.grants
            .lock()
            .unwrap()
            .insert((user_id, feature.to_string()), grant);
    }
}

impl Default for StaticEntitlements {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEntitlements for StaticEntitlements {
    async fn find_granted_feature(
        &self,
        feature: &str,
        user_id: UserId,
    ) -> Result<Option<FeatureGrant>> {
        let grants = self.grants.lock().unwrap();
        Ok(grants.get(&(user_id, feature.to_string())).cloned())
    }
}

// =============================================================================
// TestDependencies bundle
// =============================================================================

/// Everything a digest test needs, pre-wired.
pub struct TestDependencies {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryKeyedStore>,
    pub queue: Arc<RecordingJobQueue>,
    pub analytics: Arc<RecordingAnalytics>,
    pub users: Arc<StaticUserStore>,
    pub entitlements: Arc<StaticEntitlements>,
    pub jwt_service: Arc<JwtService>,
}

impl TestDependencies {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new());
        Self {
            store: Arc::new(MemoryKeyedStore::new(clock.clone())),
            queue: Arc::new(RecordingJobQueue::new()),
            analytics: Arc::new(RecordingAnalytics::new()),
            users: Arc::new(StaticUserStore::new()),
            entitlements: Arc::new(StaticEntitlements::new()),
            jwt_service: Arc::new(JwtService::new("test_secret", "test_issuer".to_string())),
            clock,
        }
    }

    /// Seed an active account with a feature grant and return a valid token
    /// for it.
    pub fn active_user_with_feature(&self, feature: &str) -> (UserId, String) {
        let user = User::test_active("Reader");
        let user_id = user.id;
        self.users.insert(user);
        self.entitlements.grant(user_id, feature);
        let token = self
            .jwt_service
            .create_token(user_id)
            .expect("test token creation");
        (user_id, token)
    }

    /// Seed an active account without any grants and return a token for it.
    pub fn active_user(&self) -> (UserId, String) {
        let user = User::test_active("Reader");
        let user_id = user.id;
        self.users.insert(user);
        let token = self
            .jwt_service
            .create_token(user_id)
            .expect("test token creation");
        (user_id, token)
    }

    /// Build a lifecycle controller over these doubles.
    pub fn lifecycle(&self, daily_limit: Option<u32>) -> DigestLifecycle {
        DigestLifecycle::new(
            self.jwt_service.clone(),
            self.users.clone(),
            self.entitlements.clone(),
            self.store.clone(),
            self.queue.clone(),
            self.clock.clone(),
            daily_limit,
        )
    }

    /// Build a feedback sink over these doubles.
    pub fn feedback(&self) -> FeedbackSink {
        FeedbackSink::new(
            self.jwt_service.clone(),
            self.users.clone(),
            self.entitlements.clone(),
            self.analytics.clone(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
