//! Server dependencies (using traits for testability)
//!
//! This module provides the central dependency container used by the domain
//! services, plus the Postgres-backed adapters for the account and
//! entitlement lookups. All external services sit behind trait abstractions
//! so tests can swap in the in-memory doubles.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::common::UserId;
use crate::domains::auth::models::User;
use crate::domains::auth::JwtService;
use crate::domains::entitlements::FeatureGrant;
use crate::kernel::{
    BaseAnalytics, BaseClock, BaseEntitlements, BaseJobQueue, BaseKeyedStore, BaseUserStore,
};

// =============================================================================
// Postgres adapters (implement the lookup traits)
// =============================================================================

/// Active-account lookup backed by the `users` table.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseUserStore for PgUserStore {
    async fn find_active_user(&self, user_id: UserId) -> Result<Option<User>> {
        User::find_active(user_id, &self.pool).await
    }
}

/// Feature-grant lookup backed by the `feature_grants` table.
pub struct PgEntitlements {
    pool: PgPool,
}

impl PgEntitlements {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseEntitlements for PgEntitlements {
    async fn find_granted_feature(
        &self,
        feature: &str,
        user_id: UserId,
    ) -> Result<Option<FeatureGrant>> {
        FeatureGrant::find_granted(feature, user_id, &self.pool).await
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to the domain services.
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    /// Cache store with expiry (job records, usage counters).
    pub keyed_store: Arc<dyn BaseKeyedStore>,
    /// Hand-off to the external digest workers.
    pub job_queue: Arc<dyn BaseJobQueue>,
    /// Fire-and-forget event capture.
    pub analytics: Arc<dyn BaseAnalytics>,
    pub users: Arc<dyn BaseUserStore>,
    pub entitlements: Arc<dyn BaseEntitlements>,
    pub clock: Arc<dyn BaseClock>,
    /// JWT service for token verification (and creation in tests).
    pub jwt_service: Arc<JwtService>,
    /// Optional daily cap on accepted digest submissions.
    pub digest_daily_limit: Option<u32>,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db_pool: PgPool,
        keyed_store: Arc<dyn BaseKeyedStore>,
        job_queue: Arc<dyn BaseJobQueue>,
        analytics: Arc<dyn BaseAnalytics>,
        users: Arc<dyn BaseUserStore>,
        entitlements: Arc<dyn BaseEntitlements>,
        clock: Arc<dyn BaseClock>,
        jwt_service: Arc<JwtService>,
        digest_daily_limit: Option<u32>,
    ) -> Self {
        Self {
            db_pool,
            keyed_store,
            job_queue,
            analytics,
            users,
            entitlements,
            clock,
            jwt_service,
            digest_daily_limit,
        }
    }
}
