use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::UserId;

/// A feature grant row. Present-and-unexpired means enabled.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeatureGrant {
    pub id: Uuid,
    pub user_id: UserId,
    pub feature: String,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl FeatureGrant {
    /// Look up an unexpired grant of `feature` for `user_id`.
    pub async fn find_granted(
        feature: &str,
        user_id: UserId,
        pool: &PgPool,
    ) -> Result<Option<FeatureGrant>> {
        let grant = sqlx::query_as::<_, FeatureGrant>(
            r#"
            SELECT id, user_id, feature, granted_at, expires_at
            FROM feature_grants
            WHERE feature = $1
              AND user_id = $2
              AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(feature)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(grant)
    }
}
