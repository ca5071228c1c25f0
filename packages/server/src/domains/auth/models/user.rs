//! User account model.
//!
//! Accounts are provisioned by the identity service; this API only reads
//! them to answer "does this token belong to an active account".

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::common::UserId;

/// Account status value required for authorization.
pub const ACTIVE_STATUS: &str = "active";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_STATUS
    }

    /// Find an account by id, returning it only if active.
    pub async fn find_active(id: UserId, pool: &PgPool) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, status, created_at, updated_at
            FROM users
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(ACTIVE_STATUS)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Fresh active account for seeding test doubles.
    pub fn test_active(name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name: name.to_string(),
            status: ACTIVE_STATUS.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Fresh suspended account for seeding test doubles.
    pub fn test_suspended(name: &str) -> Self {
        Self {
            status: "suspended".to_string(),
            ..Self::test_active(name)
        }
    }
}
