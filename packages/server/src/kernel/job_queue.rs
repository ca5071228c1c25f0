//! PostgreSQL-backed job queue.
//!
//! The API side of the queue is write-only: accepted digest submissions are
//! inserted as `pending` rows and the external worker fleet does the rest
//! (claiming, retries, terminal status). Queue rows reference the digest job
//! id so a worker crash can be traced back to the stored record it orphaned.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::traits::BaseJobQueue;

/// A row in the `jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueuedJob {
    pub id: Uuid,
    pub status: String,
    pub job_type: String,
    pub args: serde_json::Value,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub max_retries: i32,
    pub retry_count: i32,
    pub priority: i32,
    pub reference_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueuedJob {
    /// Create a new job row, pending immediately unless `run_at` is given.
    pub fn new(job_type: String, args: serde_json::Value, run_at: Option<DateTime<Utc>>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: "pending".to_string(),
            job_type,
            args,
            next_run_at: Some(run_at.unwrap_or(now)),
            last_run_at: None,
            max_retries: 3,
            retry_count: 0,
            priority: 0,
            reference_id: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Insert the job into the database.
    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        let job = sqlx::query_as::<_, QueuedJob>(
            r#"
            INSERT INTO jobs (
                id, status, job_type, args, next_run_at, last_run_at,
                max_retries, retry_count, priority, reference_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(self.id)
        .bind(&self.status)
        .bind(&self.job_type)
        .bind(&self.args)
        .bind(self.next_run_at)
        .bind(self.last_run_at)
        .bind(self.max_retries)
        .bind(self.retry_count)
        .bind(self.priority)
        .bind(self.reference_id)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await?;

        Ok(job)
    }
}

/// [`BaseJobQueue`] implementation writing to the `jobs` table.
pub struct PostgresJobQueue {
    db: PgPool,
}

impl PostgresJobQueue {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BaseJobQueue for PostgresJobQueue {
    async fn enqueue(
        &self,
        job_type: &str,
        payload: serde_json::Value,
        run_at: Option<DateTime<Utc>>,
    ) -> Result<Uuid> {
        let job = QueuedJob::new(job_type.to_string(), payload, run_at);

        debug!(
            job_id = %job.id,
            job_type = %job_type,
            run_at = ?run_at,
            "Enqueueing job"
        );

        let inserted = job.insert(&self.db).await?;
        Ok(inserted.id)
    }
}
