//! Digest lifecycle controller.
//!
//! Single authority over submission and status retrieval. Submission runs a
//! strict check order - identity, entitlement, in-flight guard, optional
//! quota - and each failing check short-circuits before any side effect.
//! Status polling is a pure read against the cache store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info};

use super::models::{DigestJob, DigestJobState, DigestRequest};
use super::usage::UsageLedger;
use crate::common::{ApiError, DigestJobId, UserId};
use crate::domains::auth::{Authorizer, JwtService};
use crate::domains::entitlements::DIGEST_FEATURE;
use crate::kernel::{BaseClock, BaseEntitlements, BaseJobQueue, BaseKeyedStore, BaseUserStore};

/// Queue job type consumed by the digest workers.
pub const CREATE_DIGEST_JOB: &str = "create_digest";

/// Ledger action name for the optional submission quota.
pub const CREATE_DIGEST_ACTION: &str = "create_digest";

/// Records expire after this window regardless of state. A Running record
/// whose worker died simply ages out, which is what re-opens submission.
const JOB_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

fn job_key(user_id: UserId) -> String {
    format!("digest:{}", user_id)
}

/// Outcome of a submission attempt that passed authorization.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// A new job was created and handed to the workers.
    Accepted(DigestJob),
    /// An earlier job is still in flight; its record is returned unchanged
    /// and nothing was enqueued.
    AlreadyRunning(DigestJob),
}

/// Outcome of a status poll that passed authorization.
#[derive(Debug)]
pub enum StatusOutcome {
    /// The worker holds the job - only id and state are exposed, never the
    /// (absent) result payload.
    Running {
        job_id: DigestJobId,
        state: DigestJobState,
    },
    /// The full stored record (pending, succeeded, or failed).
    Record(Box<DigestJob>),
}

pub struct DigestLifecycle {
    authorizer: Authorizer,
    store: Arc<dyn BaseKeyedStore>,
    queue: Arc<dyn BaseJobQueue>,
    ledger: UsageLedger,
    clock: Arc<dyn BaseClock>,
    daily_limit: Option<u32>,
}

impl DigestLifecycle {
    pub fn new(
        jwt_service: Arc<JwtService>,
        users: Arc<dyn BaseUserStore>,
        entitlements: Arc<dyn BaseEntitlements>,
        store: Arc<dyn BaseKeyedStore>,
        queue: Arc<dyn BaseJobQueue>,
        clock: Arc<dyn BaseClock>,
        daily_limit: Option<u32>,
    ) -> Self {
        Self {
            authorizer: Authorizer::new(jwt_service, users, entitlements),
            ledger: UsageLedger::new(store.clone(), clock.clone()),
            store,
            queue,
            clock,
            daily_limit,
        }
    }

    /// Build a controller from the server dependency container.
    pub fn from_deps(deps: &crate::kernel::ServerDeps) -> Self {
        Self::new(
            deps.jwt_service.clone(),
            deps.users.clone(),
            deps.entitlements.clone(),
            deps.keyed_store.clone(),
            deps.job_queue.clone(),
            deps.clock.clone(),
            deps.digest_daily_limit,
        )
    }

    async fn read_job(&self, key: &str) -> Result<Option<DigestJob>, ApiError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        let job = serde_json::from_str(&raw)
            .with_context(|| format!("corrupt digest record under {key}"))?;
        Ok(Some(job))
    }

    /// Submit a digest request for the authenticated caller.
    pub async fn submit(
        &self,
        token: Option<&str>,
        request: DigestRequest,
    ) -> Result<SubmitOutcome, ApiError> {
        let user_id = self.authorizer.authorize(token, DIGEST_FEATURE).await?;

        let key = job_key(user_id);

        // Idempotency guard: an in-flight job absorbs the submission.
        // Terminal records are superseded below, not resumed.
        if let Some(existing) = self.read_job(&key).await? {
            if existing.state.is_in_flight() {
                debug!(
                    user_id = %user_id,
                    job_id = %existing.id,
                    state = ?existing.state,
                    "Digest job already in flight"
                );
                return Ok(SubmitOutcome::AlreadyRunning(existing));
            }
        }

        if let Some(limit) = self.daily_limit {
            if !self
                .ledger
                .check_quota(user_id, CREATE_DIGEST_ACTION, limit)
                .await?
            {
                debug!(user_id = %user_id, limit, "Daily digest limit reached");
                return Err(ApiError::RateLimited);
            }
        }

        let job = DigestJob::pending(DigestJobId::new(), request, self.clock.now());

        // Enqueue before persisting. If the store write below fails, the
        // orphaned queue entry is wasted worker time; the reverse ordering
        // would leave a Pending record no worker will ever service.
        let payload = serde_json::json!({
            "userId": user_id,
            "jobId": job.id,
            "request": job.request,
        });
        self.queue.enqueue(CREATE_DIGEST_JOB, payload, None).await?;

        let serialized = serde_json::to_string(&job).context("serialize digest record")?;
        self.store.set(&key, &serialized, JOB_RETENTION).await?;

        // The submission is confirmed only once the record is durable
        if self.daily_limit.is_some() {
            self.ledger
                .record_usage(user_id, CREATE_DIGEST_ACTION)
                .await?;
        }

        info!(user_id = %user_id, job_id = %job.id, "Digest job accepted");
        Ok(SubmitOutcome::Accepted(job))
    }

    /// Poll the caller's current job. Pure read, no side effects.
    pub async fn status(&self, token: Option<&str>) -> Result<StatusOutcome, ApiError> {
        let user_id = self.authorizer.authorize(token, DIGEST_FEATURE).await?;

        let job = self
            .read_job(&job_key(user_id))
            .await?
            .ok_or(ApiError::NotFound)?;

        if job.state == DigestJobState::Running {
            return Ok(StatusOutcome::Running {
                job_id: job.id,
                state: job.state,
            });
        }

        Ok(StatusOutcome::Record(Box::new(job)))
    }
}
