//! Digest endpoints.
//!
//! POST /digest/v1          - submit a generation request
//! GET  /digest/v1          - poll the caller's current job
//! POST /digest/v1/feedback - submit ratings for a produced digest
//!
//! Auth: bearer header or `auth` cookie (see the auth_token middleware).
//! Status codes: 201 new job, 202 job already in flight, 200 status/record,
//! plus the 4xx taxonomy from `ApiError`.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::common::{ApiError, DigestJobId};
use crate::domains::digest::{DigestJobState, DigestRequest, StatusOutcome, SubmitOutcome};
use crate::server::app::AppState;
use crate::server::middleware::AuthToken;

/// Partial body returned while the worker holds the job.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunningStatusBody {
    job_id: DigestJobId,
    state: DigestJobState,
}

fn token_of(token: &Option<Extension<AuthToken>>) -> Option<&str> {
    token.as_ref().map(|ext| ext.0 .0.as_str())
}

/// POST /digest/v1
pub async fn create_digest_handler(
    Extension(state): Extension<AppState>,
    token: Option<Extension<AuthToken>>,
    Json(request): Json<DigestRequest>,
) -> Result<Response, ApiError> {
    match state.lifecycle.submit(token_of(&token), request).await? {
        SubmitOutcome::Accepted(job) => Ok((StatusCode::CREATED, Json(job)).into_response()),
        SubmitOutcome::AlreadyRunning(job) => Ok((StatusCode::ACCEPTED, Json(job)).into_response()),
    }
}

/// GET /digest/v1
pub async fn digest_status_handler(
    Extension(state): Extension<AppState>,
    token: Option<Extension<AuthToken>>,
) -> Result<Response, ApiError> {
    match state.lifecycle.status(token_of(&token)).await? {
        StatusOutcome::Running { job_id, state } => {
            Ok(Json(RunningStatusBody { job_id, state }).into_response())
        }
        StatusOutcome::Record(job) => Ok(Json(*job).into_response()),
    }
}

/// POST /digest/v1/feedback
pub async fn digest_feedback_handler(
    Extension(state): Extension<AppState>,
    token: Option<Extension<AuthToken>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    state.feedback.submit(token_of(&token), payload).await?;
    Ok(Json(serde_json::json!({ "success": true })).into_response())
}
