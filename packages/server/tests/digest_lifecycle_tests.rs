//! Digest lifecycle integration tests.
//!
//! Drives the controller through the in-memory kernel doubles, playing the
//! worker's part by editing the stored record the way the worker fleet does
//! in production (it owns every transition after Pending).

use chrono::Duration as ChronoDuration;
use serde_json::Value;
use server_core::common::{ApiError, UserId};
use server_core::domains::digest::{DigestRequest, StatusOutcome, SubmitOutcome};
use server_core::domains::entitlements::DIGEST_FEATURE;
use server_core::kernel::{BaseKeyedStore, TestDependencies};

fn english_request() -> DigestRequest {
    DigestRequest {
        language: Some("en".to_string()),
        ..Default::default()
    }
}

/// Rewrite the stored record the way the worker does: read, mutate, write
/// back under the same key.
async fn worker_writes(deps: &TestDependencies, user_id: UserId, mutate: impl FnOnce(&mut Value)) {
    let key = format!("digest:{}", user_id);
    let raw = deps
        .store
        .get(&key)
        .await
        .unwrap()
        .expect("no record for worker to update");
    let mut record: Value = serde_json::from_str(&raw).unwrap();
    mutate(&mut record);
    deps.store
        .set(&key, &record.to_string(), std::time::Duration::from_secs(7 * 24 * 3600))
        .await
        .unwrap();
}

#[tokio::test]
async fn submit_then_status_returns_the_same_pending_job() {
    let deps = TestDependencies::new();
    let (_user_id, token) = deps.active_user_with_feature(DIGEST_FEATURE);
    let lifecycle = deps.lifecycle(None);

    let SubmitOutcome::Accepted(job) = lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap()
    else {
        panic!("expected a new job");
    };

    let StatusOutcome::Record(polled) = lifecycle.status(Some(&token)).await.unwrap() else {
        panic!("expected the full record");
    };
    assert_eq!(polled.id, job.id);
    assert!(polled.state.is_in_flight());
    assert_eq!(polled.request.language.as_deref(), Some("en"));
}

#[tokio::test]
async fn second_submit_returns_the_same_job_and_enqueues_once() {
    let deps = TestDependencies::new();
    let (_user_id, token) = deps.active_user_with_feature(DIGEST_FEATURE);
    let lifecycle = deps.lifecycle(None);

    let SubmitOutcome::Accepted(first) = lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap()
    else {
        panic!("expected a new job");
    };

    let SubmitOutcome::AlreadyRunning(second) = lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap()
    else {
        panic!("expected the in-flight guard to absorb the resubmission");
    };

    assert_eq!(first.id, second.id);
    assert_eq!(deps.queue.enqueue_count(), 1);

    let calls = deps.queue.calls();
    assert_eq!(calls[0].job_type, "create_digest");
    assert!(calls[0].run_at.is_none());
    assert_eq!(calls[0].payload["request"]["language"], "en");
}

#[tokio::test]
async fn running_jobs_block_submission_too() {
    let deps = TestDependencies::new();
    let (user_id, token) = deps.active_user_with_feature(DIGEST_FEATURE);
    let lifecycle = deps.lifecycle(None);

    let SubmitOutcome::Accepted(first) = lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap()
    else {
        panic!("expected a new job");
    };

    worker_writes(&deps, user_id, |record| {
        record["state"] = Value::from("running");
    })
    .await;

    let outcome = lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        SubmitOutcome::AlreadyRunning(job) if job.id == first.id
    ));
    assert_eq!(deps.queue.enqueue_count(), 1);
}

#[tokio::test]
async fn running_status_exposes_only_id_and_state() {
    let deps = TestDependencies::new();
    let (user_id, token) = deps.active_user_with_feature(DIGEST_FEATURE);
    let lifecycle = deps.lifecycle(None);

    let SubmitOutcome::Accepted(job) = lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap()
    else {
        panic!("expected a new job");
    };

    worker_writes(&deps, user_id, |record| {
        record["state"] = Value::from("running");
    })
    .await;

    match lifecycle.status(Some(&token)).await.unwrap() {
        StatusOutcome::Running { job_id, state } => {
            assert_eq!(job_id, job.id);
            assert!(state.is_in_flight());
        }
        other => panic!("expected the partial running status, got {:?}", other),
    }
}

#[tokio::test]
async fn succeeded_status_returns_the_worker_record_unchanged() {
    let deps = TestDependencies::new();
    let (user_id, token) = deps.active_user_with_feature(DIGEST_FEATURE);
    let lifecycle = deps.lifecycle(None);

    lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap();

    worker_writes(&deps, user_id, |record| {
        record["state"] = Value::from("succeeded");
        record["title"] = Value::from("Weekly Digest");
        record["chapters"] = serde_json::json!([
            { "title": "Chapter 1", "id": "item-1", "url": "https://example.org/1", "wordCount": 900 },
            { "title": "Chapter 2", "id": "item-2", "url": "https://example.org/2", "wordCount": 450 },
        ]);
        record["urlsToAudio"] = serde_json::json!(["https://cdn.example.org/digest.mp3"]);
    })
    .await;

    let StatusOutcome::Record(job) = lifecycle.status(Some(&token)).await.unwrap() else {
        panic!("expected the full record");
    };
    assert_eq!(job.title.as_deref(), Some("Weekly Digest"));
    assert_eq!(job.chapters.as_ref().unwrap().len(), 2);
    assert_eq!(
        job.urls_to_audio.as_ref().unwrap()[0],
        "https://cdn.example.org/digest.mp3"
    );
}

#[tokio::test]
async fn a_new_submission_supersedes_a_terminal_record() {
    let deps = TestDependencies::new();
    let (user_id, token) = deps.active_user_with_feature(DIGEST_FEATURE);
    let lifecycle = deps.lifecycle(None);

    let SubmitOutcome::Accepted(first) = lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap()
    else {
        panic!("expected a new job");
    };

    worker_writes(&deps, user_id, |record| {
        record["state"] = Value::from("failed");
    })
    .await;

    let SubmitOutcome::Accepted(second) = lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap()
    else {
        panic!("expected a fresh job over the failed record");
    };

    assert_ne!(first.id, second.id);
    assert_eq!(deps.queue.enqueue_count(), 2);
}

#[tokio::test]
async fn records_expire_after_the_retention_window() {
    let deps = TestDependencies::new();
    let (_user_id, token) = deps.active_user_with_feature(DIGEST_FEATURE);
    let lifecycle = deps.lifecycle(None);

    lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap();

    deps.clock.advance(ChronoDuration::days(7) + ChronoDuration::hours(1));

    let result = lifecycle.status(Some(&token)).await;
    assert!(matches!(result, Err(ApiError::NotFound)));

    // Expiry of a stuck job is the recovery path: submission re-opens
    let outcome = lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Accepted(_)));
    assert_eq!(deps.queue.enqueue_count(), 2);
}

#[tokio::test]
async fn missing_entitlement_means_no_record_and_no_enqueue() {
    let deps = TestDependencies::new();
    let (_user_id, token) = deps.active_user();
    let lifecycle = deps.lifecycle(None);

    let result = lifecycle.submit(Some(&token), english_request()).await;
    assert!(matches!(result, Err(ApiError::Forbidden)));
    assert_eq!(deps.queue.enqueue_count(), 0);

    let result = lifecycle.status(Some(&token)).await;
    assert!(matches!(result, Err(ApiError::Forbidden)));
}

#[tokio::test]
async fn missing_or_bogus_tokens_are_unauthorized() {
    let deps = TestDependencies::new();
    let lifecycle = deps.lifecycle(None);

    let result = lifecycle.submit(None, english_request()).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));

    let result = lifecycle
        .submit(Some("not-a-token"), english_request())
        .await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert_eq!(deps.queue.enqueue_count(), 0);
}

#[tokio::test]
async fn suspended_accounts_are_unauthorized() {
    let deps = TestDependencies::new();
    let lifecycle = deps.lifecycle(None);

    let user = server_core::domains::auth::models::User::test_suspended("Reader");
    let user_id = user.id;
    deps.users.insert(user);
    deps.entitlements.grant(user_id, DIGEST_FEATURE);
    let token = deps.jwt_service.create_token(user_id).unwrap();

    let result = lifecycle.submit(Some(&token), english_request()).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert_eq!(deps.queue.enqueue_count(), 0);
}

#[tokio::test]
async fn tokens_for_unknown_accounts_are_unauthorized() {
    let deps = TestDependencies::new();
    let lifecycle = deps.lifecycle(None);

    // Valid signature, but no account behind the id
    let token = deps.jwt_service.create_token(UserId::new()).unwrap();

    let result = lifecycle.submit(Some(&token), english_request()).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
}

#[tokio::test]
async fn enqueue_failure_leaves_no_record_behind() {
    let deps = TestDependencies::new();
    let (_user_id, token) = deps.active_user_with_feature(DIGEST_FEATURE);
    let lifecycle = deps.lifecycle(None);

    deps.queue.fail_next();
    let result = lifecycle.submit(Some(&token), english_request()).await;
    assert!(matches!(result, Err(ApiError::Internal(_))));

    // No half-written Pending record the workers will never service
    let result = lifecycle.status(Some(&token)).await;
    assert!(matches!(result, Err(ApiError::NotFound)));
}

#[tokio::test]
async fn daily_limit_gates_submission_when_configured() {
    let deps = TestDependencies::new();
    let (user_id, token) = deps.active_user_with_feature(DIGEST_FEATURE);
    let lifecycle = deps.lifecycle(Some(2));

    for _ in 0..2 {
        let outcome = lifecycle
            .submit(Some(&token), english_request())
            .await
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::Accepted(_)));

        worker_writes(&deps, user_id, |record| {
            record["state"] = Value::from("succeeded");
        })
        .await;
    }

    let result = lifecycle.submit(Some(&token), english_request()).await;
    assert!(matches!(result, Err(ApiError::RateLimited)));
    assert_eq!(deps.queue.enqueue_count(), 2);

    // A new day re-opens the gate
    deps.clock.advance(ChronoDuration::days(1));
    let outcome = lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Accepted(_)));
}

#[tokio::test]
async fn failed_submissions_do_not_consume_quota() {
    let deps = TestDependencies::new();
    let (_user_id, token) = deps.active_user_with_feature(DIGEST_FEATURE);
    let lifecycle = deps.lifecycle(Some(1));

    deps.queue.fail_next();
    let result = lifecycle.submit(Some(&token), english_request()).await;
    assert!(matches!(result, Err(ApiError::Internal(_))));

    // The failed attempt did not count against the limit of one
    let outcome = lifecycle
        .submit(Some(&token), english_request())
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Accepted(_)));
}
