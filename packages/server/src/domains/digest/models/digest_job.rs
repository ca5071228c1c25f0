//! Digest job record and lifecycle states.
//!
//! One record per user lives in the cache store under `digest:<user_id>`.
//! The controller creates records in `Pending`; the worker fleet owns every
//! transition after that (`Running`, then `Succeeded` or `Failed`) and
//! writes result fields into the same record. Records disappear by TTL
//! expiry only - there is no delete path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::DigestJobId;

/// Lifecycle state of a digest job.
///
/// `Pending → Running → {Succeeded, Failed}`. Terminal states never
/// transition back; a fresh submission supersedes a terminal record with a
/// brand-new one rather than mutating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestJobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl DigestJobState {
    /// In-flight states block a concurrent submission.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, DigestJobState::Pending | DigestJobState::Running)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_in_flight()
    }
}

/// Parameters of a submission, immutable once the job is created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestRequest {
    /// Preferred narration voices, in priority order.
    pub voices: Option<Vec<String>>,
    pub language: Option<String>,
    /// Narration rate, e.g. "1.2".
    pub rate: Option<String>,
    /// Explicit source items; the worker picks candidates itself when unset.
    pub library_item_ids: Option<Vec<String>>,
    /// Recurrence descriptor passed through to the worker, e.g. "daily".
    pub schedule: Option<String>,
}

/// One chapter of a produced digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestChapter {
    pub title: String,
    pub id: String,
    pub url: String,
    pub word_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Synthesized speech asset for one digest section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechFile {
    pub id: String,
    pub audio_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_marks_url: Option<String>,
}

/// The per-user digest job record.
///
/// Result fields are populated by the worker and only meaningful once the
/// state is `Succeeded`; they serialize only when present so a pending
/// record stays small on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestJob {
    pub id: DigestJobId,
    pub state: DigestJobState,
    pub request: DigestRequest,
    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Rendered digest content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<DigestChapter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls_to_audio: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_files: Option<Vec<SpeechFile>>,
}

impl DigestJob {
    /// Fresh record in `Pending`, as created by the controller on an
    /// accepted submission.
    pub fn pending(id: DigestJobId, request: DigestRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            state: DigestJobState::Pending,
            request,
            created_at,
            title: None,
            description: None,
            byline: None,
            url: None,
            content: None,
            chapters: None,
            urls_to_audio: None,
            speech_files: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_and_running_are_in_flight() {
        assert!(DigestJobState::Pending.is_in_flight());
        assert!(DigestJobState::Running.is_in_flight());
        assert!(DigestJobState::Succeeded.is_terminal());
        assert!(DigestJobState::Failed.is_terminal());
    }

    #[test]
    fn test_pending_record_serializes_without_result_fields() {
        let job = DigestJob::pending(
            crate::common::DigestJobId::new(),
            DigestRequest {
                language: Some("en".to_string()),
                ..Default::default()
            },
            Utc::now(),
        );

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["state"], "pending");
        assert_eq!(value["request"]["language"], "en");
        assert!(value.get("title").is_none());
        assert!(value.get("chapters").is_none());
    }

    #[test]
    fn test_worker_record_roundtrip() {
        // The shape the worker writes back after a successful run
        let raw = serde_json::json!({
            "id": uuid::Uuid::new_v4(),
            "state": "succeeded",
            "request": { "language": "en" },
            "createdAt": "2025-03-10T12:00:00Z",
            "title": "Weekly Digest",
            "description": "What you saved this week",
            "chapters": [
                { "title": "Chapter 1", "id": "item-1", "url": "https://example.org/1", "wordCount": 900 }
            ],
            "urlsToAudio": ["https://cdn.example.org/digest.mp3"]
        });

        let job: DigestJob = serde_json::from_value(raw).unwrap();
        assert_eq!(job.state, DigestJobState::Succeeded);
        assert_eq!(job.title.as_deref(), Some("Weekly Digest"));
        let chapters = job.chapters.as_ref().unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].word_count, 900);

        let back = serde_json::to_value(&job).unwrap();
        assert_eq!(back["chapters"][0]["wordCount"], 900);
        assert_eq!(back["urlsToAudio"][0], "https://cdn.example.org/digest.mp3");
    }
}
