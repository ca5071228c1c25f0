//! Digest domain - the asynchronous digest job lifecycle.
//!
//! Submission and polling live in [`lifecycle`], daily quota accounting in
//! [`usage`], and rating collection in [`feedback`]. The content of a digest
//! is produced by the external worker fleet; this domain owns the
//! request/response/state lifecycle around it.

pub mod feedback;
pub mod lifecycle;
pub mod models;
pub mod usage;

pub use feedback::FeedbackSink;
pub use lifecycle::{DigestLifecycle, StatusOutcome, SubmitOutcome};
pub use models::{DigestJob, DigestJobState, DigestRequest};
pub use usage::UsageLedger;
