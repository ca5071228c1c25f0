// Readfold - API Core
//
// This crate provides the backend API for the Readfold read-it-later apps.
// It owns the digest job lifecycle: submission, idempotent re-submission,
// status polling against the cache store, daily usage accounting, and
// feedback collection. Digest content itself is produced by an external
// worker fleet that consumes the job queue.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
