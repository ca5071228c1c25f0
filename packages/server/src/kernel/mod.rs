//! Kernel module - server infrastructure and dependencies.

pub mod analytics;
pub mod clock;
pub mod deps;
pub mod job_queue;
pub mod redis_store;
pub mod test_dependencies;
pub mod traits;

pub use analytics::{AnalyticsEvent, HttpAnalytics, NoopAnalytics};
pub use clock::SystemClock;
pub use deps::{PgEntitlements, PgUserStore, ServerDeps};
pub use job_queue::{PostgresJobQueue, QueuedJob};
pub use redis_store::RedisKeyedStore;
pub use test_dependencies::TestDependencies;
pub use traits::*;
