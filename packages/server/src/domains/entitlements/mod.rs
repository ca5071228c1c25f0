//! Entitlements domain - per-user feature grants.
//!
//! Grants are owned by the account/billing side of the platform; this API
//! treats them as read-only current truth with no caching.

pub mod grant;

pub use grant::FeatureGrant;

/// Feature gating access to digest generation.
pub const DIGEST_FEATURE: &str = "ai-digest";
