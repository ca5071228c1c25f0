//! Entity marker types and ID aliases.

use super::id::Id;

/// Marker for user accounts.
pub struct User;

/// Marker for digest jobs.
pub struct DigestJob;

pub type UserId = Id<User>;
pub type DigestJobId = Id<DigestJob>;
