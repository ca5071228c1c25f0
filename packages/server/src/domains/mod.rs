// Domain modules

pub mod auth;
pub mod digest;
pub mod entitlements;
