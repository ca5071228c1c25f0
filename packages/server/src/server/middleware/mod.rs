// HTTP middleware
pub mod auth_token;

pub use auth_token::*;
