//! Auth domain - token verification and account resolution.

pub mod authorizer;
pub mod jwt;
pub mod models;

pub use authorizer::Authorizer;
pub use jwt::{Claims, JwtService};
