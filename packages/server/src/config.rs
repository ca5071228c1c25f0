use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub analytics_endpoint: Option<String>,
    pub analytics_api_key: Option<String>,
    /// Optional daily cap on accepted digest submissions per user.
    /// Unset means submissions are not quota-gated.
    pub digest_daily_limit: Option<u32>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "readfold-api".to_string()),
            analytics_endpoint: env::var("ANALYTICS_ENDPOINT").ok(),
            analytics_api_key: env::var("ANALYTICS_API_KEY").ok(),
            digest_daily_limit: match env::var("DIGEST_DAILY_LIMIT") {
                Ok(raw) => Some(
                    raw.parse()
                        .context("DIGEST_DAILY_LIMIT must be a valid number")?,
                ),
                Err(_) => None,
            },
        })
    }
}
