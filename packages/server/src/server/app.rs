//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::auth::JwtService;
use crate::domains::digest::{DigestLifecycle, FeedbackSink};
use crate::kernel::{
    BaseAnalytics, BaseKeyedStore, HttpAnalytics, NoopAnalytics, PgEntitlements, PgUserStore,
    PostgresJobQueue, ServerDeps, SystemClock,
};
use crate::server::middleware::auth_token_middleware;
use crate::server::routes::{
    create_digest_handler, digest_feedback_handler, digest_status_handler, health_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub server_deps: Arc<ServerDeps>,
    pub lifecycle: Arc<DigestLifecycle>,
    pub feedback: Arc<FeedbackSink>,
}

/// Build the Axum application router
///
/// The keyed store is passed in already connected so tests and tooling can
/// substitute an in-memory one; everything Postgres-backed is derived from
/// the pool here.
pub fn build_app(pool: PgPool, keyed_store: Arc<dyn BaseKeyedStore>, config: &Config) -> Router {
    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));

    let analytics: Arc<dyn BaseAnalytics> = match &config.analytics_endpoint {
        Some(endpoint) => Arc::new(HttpAnalytics::new(
            endpoint.clone(),
            config.analytics_api_key.clone(),
        )),
        None => Arc::new(NoopAnalytics),
    };

    let server_deps = Arc::new(ServerDeps::new(
        pool.clone(),
        keyed_store,
        Arc::new(PostgresJobQueue::new(pool.clone())),
        analytics,
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgEntitlements::new(pool.clone())),
        Arc::new(SystemClock),
        jwt_service,
        config.digest_daily_limit,
    ));

    let lifecycle = Arc::new(DigestLifecycle::from_deps(&server_deps));
    let feedback = Arc::new(FeedbackSink::from_deps(&server_deps));

    let app_state = AppState {
        db_pool: pool,
        server_deps,
        lifecycle,
        feedback,
    };

    // CORS configuration - the apps call from app webviews and the reader
    // extension, so allow any origin
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    // Rate limiting configuration
    // Digest endpoints: 10 requests per second per IP with burst of 20
    let rate_limit_config = std::sync::Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .use_headers() // Extract IP from X-Forwarded-For header
            .finish()
            .expect("Rate limiter configuration is valid and should never fail"),
    );

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config,
    };

    // Digest endpoints, rate limited as a group
    let digest_router = Router::new()
        .route(
            "/v1",
            post(create_digest_handler).get(digest_status_handler),
        )
        .route("/v1/feedback", post(digest_feedback_handler))
        .layer(rate_limit_layer);

    Router::new()
        .nest("/digest", digest_router)
        // Health check (no rate limit)
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(auth_token_middleware))
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
