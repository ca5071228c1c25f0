use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::kernel::BaseKeyedStore;
use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    database: DependencyHealth,
    cache: DependencyHealth,
    connection_pool: ConnectionPoolHealth,
}

#[derive(Serialize)]
pub struct DependencyHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl DependencyHealth {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(message),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Serialize)]
pub struct ConnectionPoolHealth {
    size: u32,
    idle_connections: usize,
    max_connections: u32,
}

/// Health check endpoint
///
/// Checks:
/// - Database connectivity and responsiveness
/// - Cache store responsiveness
/// - Connection pool utilization
///
/// Returns 200 OK if all systems are healthy, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let db_health = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        sqlx::query("SELECT 1").execute(&state.db_pool),
    )
    .await
    {
        Ok(Ok(_)) => DependencyHealth::ok(),
        Ok(Err(e)) => DependencyHealth::error(format!("Query failed: {}", e)),
        Err(_) => DependencyHealth::error("Query timeout (>5s)".to_string()),
    };

    let cache_health = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state.server_deps.keyed_store.get("health:probe"),
    )
    .await
    {
        Ok(Ok(_)) => DependencyHealth::ok(),
        Ok(Err(e)) => DependencyHealth::error(format!("Read failed: {}", e)),
        Err(_) => DependencyHealth::error("Read timeout (>5s)".to_string()),
    };

    let pool_options = state.db_pool.options();
    let pool_health = ConnectionPoolHealth {
        size: state.db_pool.size(),
        idle_connections: state.db_pool.num_idle(),
        max_connections: pool_options.get_max_connections(),
    };

    let is_healthy = db_health.is_ok() && cache_health.is_ok();

    let overall_status = if is_healthy { "healthy" } else { "unhealthy" };

    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: overall_status.to_string(),
            database: db_health,
            cache: cache_health,
            connection_pool: pool_health,
        }),
    )
}
