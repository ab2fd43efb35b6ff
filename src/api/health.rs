//! Health check endpoints
//!
//! Provides:
//! - `/health` — simple status + version (for load balancers)
//! - `/health/detailed` — per-component status (store, analyzer)

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use super::RefineState;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health response with per-component checks
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub checks: HealthChecks,
}

/// All component health checks
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub store: ComponentHealth,
    pub analyzer: ComponentHealth,
}

/// Individual component health status
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn healthy_with_details(details: serde_json::Value) -> Self {
        Self {
            status: "healthy",
            error: None,
            details: Some(details),
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy",
            error: Some(error),
            details: None,
        }
    }
}

/// Simple health check (for load balancers)
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Detailed health check with component statuses
async fn detailed_health_check(
    State(state): State<RefineState>,
) -> Json<DetailedHealthResponse> {
    let store_health = match state.orchestrator.stats().await {
        Ok(stats) => ComponentHealth::healthy_with_details(serde_json::json!({
            "total_entries": stats.total_entries,
            "thread_count": stats.thread_count,
        })),
        Err(e) => ComponentHealth::unhealthy(e.to_string()),
    };

    let analyzer_health = ComponentHealth::healthy_with_details(serde_json::json!({
        "provider": state.orchestrator.analyzer_name(),
        "active_runs": state.orchestrator.active_run_count(),
    }));

    let overall = if store_health.status == "healthy" {
        "ok"
    } else {
        "degraded"
    };

    Json(DetailedHealthResponse {
        status: overall,
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            store: store_health,
            analyzer: analyzer_health,
        },
    })
}

/// Create health routes.
pub fn health_routes(state: RefineState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .with_state(state)
}
