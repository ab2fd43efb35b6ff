//! API Documentation
//!
//! Serves the OpenAPI document as JSON at /api/docs.

use axum::response::Json;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

use super::refine::{AgentInfo, AgentsResponse, RefineRequestBody, RefineResponse};

/// Prism API OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Prism API",
        version = "0.1.0",
        description = "Multi-perspective product-requirement refinement service.

## Overview
Prism refines an ambiguous requirement query through four specialist
analyzers (domain, UX/UI, technical, revenue) and a moderator, with
per-thread conversation memory driving follow-up routing."
    ),
    servers((url = "/", description = "Local server")),
    paths(
        crate::api::refine::refine_requirements,
        crate::api::refine::refine_requirements_stream,
        crate::api::refine::agents_info,
        crate::api::memory::get_thread_memory,
        crate::api::memory::search_thread_memory,
        crate::api::memory::clear_thread_memory,
        crate::api::memory::memory_stats,
    ),
    components(schemas(RefineRequestBody, RefineResponse, AgentInfo, AgentsResponse))
)]
pub struct ApiDoc;

/// Serve the OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create docs routes.
pub fn docs_routes() -> Router {
    Router::new().route("/api/docs", get(openapi_json))
}
