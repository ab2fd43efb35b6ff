//! API layer for Prism
//!
//! Route modules:
//! - `refine`: batch + streaming refinement endpoints
//! - `memory`: thread memory inspection
//! - `health`: liveness and component checks
//! - `docs`: OpenAPI document

pub mod docs;
pub mod health;
pub mod memory;
pub mod refine;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use prism_core::Orchestrator;
use serde::Serialize;
use std::sync::Arc;

/// Shared state for the API handlers.
#[derive(Clone)]
pub struct RefineState {
    pub(crate) orchestrator: Arc<Orchestrator>,
}

impl RefineState {
    /// Create the API state.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Assemble the full API router.
pub fn api_router(state: RefineState) -> Router {
    Router::new()
        .merge(health::health_routes(state.clone()))
        .merge(docs::docs_routes())
        .merge(refine::refine_routes(state.clone()))
        .merge(memory::memory_routes(state))
}

/// Error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

/// API error with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: String,
    pub message: String,
}

impl ApiError {
    /// Map a stable engine error kind to its HTTP status.
    pub fn from_kind(kind: &str, message: impl Into<String>) -> Self {
        let status = match kind {
            "invalid_input" => StatusCode::BAD_REQUEST,
            "upstream_unavailable" => StatusCode::BAD_GATEWAY,
            "timeout" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::from_kind("invalid_input", message)
    }
}

impl From<prism_core::Error> for ApiError {
    fn from(error: prism_core::Error) -> Self {
        Self::from_kind(error.kind(), error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                kind: self.kind,
                message: self.message,
            }),
        )
            .into_response()
    }
}
