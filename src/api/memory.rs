//! Memory inspection API endpoints
//!
//! GET    /memory/stats               - Aggregate store statistics
//! GET    /memory/:thread_id          - Thread history with stats
//! GET    /memory/:thread_id/search   - Substring search within a thread
//! DELETE /memory/:thread_id          - Clear a thread

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use prism_core::{ConversationEntry, StoreStats};
use serde::{Deserialize, Serialize};

use super::{ApiError, RefineState};

const DEFAULT_LIMIT: usize = 50;

/// Query parameters carrying an optional limit.
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    /// Maximum number of entries to return
    pub limit: Option<usize>,
}

/// Query parameters for thread search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Substring to match against queries and answers
    pub q: String,
    /// Maximum number of results to return
    pub limit: Option<usize>,
}

/// Thread history plus store statistics.
#[derive(Debug, Serialize)]
pub struct ThreadMemoryResponse {
    pub entries: Vec<ConversationEntry>,
    pub stats: StoreStats,
}

/// Search results within a thread.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<ConversationEntry>,
}

/// Result of clearing a thread.
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
    pub count: u64,
}

/// Get conversation history for a thread.
#[utoipa::path(
    get,
    path = "/memory/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread identifier"),
        ("limit" = Option<usize>, Query, description = "Maximum entries (default 50)"),
    ),
    responses((status = 200, description = "Thread history with store statistics"))
)]
pub async fn get_thread_memory(
    State(state): State<RefineState>,
    Path(thread_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ThreadMemoryResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let entries = state.orchestrator.history(&thread_id, limit).await?;
    let stats = state.orchestrator.stats().await?;
    Ok(Json(ThreadMemoryResponse { entries, stats }))
}

/// Search conversation history within a thread.
#[utoipa::path(
    get,
    path = "/memory/{thread_id}/search",
    params(
        ("thread_id" = String, Path, description = "Thread identifier"),
        ("q" = String, Query, description = "Substring to search for"),
        ("limit" = Option<usize>, Query, description = "Maximum results (default 50)"),
    ),
    responses((status = 200, description = "Matching entries, most recent first"))
)]
pub async fn search_thread_memory(
    State(state): State<RefineState>,
    Path(thread_id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let results = state
        .orchestrator
        .search(&thread_id, &query.q, limit)
        .await?;
    Ok(Json(SearchResponse { results }))
}

/// Clear conversation history for a thread.
#[utoipa::path(
    delete,
    path = "/memory/{thread_id}",
    params(("thread_id" = String, Path, description = "Thread identifier")),
    responses((status = 200, description = "Number of entries removed"))
)]
pub async fn clear_thread_memory(
    State(state): State<RefineState>,
    Path(thread_id): Path<String>,
) -> Result<Json<ClearResponse>, ApiError> {
    let count = state.orchestrator.clear(&thread_id).await?;
    Ok(Json(ClearResponse {
        cleared: true,
        count,
    }))
}

/// Aggregate memory statistics.
#[utoipa::path(
    get,
    path = "/memory/stats",
    responses((status = 200, description = "Store statistics"))
)]
pub async fn memory_stats(
    State(state): State<RefineState>,
) -> Result<Json<StoreStats>, ApiError> {
    Ok(Json(state.orchestrator.stats().await?))
}

/// Create memory routes.
pub fn memory_routes(state: RefineState) -> Router {
    Router::new()
        .route("/memory/stats", get(memory_stats))
        .route(
            "/memory/:thread_id",
            get(get_thread_memory).delete(clear_thread_memory),
        )
        .route("/memory/:thread_id/search", get(search_thread_memory))
        .with_state(state)
}
