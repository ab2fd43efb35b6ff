//! Refinement API endpoints
//!
//! POST /api/refine-requirements         - Batch refinement
//! POST /api/refine-requirements/stream  - SSE streaming refinement
//! GET  /api/agents                      - Specialist directory

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use prism_core::{ConversationEntry, RefineEvent, RefineRequest, SpecialistRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use super::{ApiError, RefineState};

/// Request body for both refinement endpoints.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefineRequestBody {
    /// Free-form requirement query
    pub query: String,
    /// Thread to continue; omitted for a fresh thread
    pub thread_id: Option<String>,
    /// Optional focus: general, domain, ux_ui, technical or revenue
    pub focus_hint: Option<String>,
}

/// Batch refinement response.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefineResponse {
    /// Consolidated user-visible answer
    pub final_answer: String,
    /// End-to-end processing time
    pub processing_time_ms: u64,
    /// Classifier verdict
    pub query_kind: String,
    /// Whether the thread already had entries
    pub is_followup: bool,
    /// Outputs per invoked specialist role
    pub specialist_outputs: BTreeMap<String, String>,
    /// Consolidated moderator text, when a moderation pass ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator_output: Option<String>,
    /// Thread the entry was committed to
    pub thread_id: String,
    /// Identifier of the committed entry
    pub entry_id: String,
}

impl From<ConversationEntry> for RefineResponse {
    fn from(entry: ConversationEntry) -> Self {
        Self {
            final_answer: entry.final_answer,
            processing_time_ms: entry.processing_time_ms,
            query_kind: entry.query_kind.to_string(),
            is_followup: entry.is_followup,
            specialist_outputs: entry
                .specialist_outputs
                .into_iter()
                .map(|(role, text)| (role.as_str().to_string(), text))
                .collect(),
            moderator_output: entry.moderator_output,
            thread_id: entry.thread_id,
            entry_id: entry.entry_id,
        }
    }
}

fn build_request(body: RefineRequestBody) -> Result<RefineRequest, ApiError> {
    let mut request = RefineRequest::new(body.query);
    if let Some(thread_id) = body.thread_id {
        request = request.with_thread(thread_id);
    }
    if let Some(hint) = body.focus_hint {
        let hint = hint
            .parse()
            .map_err(|e: String| ApiError::invalid_input(e))?;
        request = request.with_focus_hint(hint);
    }
    Ok(request)
}

/// Refine a requirement query and return the consolidated result.
#[utoipa::path(
    post,
    path = "/api/refine-requirements",
    request_body = RefineRequestBody,
    responses(
        (status = 200, description = "Consolidated analysis", body = RefineResponse),
        (status = 400, description = "Empty query or malformed request"),
        (status = 502, description = "All analyzers failed"),
        (status = 504, description = "Request deadline exceeded"),
    )
)]
pub async fn refine_requirements(
    State(state): State<RefineState>,
    Json(body): Json<RefineRequestBody>,
) -> Result<Json<RefineResponse>, ApiError> {
    let request = build_request(body)?;
    let mut handle = state
        .orchestrator
        .run(request, CancellationToken::new());

    let mut entry = None;
    let mut error: Option<(String, String)> = None;
    while let Some(event) = handle.events.recv().await {
        match event {
            RefineEvent::Complete { entry: stored } => entry = Some(stored),
            RefineEvent::Error { kind, message } => error = Some((kind, message)),
            RefineEvent::Cancelled => {
                error = Some(("internal".to_string(), "run cancelled".to_string()))
            }
            _ => {}
        }
    }

    match (entry, error) {
        (Some(entry), _) => Ok(Json(entry.into())),
        (None, Some((kind, message))) => Err(ApiError::from_kind(&kind, message)),
        (None, None) => Err(ApiError::from_kind(
            "internal",
            "run ended without a terminal event",
        )),
    }
}

/// Stream the refinement as server-sent events.
///
/// One `data: <json>` record per orchestrator event; the final record is
/// `complete`, `error` or `cancelled`. Closing the connection cancels the
/// request.
#[utoipa::path(
    post,
    path = "/api/refine-requirements/stream",
    request_body = RefineRequestBody,
    responses(
        (status = 200, description = "Event stream"),
        (status = 400, description = "Empty query or malformed request"),
    )
)]
pub async fn refine_requirements_stream(
    State(state): State<RefineState>,
    Json(body): Json<RefineRequestBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let request = build_request(body)?;

    let cancel = CancellationToken::new();
    // Dropping the response stream (client disconnect) cancels the run
    let guard = cancel.clone().drop_guard();
    let handle = state.orchestrator.run(request, cancel);

    let stream = ReceiverStream::new(handle.events).map(move |event| {
        let _ = &guard;
        let data = serde_json::to_string(&event).unwrap_or_else(|_| {
            r#"{"type":"error","kind":"internal","message":"event serialization failed"}"#
                .to_string()
        });
        Ok(Event::default().data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// One specialist's directory record.
#[derive(Debug, Serialize, ToSchema)]
pub struct AgentInfo {
    /// Display name
    pub name: String,
    /// What this agent analyzes
    pub description: String,
    /// Expertise keywords
    pub expertise: Vec<String>,
}

/// Directory of the specialist roles and the moderator.
#[derive(Debug, Serialize, ToSchema)]
pub struct AgentsResponse {
    /// Agent id → record
    pub agents: BTreeMap<String, AgentInfo>,
}

fn agent_info(role: SpecialistRole) -> AgentInfo {
    match role {
        SpecialistRole::Domain => AgentInfo {
            name: "Domain Expert".to_string(),
            description: "Analyzes business logic, industry standards, compliance \
                          requirements, and domain-specific knowledge"
                .to_string(),
            expertise: ["Business Logic", "Industry Standards", "Compliance", "Market Analysis"]
                .map(String::from)
                .to_vec(),
        },
        SpecialistRole::UxUi => AgentInfo {
            name: "UX/UI Specialist".to_string(),
            description: "Analyzes user experience requirements, interface design, \
                          accessibility, and usability"
                .to_string(),
            expertise: ["User Experience", "Interface Design", "Accessibility", "Usability"]
                .map(String::from)
                .to_vec(),
        },
        SpecialistRole::Technical => AgentInfo {
            name: "Technical Architect".to_string(),
            description: "Analyzes technical architecture, system design, scalability, \
                          and implementation requirements"
                .to_string(),
            expertise: ["System Architecture", "Technology Stack", "Scalability", "Performance"]
                .map(String::from)
                .to_vec(),
        },
        SpecialistRole::Revenue => AgentInfo {
            name: "Revenue Model Analyst".to_string(),
            description: "Analyzes revenue models, monetization strategies, pricing, \
                          and financial sustainability"
                .to_string(),
            expertise: ["Revenue Models", "Monetization", "Pricing Strategies", "Business Models"]
                .map(String::from)
                .to_vec(),
        },
    }
}

/// Get information about the available agents.
#[utoipa::path(
    get,
    path = "/api/agents",
    responses((status = 200, description = "Agent directory", body = AgentsResponse))
)]
pub async fn agents_info() -> Json<AgentsResponse> {
    let mut agents = BTreeMap::new();
    for role in SpecialistRole::ALL {
        agents.insert(role.as_str().to_string(), agent_info(role));
    }
    agents.insert(
        "moderator".to_string(),
        AgentInfo {
            name: "Moderator".to_string(),
            description: "Aggregates specialist feedback and resolves conflicts to \
                          create unified requirements"
                .to_string(),
            expertise: ["Conflict Resolution", "Requirements Aggregation", "Priority Setting"]
                .map(String::from)
                .to_vec(),
        },
    );
    Json(AgentsResponse { agents })
}

/// Create refinement routes.
pub fn refine_routes(state: RefineState) -> Router {
    Router::new()
        .route("/api/refine-requirements", post(refine_requirements))
        .route(
            "/api/refine-requirements/stream",
            post(refine_requirements_stream),
        )
        .route("/api/agents", get(agents_info))
        .with_state(state)
}
