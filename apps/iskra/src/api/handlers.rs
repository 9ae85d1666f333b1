//! # API Endpoint Handlers

use super::{
    AppState,
    types::{
        ContextEntry, ContextResponse, ErrorResponse, HealthResponse, ResetRequest,
        ResetResponse, SessionStatusResponse, TraceResponse, TurnRequest, TurnResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use iskra_core::{NodeId, primitives::DEFAULT_CONTEXT_LIMIT};
use serde::Deserialize;

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message)),
    )
        .into_response()
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// TURN HANDLER
// =============================================================================

/// Process one user turn.
pub async fn turn_handler(
    State(state): State<AppState>,
    Json(request): Json<TurnRequest>,
) -> Response {
    if let Err(reason) = request.validate() {
        return bad_request(reason);
    }
    let micro = request.to_micro();
    match state
        .engine
        .process_turn(&request.session_key, &request.text, micro)
    {
        Ok(outcome) => {
            let response = TurnResponse::from(outcome);
            tracing::info!(
                session = %request.session_key,
                facet = %response.facet,
                phase = %response.phase,
                "turn processed"
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => bad_request(e.to_string()),
    }
}

// =============================================================================
// SESSION STATUS HANDLER
// =============================================================================

/// Current phase, vitals, and graph size for one session.
pub async fn session_status_handler(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
) -> Response {
    match state.engine.session_state(&session_key) {
        Ok((metrics, phase, node_count)) => (
            StatusCode::OK,
            Json(SessionStatusResponse {
                phase: phase.name().to_string(),
                metrics,
                node_count,
            }),
        )
            .into_response(),
        Err(e) => bad_request(e.to_string()),
    }
}

// =============================================================================
// RESET HANDLER
// =============================================================================

/// Forget a session entirely.
pub async fn reset_handler(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Response {
    match state.engine.reset_session(&request.session_key) {
        Ok(()) => {
            tracing::info!(session = %request.session_key, "session reset");
            (StatusCode::OK, Json(ResetResponse { reset: true })).into_response()
        }
        Err(e) => bad_request(e.to_string()),
    }
}

// =============================================================================
// TRACE HANDLER
// =============================================================================

/// Look up one node and its causal links.
pub async fn trace_handler(
    State(state): State<AppState>,
    Path((session_key, node_id)): Path<(String, u64)>,
) -> Response {
    match state.engine.trace_node(&session_key, NodeId(node_id)) {
        Ok(Some((node, linked))) => {
            (StatusCode::OK, Json(TraceResponse { node, linked })).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("node {node_id} not found"))),
        )
            .into_response(),
        Err(e) => bad_request(e.to_string()),
    }
}

// =============================================================================
// CONTEXT HANDLER
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ContextParams {
    pub limit: Option<usize>,
}

/// Recent memory events for a session, oldest first.
pub async fn context_handler(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
    Query(params): Query<ContextParams>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_CONTEXT_LIMIT).min(50);
    match state.engine.recent_context(&session_key, limit) {
        Ok(items) => {
            let entries: Vec<ContextEntry> = items
                .into_iter()
                .map(|item| ContextEntry {
                    user_input: item.user_input,
                    response_content: item.response_content,
                })
                .collect();
            (StatusCode::OK, Json(ContextResponse { entries })).into_response()
        }
        Err(e) => bad_request(e.to_string()),
    }
}
