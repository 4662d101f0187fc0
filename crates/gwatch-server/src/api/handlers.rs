//! Request handlers for the REST and WebSocket endpoints.

use super::error::ApiError;
use super::AppState;
use crate::transport::serve_viewer;
use axum::extract::rejection::JsonRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gwatch_core::{catalog, SessionSummary, StartRequest};

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

/// GET /api/gadgets — the launchable gadget catalog.
pub async fn list_gadgets() -> Json<&'static [catalog::GadgetDescriptor]> {
    Json(catalog::GADGETS)
}

/// GET /api/sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.service.list_sessions().await)
}

/// POST /api/sessions
pub async fn start_session(
    State(state): State<AppState>,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionSummary>), ApiError> {
    let Json(req) =
        payload.map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))?;
    let summary = state
        .service
        .start_session(req)
        .await
        .map_err(ApiError::from_start)?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// DELETE /api/sessions/{id}
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .stop_session(&session_id)
        .await
        .map_err(ApiError::from_stop)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /ws/{id} — upgrade and attach a viewer to a running session.
///
/// The session is resolved before the upgrade so unknown ids get a plain
/// 404 instead of a dangling socket.
pub async fn attach_viewer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let Some(session) = state.service.get_session(&session_id).await else {
        return ApiError::NotFound(format!("session not found: {session_id}")).into_response();
    };
    match ws {
        Some(ws) => {
            let viewers = state.viewers.clone();
            ws.on_upgrade(move |socket| serve_viewer(socket, session, viewers))
                .into_response()
        }
        None => StatusCode::UPGRADE_REQUIRED.into_response(),
    }
}
