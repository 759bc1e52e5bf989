//! services/api/src/web/session.rs
//!
//! Endpoints that start and end an interactive session.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::web::{
    middleware::{session_id_from_headers, SESSION_COOKIE},
    protocol::{DocumentSummary, SessionResponse},
    state::AppState,
};

/// POST /session - Start a new session
#[utoipa::path(
    post,
    path = "/session",
    responses(
        (status = 201, description = "Session started", body = SessionResponse)
    )
)]
pub async fn start_session_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let idle_timeout = state.config.session_idle_timeout;
    let (session_id, handle) = state
        .sessions
        .start(state.bundled_document.as_deref(), idle_timeout)
        .await;
    info!("Session {} started.", session_id);

    let documents = handle
        .lock()
        .await
        .documents
        .documents()
        .iter()
        .map(DocumentSummary::from)
        .collect();

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        idle_timeout.num_seconds()
    );

    (
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            session_id,
            documents,
        }),
    )
}

/// DELETE /session - End the session and discard its transcript and documents
#[utoipa::path(
    delete,
    path = "/session",
    responses(
        (status = 200, description = "Session ended"),
        (status = 401, description = "No active session")
    )
)]
pub async fn end_session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_id = session_id_from_headers(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    if !state.sessions.end(session_id).await {
        return Err((StatusCode::UNAUTHORIZED, "No session found".to_string()));
    }
    info!("Session {} ended.", session_id);

    let cookie = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE);
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}
