//! services/api/src/web/middleware.rs
//!
//! Session middleware for the portal routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "picata_session";

/// Reads the session id out of the `Cookie` header, if there is a well-formed one.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
}

/// Middleware that resolves the session cookie into the live session.
///
/// If valid, inserts the `SessionHandle` into request extensions for handlers to use.
/// If the cookie is missing or the session has ended, returns 401 Unauthorized.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let session_id = session_id_from_headers(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let handle = state.sessions.get(session_id).await.ok_or_else(|| {
        debug!("Unknown or ended session {}", session_id);
        StatusCode::UNAUTHORIZED
    })?;
    handle.lock().await.last_seen_at = Utc::now();

    req.extensions_mut().insert(handle);
    Ok(next.run(req).await)
}
