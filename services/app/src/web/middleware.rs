//! services/app/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::web::state::AppState;

/// The session id carried through request extensions once the middleware has
/// validated the cookie.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub String);

/// Pulls the session cookie value out of the request headers, if present.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .map(str::to_string)
}

/// Middleware that validates the session cookie against the session table.
///
/// If valid, inserts the session id into request extensions for handlers to
/// use. If invalid, missing, or expired, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let session_id =
        session_id_from_headers(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    if state.sessions.get(&session_id).await.is_none() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    req.extensions_mut().insert(CurrentSession(session_id));
    Ok(next.run(req).await)
}
