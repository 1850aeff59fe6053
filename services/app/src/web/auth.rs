//! services/app/src/web/auth.rs
//!
//! Sign-in and sign-out endpoints.
//!
//! The browser runs the provider's popup flow itself and posts the resulting
//! credential here. Sign-in verifies it, upserts the profile, and opens a
//! cookie session; sign-out revokes the credential, drops the session, and
//! sends the browser back to the map.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::web::middleware::session_id_from_headers;
use crate::web::rest::ProfileResponse;
use crate::web::state::{AppState, SessionEntry, SESSION_TTL_DAYS};
use rainfall_core::domain::AuthProvider;
use rainfall_core::flows;
use rainfall_core::ports::PortError;
use rainfall_core::state::{reduce, Action, AppState as ClientState};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignInRequest {
    /// One of `google` or `facebook`.
    pub provider: String,
    /// The OAuth access token produced by the popup flow.
    pub credential: String,
}

fn parse_provider(value: &str) -> Result<AuthProvider, AppError> {
    match value {
        "google" => Ok(AuthProvider::Google),
        "facebook" => Ok(AuthProvider::Facebook),
        other => Err(AppError::Port(PortError::Validation(format!(
            "'{other}' is not a supported sign-in provider"
        )))),
    }
}

fn session_cookie(value: &str, max_age_seconds: i64) -> String {
    format!(
        "session={value}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={max_age_seconds}"
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/sign-in - Verify a popup credential and open a session.
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = ProfileResponse),
        (status = 401, description = "The provider rejected the credential"),
        (status = 422, description = "Unknown provider"),
        (status = 502, description = "The provider or database did not answer")
    )
)]
pub async fn sign_in_handler(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let provider = parse_provider(&request.provider)?;

    let user = flows::sign_in(
        state.identity.as_ref(),
        state.store.as_ref(),
        provider,
        &request.credential,
    )
    .await?;

    let app = reduce(ClientState::default(), Action::SignedIn(user.clone()));
    let session_id = state
        .sessions
        .create(SessionEntry::new(app, provider, request.credential))
        .await;

    let cookie = session_cookie(&session_id, SESSION_TTL_DAYS * 24 * 60 * 60);
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ProfileResponse::from_domain(&user)),
    ))
}

/// POST /auth/sign-out - Revoke the credential and drop the session.
#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses(
        (status = 204, description = "Signed out; session cookie cleared"),
        (status = 401, description = "No live session"),
        (status = 502, description = "The provider refused the revocation")
    )
)]
pub async fn sign_out_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let session_id = session_id_from_headers(&headers)
        .ok_or(AppError::Port(PortError::Unauthorized))?;
    let entry = state
        .sessions
        .get(&session_id)
        .await
        .ok_or(AppError::Port(PortError::Unauthorized))?;

    // Revocation failures surface; the session only ends once the provider
    // has acknowledged.
    flows::sign_out(state.identity.as_ref(), entry.provider, &entry.credential).await?;
    state.sessions.remove(&session_id).await;

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, session_cookie("", 0))],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_popup_providers_parse() {
        assert_eq!(parse_provider("google").unwrap(), AuthProvider::Google);
        assert_eq!(parse_provider("facebook").unwrap(), AuthProvider::Facebook);
    }

    #[test]
    fn unknown_providers_are_a_validation_error() {
        assert!(matches!(
            parse_provider("github"),
            Err(AppError::Port(PortError::Validation(_)))
        ));
    }

    #[test]
    fn the_session_cookie_is_http_only_and_scoped_to_root() {
        let cookie = session_cookie("abc", 60);
        assert!(cookie.starts_with("session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.ends_with("Max-Age=60"));
    }
}
