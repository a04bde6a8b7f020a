//! Authentication routes.
//!
//! Login opens a server-side session and hands the browser a session cookie.

use axum::{
    Json, Router,
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::api::cookies::SESSION_COOKIE;
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{CurrentSession, MaybeSession};
use crate::api::server::AppState;
use crate::backend::UserProfile;

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Session info returned on login and by `GET /api/auth/session`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserProfile,
    /// Last known balance (display only)
    pub gold: i64,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(current_session))
}

/// POST /api/auth/login
///
/// Log in through the backend and set the session cookie.
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Response> {
    let session = state
        .auth_service
        .login(&request.email, &request.password)
        .await?;

    let cookie = state
        .cookies
        .build(SESSION_COOKIE, session.id(), state.session_max_age_secs)
        .ok_or_else(|| ApiError::internal("Failed to build session cookie"))?;

    let body = SessionResponse {
        user: session.user().clone(),
        gold: session.cached_gold(),
        expires_at: session.expires_at(),
    };

    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// POST /api/auth/logout
///
/// Drop the session (if any) and clear the cookie. Always succeeds.
async fn logout(State(state): State<AppState>, MaybeSession(session): MaybeSession) -> Response {
    if let Some(session) = session {
        state.auth_service.logout(session.id());
    }

    let body = Json(serde_json::json!({ "message": "Logged out successfully" }));
    match state.cookies.clear(SESSION_COOKIE) {
        Some(cookie) => ([(SET_COOKIE, cookie)], body).into_response(),
        None => body.into_response(),
    }
}

/// GET /api/auth/session
async fn current_session(
    CurrentSession(session): CurrentSession,
) -> ApiResult<Json<SessionResponse>> {
    Ok(Json(SessionResponse {
        user: session.user().clone(),
        gold: session.cached_gold(),
        expires_at: session.expires_at(),
    }))
}
