//! Round routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::api::cookies::{read_cookie, round_cookie_name};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{CurrentSession, MaybeSession};
use crate::api::server::AppState;
use crate::round::{GameMode, RoundError};
use crate::session::SessionContext;

/// Header carrying a round capsule when cookies are not used.
pub const ROUND_TOKEN_HEADER: &str = "x-round-token";

/// Create round request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoundRequest {
    pub stake: i64,
    #[serde(default = "default_mode")]
    pub mode: GameMode,
}

fn default_mode() -> GameMode {
    GameMode::Play
}

/// Complete round request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRoundRequest {
    pub accuracy: f64,
    pub correct_typed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundValidity {
    pub valid: bool,
}

/// Create the rounds router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_round))
        .route("/{round_id}", get(check_round))
        .route("/{round_id}/complete", post(complete_round))
}

/// Drop the session when the backend demands a fresh login.
fn round_error(state: &AppState, session: &SessionContext, err: RoundError) -> ApiError {
    if err.requires_relogin() {
        state.sessions.remove(session.id());
    }
    err.into()
}

/// Capsule for `round_id` from its cookie or the token header.
fn round_token(headers: &HeaderMap, round_id: &str) -> Option<String> {
    read_cookie(headers, &round_cookie_name(round_id)).or_else(|| {
        headers
            .get(ROUND_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    })
}

/// POST /api/rounds
///
/// Stake gold and open a round. The capsule is returned in the body and as
/// a cookie scoped to this round.
async fn create_round(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Json(request): Json<CreateRoundRequest>,
) -> ApiResult<Response> {
    let handle = state
        .ledger
        .create_round(&session, request.stake, request.mode)
        .await
        .map_err(|e| round_error(&state, &session, e))?;

    let cookie = state
        .cookies
        .build(
            &round_cookie_name(handle.round_id()),
            &handle.token,
            state.ledger.ttl().num_seconds(),
        )
        .ok_or_else(|| ApiError::internal("Failed to build round cookie"))?;

    Ok(([(SET_COOKIE, cookie)], Json(handle)).into_response())
}

/// GET /api/rounds/{round_id}
///
/// Whether the round is still live for this browser. Never an error.
async fn check_round(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Path(round_id): Path<String>,
    headers: HeaderMap,
) -> Json<RoundValidity> {
    let valid = session
        .zip(round_token(&headers, &round_id))
        .and_then(|(session, token)| state.ledger.resolve(&session, &token))
        .is_some_and(|round| round.round_id == round_id);

    Json(RoundValidity { valid })
}

/// POST /api/rounds/{round_id}/complete
///
/// Report the typing figures, deposit the result and clear the capsule.
async fn complete_round(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(round_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CompleteRoundRequest>,
) -> ApiResult<Response> {
    let token = round_token(&headers, &round_id)
        .ok_or_else(|| ApiError::from(RoundError::RoundNotFound))?;

    // The capsule must name the round in the path.
    if state
        .ledger
        .resolve(&session, &token)
        .is_none_or(|round| round.round_id != round_id)
    {
        return Err(RoundError::RoundNotFound.into());
    }

    let result = state
        .ledger
        .complete_round(&session, &token, request.accuracy, request.correct_typed)
        .await
        .map_err(|e| round_error(&state, &session, e))?;

    let body = Json(result);
    match state.cookies.clear(&round_cookie_name(&round_id)) {
        Some(cookie) => Ok(([(SET_COOKIE, cookie)], body).into_response()),
        None => Ok(body.into_response()),
    }
}
