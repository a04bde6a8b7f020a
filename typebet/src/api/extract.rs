//! Request extractors for the caller's session.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::cookies::{SESSION_COOKIE, read_cookie};
use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::session::SessionContext;

const LOGIN_REQUIRED: &str = "ログインが必要です";

fn lookup(parts: &Parts, state: &AppState) -> Option<Arc<SessionContext>> {
    let id = read_cookie(&parts.headers, SESSION_COOKIE)?;
    state.sessions.get(&id)
}

/// The caller's live session; rejects with 401 when there is none.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Arc<SessionContext>);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        lookup(parts, state)
            .map(CurrentSession)
            .ok_or_else(|| ApiError::unauthorized(LOGIN_REQUIRED))
    }
}

/// The caller's live session, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<Arc<SessionContext>>);

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(lookup(parts, state)))
    }
}
