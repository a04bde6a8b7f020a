//! Result delivery route.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::api::extract::MaybeSession;
use crate::api::server::AppState;
use crate::mailbox::GameResult;

#[derive(Debug, Clone, Serialize)]
pub struct ResultResponse {
    pub result: Option<GameResult>,
}

/// Create the result router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(take_result))
}

/// GET /api/result
///
/// Read-and-clear. An empty mailbox, an expired result and a missing session
/// all yield `{"result": null}`.
async fn take_result(MaybeSession(session): MaybeSession) -> Json<ResultResponse> {
    let result = session.and_then(|session| session.mailbox().take());
    Json(ResultResponse { result })
}
