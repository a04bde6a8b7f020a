//! Gold sync route.

use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;

use crate::api::extract::MaybeSession;
use crate::api::server::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct GoldResponse {
    /// Authoritative balance, or `null` when the sync was a no-op
    pub gold: Option<i64>,
}

/// Create the gold router.
pub fn router() -> Router<AppState> {
    Router::new().route("/sync", post(sync_gold))
}

/// POST /api/gold/sync
///
/// Best-effort; never an error status.
async fn sync_gold(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Json<GoldResponse> {
    let outcome = state.gold.sync(session.as_deref()).await;
    Json(GoldResponse {
        gold: outcome.gold(),
    })
}
