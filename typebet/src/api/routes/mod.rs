//! API route modules.
//!
//! Organizes routes by resource type.

pub mod auth;
pub mod gold;
pub mod health;
pub mod result;
pub mod rounds;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/rounds", rounds::router())
        .nest("/api/result", result::router())
        .nest("/api/gold", gold::router())
        .nest("/health", health::router())
        .with_state(state)
}
