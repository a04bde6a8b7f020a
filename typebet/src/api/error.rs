//! API error handling.
//!
//! Provides consistent error responses for the API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::gateway::GatewayError;
use crate::round::RoundError;
use crate::session::AuthError;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Create a 401 Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
    }

    /// Create a 422 Unprocessable Entity error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    /// Create a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// 503 with a generic message; upstream detail stays in the logs.
    fn backend_unavailable() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "BACKEND_UNAVAILABLE",
            "The game server is temporarily unavailable",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            code: self.code,
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthenticated | GatewayError::RefreshFailed(_) => {
                ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", err.to_string())
            }
            GatewayError::Upstream(e) => {
                tracing::warn!("Backend call failed: {}", e);
                ApiError::backend_unavailable()
            }
        }
    }
}

impl From<RoundError> for ApiError {
    fn from(err: RoundError) -> Self {
        match err {
            RoundError::InvalidStake { stake, min, max } => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_STAKE",
                err.to_string(),
            )
            .with_details(serde_json::json!({ "stake": stake, "min": min, "max": max })),
            RoundError::InvalidScore(msg) => ApiError::validation(msg),
            RoundError::InsufficientBalance(msg) => {
                ApiError::new(StatusCode::CONFLICT, "INSUFFICIENT_BALANCE", msg)
            }
            RoundError::BetRejected(errors) => {
                ApiError::new(StatusCode::CONFLICT, "BET_REJECTED", errors.join("\n"))
                    .with_details(serde_json::json!({ "errors": errors }))
            }
            RoundError::RoundNotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "ROUND_NOT_FOUND", "Round not found")
            }
            RoundError::Unauthenticated(e) => e.into(),
            RoundError::BackendUnavailable(msg) => {
                tracing::warn!("Backend call failed: {}", msg);
                ApiError::backend_unavailable()
            }
            RoundError::Capsule(e) => {
                tracing::error!("Capsule error: {}", e);
                ApiError::internal("Failed to issue round token")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Rejected(errors) => {
                ApiError::new(StatusCode::UNAUTHORIZED, "LOGIN_FAILED", errors.join("\n"))
            }
            AuthError::Upstream(e) => GatewayError::Upstream(e).into(),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
