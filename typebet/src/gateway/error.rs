//! Gateway error types.

use thiserror::Error;

use crate::backend::UpstreamError;

/// Errors surfaced by [`AuthGateway::execute`](super::AuthGateway::execute).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No usable credential - re-login required.
    #[error("Not authenticated - login required")]
    Unauthenticated,

    /// The refresh protocol failed; the credential store has been emptied.
    #[error("Credential refresh failed: {0}")]
    RefreshFailed(String),

    /// The backend call failed for a reason unrelated to authentication.
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),
}

impl GatewayError {
    /// Check if this error requires a full re-login.
    pub fn requires_relogin(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::RefreshFailed(_))
    }
}
