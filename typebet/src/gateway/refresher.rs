//! Token refresh protocol.

use async_trait::async_trait;
use thiserror::Error;

use crate::backend::UpstreamError;
use crate::credentials::Credential;

/// Why a refresh attempt did not yield a new credential.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The backend refused the refresh token (expired, revoked, rotated).
    #[error("Refresh token rejected: {0}")]
    Rejected(String),

    /// The refresh call itself failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Exchanges a refresh token for a new credential pair.
///
/// Backends may rotate the refresh token on use, so callers must never issue
/// two refreshes with the same token concurrently.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, RefreshError>;
}
