//! Core credential types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Access/refresh token pair issued by the backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token sent with every backend call.
    pub access_token: String,
    /// Token exchanged for a new pair once the access token goes stale.
    pub refresh_token: String,
    /// Expiry of the access token.
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Create a new credential.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        }
    }

    /// Build a credential from the backend's Unix-seconds `expiresAt`.
    ///
    /// Returns `None` when the timestamp is out of range.
    pub fn from_unix_expiry(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at_secs: i64,
    ) -> Option<Self> {
        let expires_at = DateTime::from_timestamp(expires_at_secs, 0)?;
        Some(Self::new(access_token, refresh_token, expires_at))
    }

    /// Whether the access token must be refreshed before use.
    ///
    /// A credential is stale once `now + margin` reaches its expiry, so that
    /// requests already in flight do not race the literal expiry.
    #[inline]
    pub fn is_stale_at(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        now + margin >= self.expires_at
    }

    /// Whether the access token is past its literal expiry.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Short, log-safe fingerprint of the access token.
    pub fn fingerprint(&self) -> String {
        token_fingerprint(&self.access_token)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &token_fingerprint(&self.access_token))
            .field("refresh_token", &token_fingerprint(&self.refresh_token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// First 12 hex chars of the token's SHA-256. Raw tokens never reach the logs.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}
