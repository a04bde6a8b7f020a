//! Authenticated request gateway.
//!
//! Every backend call goes through [`AuthGateway::execute`], which hands the
//! operation a fresh access token and transparently runs the refresh protocol
//! when the stored credential is stale or rejected by the backend.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::backend::UpstreamError;
use crate::credentials::{CredentialSnapshot, CredentialStore};

use super::error::GatewayError;
use super::refresher::TokenRefresher;

/// Wraps backend calls for one session's credential set.
pub struct AuthGateway {
    store: Arc<CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    /// Serializes refreshes so a rotated refresh token is never used twice.
    refresh_lock: Mutex<()>,
    /// Credentials expiring within this margin are treated as stale.
    margin: chrono::Duration,
}

impl AuthGateway {
    /// Create a gateway over a session's credential store.
    pub fn new(
        store: Arc<CredentialStore>,
        refresher: Arc<dyn TokenRefresher>,
        margin: chrono::Duration,
    ) -> Self {
        Self {
            store,
            refresher,
            refresh_lock: Mutex::new(()),
            margin,
        }
    }

    /// The credential store this gateway guards.
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Whether a credential is currently held.
    #[inline]
    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// Run `op` with a valid access token.
    ///
    /// - Stale credentials are refreshed before dispatch (single-flight).
    /// - If the backend rejects the token, one refresh-and-retry is attempted.
    /// - A failed refresh empties the store and returns
    ///   [`GatewayError::RefreshFailed`]; later calls get
    ///   [`GatewayError::Unauthenticated`].
    #[instrument(skip_all)]
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T, GatewayError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let snapshot = self.fresh_credential().await?;

        let err = match op(snapshot.credential.access_token.clone()).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_auth_failure() {
            return Err(GatewayError::Upstream(err));
        }

        warn!(
            fingerprint = %snapshot.credential.fingerprint(),
            "Backend rejected access token; refreshing once before retry"
        );

        let renewed = self.refresh_after_rejection(snapshot.version).await?;

        match op(renewed.credential.access_token.clone()).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_auth_failure() => {
                error!(
                    fingerprint = %renewed.credential.fingerprint(),
                    "Backend rejected the renewed access token - re-login required"
                );
                self.store.invalidate();
                Err(GatewayError::Unauthenticated)
            }
            Err(err) => Err(GatewayError::Upstream(err)),
        }
    }

    /// Return a credential that is not stale, refreshing it if needed.
    async fn fresh_credential(&self) -> Result<CredentialSnapshot, GatewayError> {
        let snapshot = self
            .store
            .snapshot()
            .ok_or(GatewayError::Unauthenticated)?;

        if !snapshot.credential.is_stale_at(Utc::now(), self.margin) {
            return Ok(snapshot);
        }

        let _guard = self.refresh_lock.lock().await;

        // Double-check after acquiring lock (another task may have refreshed)
        let snapshot = self
            .store
            .snapshot()
            .ok_or(GatewayError::Unauthenticated)?;

        if !snapshot.credential.is_stale_at(Utc::now(), self.margin) {
            debug!("Credential already refreshed by a concurrent request");
            return Ok(snapshot);
        }

        self.perform_refresh(&snapshot).await
    }

    /// Refresh after the backend rejected the credential at `rejected_version`.
    ///
    /// Skips the refresh when another task already replaced that credential.
    async fn refresh_after_rejection(
        &self,
        rejected_version: u64,
    ) -> Result<CredentialSnapshot, GatewayError> {
        let _guard = self.refresh_lock.lock().await;

        let snapshot = self
            .store
            .snapshot()
            .ok_or(GatewayError::Unauthenticated)?;

        if snapshot.version != rejected_version {
            debug!("Rejected credential was already replaced");
            return Ok(snapshot);
        }

        self.perform_refresh(&snapshot).await
    }

    /// Run the refresh protocol. Caller must hold `refresh_lock`.
    async fn perform_refresh(
        &self,
        current: &CredentialSnapshot,
    ) -> Result<CredentialSnapshot, GatewayError> {
        info!(
            fingerprint = %current.credential.fingerprint(),
            expires_at = %current.credential.expires_at,
            "Starting credential refresh"
        );

        match self
            .refresher
            .refresh(&current.credential.refresh_token)
            .await
        {
            Ok(credential) => {
                let snapshot = self.store.replace(credential);
                info!(
                    fingerprint = %snapshot.credential.fingerprint(),
                    expires_at = %snapshot.credential.expires_at,
                    "Credential refresh successful"
                );
                Ok(snapshot)
            }
            Err(e) => {
                error!(error = %e, "Credential refresh failed - re-login required");
                self.store.invalidate();
                Err(GatewayError::RefreshFailed(e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for AuthGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGateway")
            .field("store", &self.store)
            .field("margin", &self.margin)
            .finish_non_exhaustive()
    }
}
