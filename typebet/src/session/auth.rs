//! Login and logout.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::backend::{GameBackend, UpstreamError};

use super::context::SessionContext;
use super::registry::SessionRegistry;

const MISSING_INPUT_MESSAGE: &str = "メールアドレスとパスワードを入力してください";
const LOGIN_FAILED_MESSAGE: &str = "認証に失敗しました";
const MISSING_PROFILE_MESSAGE: &str = "ユーザー情報の取得に失敗しました";

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Backend-reported login failure, verbatim.
    #[error("{}", .0.join("\n"))]
    Rejected(Vec<String>),

    #[error("Backend unavailable: {0}")]
    Upstream(#[from] UpstreamError),
}

/// Exchanges email/password for a session.
pub struct AuthService {
    backend: Arc<dyn GameBackend>,
    sessions: Arc<SessionRegistry>,
}

impl AuthService {
    pub fn new(backend: Arc<dyn GameBackend>, sessions: Arc<SessionRegistry>) -> Self {
        Self { backend, sessions }
    }

    /// Log in through the backend and open a session holding the issued
    /// credential. The cached gold is seeded from the login payload.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Arc<SessionContext>, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Rejected(vec![MISSING_INPUT_MESSAGE.to_string()]));
        }

        let receipt = self.backend.login(email, password).await?;

        if !receipt.success {
            warn!("Backend rejected login");
            let errors = if receipt.errors.is_empty() {
                vec![LOGIN_FAILED_MESSAGE.to_string()]
            } else {
                receipt.errors
            };
            return Err(AuthError::Rejected(errors));
        }

        let (Some(user), Some(credential)) = (receipt.user, receipt.credential) else {
            return Err(AuthError::Rejected(vec![MISSING_PROFILE_MESSAGE.to_string()]));
        };

        let session = self.sessions.create(user, credential);
        info!(user_id = %session.user_id(), "User logged in");
        Ok(session)
    }

    /// Drop the session. Returns whether it existed.
    pub fn logout(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}
