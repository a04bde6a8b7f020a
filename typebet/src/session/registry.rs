use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::UserProfile;
use crate::credentials::{Credential, CredentialStore};
use crate::gateway::{AuthGateway, TokenRefresher};
use crate::mailbox::ResultMailbox;

use super::context::SessionContext;

/// Lifetimes applied to every new session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub max_age: chrono::Duration,
    pub refresh_margin: chrono::Duration,
    /// Round TTL, also used as the mailbox lifetime.
    pub round_ttl: chrono::Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_age: chrono::Duration::days(14),
            refresh_margin: chrono::Duration::seconds(30),
            round_ttl: chrono::Duration::seconds(300),
        }
    }
}

/// In-memory registry of live sessions keyed by session id.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SessionContext>>,
    refresher: Arc<dyn TokenRefresher>,
    settings: SessionSettings,
}

impl SessionRegistry {
    pub fn new(refresher: Arc<dyn TokenRefresher>, settings: SessionSettings) -> Self {
        Self {
            sessions: DashMap::new(),
            refresher,
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Open a session for `user` holding `credential`.
    pub fn create(&self, user: UserProfile, credential: Credential) -> Arc<SessionContext> {
        self.create_at(user, credential, Utc::now())
    }

    pub fn create_at(
        &self,
        user: UserProfile,
        credential: Credential,
        now: DateTime<Utc>,
    ) -> Arc<SessionContext> {
        let id = Uuid::new_v4().to_string();
        let credentials = Arc::new(CredentialStore::with_credential(credential));
        let gateway = AuthGateway::new(
            Arc::clone(&credentials),
            Arc::clone(&self.refresher),
            self.settings.refresh_margin,
        );

        let session = Arc::new(SessionContext::new(
            id.clone(),
            user,
            credentials,
            gateway,
            ResultMailbox::new(self.settings.round_ttl),
            now,
            self.settings.max_age,
        ));

        self.sessions.insert(id, Arc::clone(&session));
        info!(session_id = %session.id(), user_id = %session.user_id(), "Session created");
        session
    }

    /// Look up a live session. Expired sessions are dropped and not returned.
    pub fn get(&self, id: &str) -> Option<Arc<SessionContext>> {
        self.get_at(id, Utc::now())
    }

    pub fn get_at(&self, id: &str, now: DateTime<Utc>) -> Option<Arc<SessionContext>> {
        let session = self.sessions.get(id).map(|entry| Arc::clone(entry.value()))?;
        if session.is_expired_at(now) {
            self.sessions.remove(id);
            debug!(session_id = %id, "Dropped expired session on lookup");
            return None;
        }
        Some(session)
    }

    pub fn remove(&self, id: &str) -> Option<Arc<SessionContext>> {
        let removed = self.sessions.remove(id).map(|(_, session)| session);
        if removed.is_some() {
            info!(session_id = %id, "Session removed");
        }
        removed
    }

    /// Get the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove all expired sessions, returning how many were dropped.
    pub fn prune_expired(&self) -> usize {
        self.prune_expired_at(Utc::now())
    }

    pub fn prune_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        before.saturating_sub(self.len())
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RefreshError;
    use async_trait::async_trait;

    struct NoRefresh;

    #[async_trait]
    impl TokenRefresher for NoRefresh {
        async fn refresh(&self, _refresh_token: &str) -> Result<Credential, RefreshError> {
            Err(RefreshError::Rejected("not in this test".into()))
        }
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(NoRefresh), SessionSettings::default())
    }

    fn user(id: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            name: "tester".into(),
            email: format!("{id}@example.com"),
            icon: None,
            gold: 1000,
        }
    }

    fn credential() -> Credential {
        Credential::new("access", "refresh", Utc::now() + chrono::Duration::hours(1))
    }

    #[test]
    fn test_create_and_get() {
        let registry = registry();
        let session = registry.create(user("u1"), credential());

        let found = registry.get(session.id()).unwrap();
        assert_eq!(found.user_id(), "u1");
        assert_eq!(found.cached_gold(), 1000);
        assert!(found.is_authenticated());
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let registry = registry();
        let a = registry.create(user("u1"), credential());
        let b = registry.create(user("u2"), credential());

        assert_ne!(a.id(), b.id());
        assert!(!Arc::ptr_eq(a.credentials(), b.credentials()));

        a.credentials().invalidate();
        assert!(!a.is_authenticated());
        assert!(b.is_authenticated());
    }

    #[test]
    fn test_expired_session_is_not_returned() {
        let registry = registry();
        let now = Utc::now();
        let session = registry.create_at(user("u1"), credential(), now);

        let later = now + chrono::Duration::days(14);
        assert!(registry.get_at(session.id(), later).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_session_lifetime_runs_from_login() {
        let registry = registry();
        let now = Utc::now();
        let session = registry.create_at(user("u1"), credential(), now);

        assert_eq!(session.expires_at(), now + chrono::Duration::days(14));
        let edge = now + chrono::Duration::days(14) - chrono::Duration::milliseconds(1);
        assert!(registry.get_at(session.id(), edge).is_some());
        assert!(session.is_expired_at(now + chrono::Duration::days(14)));
    }

    #[test]
    fn test_prune_expired() {
        let registry = registry();
        let now = Utc::now();
        registry.create_at(user("old"), credential(), now - chrono::Duration::days(15));
        registry.create_at(user("new"), credential(), now);

        assert_eq!(registry.prune_expired_at(now), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove() {
        let registry = registry();
        let session = registry.create(user("u1"), credential());

        assert!(registry.remove(session.id()).is_some());
        assert!(registry.remove(session.id()).is_none());
        assert!(registry.get(session.id()).is_none());
    }
}
