use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::backend::UserProfile;
use crate::credentials::CredentialStore;
use crate::gateway::AuthGateway;
use crate::mailbox::ResultMailbox;
use crate::round::ActiveRound;

/// Everything that belongs to one logged-in browser session.
///
/// Nothing in here is shared with another session: the credential store, the
/// gateway (and its refresh lock), the live round and the result mailbox are
/// all owned by this context.
#[derive(Debug)]
pub struct SessionContext {
    id: String,
    user: UserProfile,
    credentials: Arc<CredentialStore>,
    gateway: AuthGateway,
    active_round: ActiveRound,
    mailbox: ResultMailbox,
    cached_gold: RwLock<i64>,
    expires_at: DateTime<Utc>,
}

impl SessionContext {
    pub(crate) fn new(
        id: String,
        user: UserProfile,
        credentials: Arc<CredentialStore>,
        gateway: AuthGateway,
        mailbox: ResultMailbox,
        created_at: DateTime<Utc>,
        max_age: chrono::Duration,
    ) -> Self {
        let cached_gold = RwLock::new(user.gold);
        Self {
            id,
            user,
            credentials,
            gateway,
            active_round: ActiveRound::new(),
            mailbox,
            cached_gold,
            expires_at: created_at + max_age,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    pub fn active_round(&self) -> &ActiveRound {
        &self.active_round
    }

    pub fn mailbox(&self) -> &ResultMailbox {
        &self.mailbox
    }

    /// Last balance seen from the backend. Display only, never authoritative.
    pub fn cached_gold(&self) -> i64 {
        *self.cached_gold.read()
    }

    pub(crate) fn set_cached_gold(&self, gold: i64) {
        *self.cached_gold.write() = gold;
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the session still holds a usable credential.
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }
}
