//! Best-effort balance synchronization.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::GameBackend;
use crate::session::SessionContext;

/// Result of a sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cached balance now matches the backend.
    Updated(i64),
    /// Nothing changed: no identity, or the backend could not be reached.
    NoOp,
}

impl SyncOutcome {
    pub fn gold(&self) -> Option<i64> {
        match self {
            Self::Updated(gold) => Some(*gold),
            Self::NoOp => None,
        }
    }
}

/// Refreshes a session's cached gold from the backend.
///
/// Never fails: errors are logged and the cached value is left stale until
/// the next call. There is no retry loop here.
pub struct GoldSynchronizer {
    backend: Arc<dyn GameBackend>,
}

impl GoldSynchronizer {
    pub fn new(backend: Arc<dyn GameBackend>) -> Self {
        Self { backend }
    }

    pub async fn sync(&self, session: Option<&SessionContext>) -> SyncOutcome {
        let Some(session) = session else {
            return SyncOutcome::NoOp;
        };
        if !session.is_authenticated() {
            debug!(session_id = %session.id(), "Skipping gold sync without credential");
            return SyncOutcome::NoOp;
        }

        let user_id = session.user_id();
        match session
            .gateway()
            .execute(|token| async move { self.backend.user_gold(&token, user_id).await })
            .await
        {
            Ok(gold) => {
                session.set_cached_gold(gold);
                debug!(session_id = %session.id(), gold, "Gold synchronized");
                SyncOutcome::Updated(gold)
            }
            Err(e) => {
                warn!(session_id = %session.id(), error = %e, "Gold sync failed");
                SyncOutcome::NoOp
            }
        }
    }
}

impl std::fmt::Debug for GoldSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoldSynchronizer").finish_non_exhaustive()
    }
}
