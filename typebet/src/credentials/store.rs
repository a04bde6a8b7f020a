//! Session-scoped credential store.
//!
//! Holds at most one [`Credential`] behind a lock. The token pair is swapped as
//! a single `Arc`, so readers see either the old pair or the new pair, never a
//! mix. Every mutation bumps a version counter that the gateway uses to tell
//! whether a rejected credential has already been replaced.

use std::sync::Arc;

use parking_lot::RwLock;

use super::types::Credential;

/// Point-in-time view of the store.
#[derive(Debug, Clone)]
pub struct CredentialSnapshot {
    pub credential: Arc<Credential>,
    pub version: u64,
}

#[derive(Default)]
struct Slot {
    credential: Option<Arc<Credential>>,
    version: u64,
}

/// Holds the current credential of one user session.
#[derive(Default)]
pub struct CredentialStore {
    slot: RwLock<Slot>,
}

impl CredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a freshly issued credential.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: RwLock::new(Slot {
                credential: Some(Arc::new(credential)),
                version: 1,
            }),
        }
    }

    /// Current credential together with its version, if any.
    pub fn snapshot(&self) -> Option<CredentialSnapshot> {
        let slot = self.slot.read();
        slot.credential.as_ref().map(|credential| CredentialSnapshot {
            credential: Arc::clone(credential),
            version: slot.version,
        })
    }

    /// Atomically replace the token pair.
    pub fn replace(&self, credential: Credential) -> CredentialSnapshot {
        let credential = Arc::new(credential);
        let mut slot = self.slot.write();
        slot.version += 1;
        slot.credential = Some(Arc::clone(&credential));
        CredentialSnapshot {
            credential,
            version: slot.version,
        }
    }

    /// Drop the credential. The session must log in again.
    pub fn invalidate(&self) {
        let mut slot = self.slot.write();
        if slot.credential.take().is_some() {
            slot.version += 1;
        }
    }

    /// Whether a credential is present.
    #[inline]
    pub fn is_authenticated(&self) -> bool {
        self.slot.read().credential.is_some()
    }

    /// Monotonic mutation counter.
    #[cfg(test)]
    pub fn version(&self) -> u64 {
        self.slot.read().version
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.read();
        f.debug_struct("CredentialStore")
            .field("credential", &slot.credential)
            .field("version", &slot.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn credential(tag: &str) -> Credential {
        Credential::new(
            format!("access-{tag}"),
            format!("refresh-{tag}"),
            Utc::now() + chrono::Duration::hours(1),
        )
    }

    #[test]
    fn test_empty_store() {
        let store = CredentialStore::new();
        assert!(store.snapshot().is_none());
        assert!(!store.is_authenticated());
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_replace_bumps_version() {
        let store = CredentialStore::with_credential(credential("1"));
        assert_eq!(store.version(), 1);

        let snapshot = store.replace(credential("2"));
        assert_eq!(snapshot.version, 2);
        assert_eq!(snapshot.credential.access_token, "access-2");
        assert_eq!(store.snapshot().unwrap().credential.refresh_token, "refresh-2");
    }

    #[test]
    fn test_invalidate_empties_store() {
        let store = CredentialStore::with_credential(credential("1"));
        store.invalidate();
        assert!(store.snapshot().is_none());
        assert_eq!(store.version(), 2);

        // Invalidating an empty store is a no-op.
        store.invalidate();
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn test_readers_never_see_mixed_pair() {
        let store = Arc::new(CredentialStore::with_credential(credential("0")));

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 1..2_000 {
                    store.replace(credential(&i.to_string()));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        let snapshot = store.snapshot().unwrap();
                        let access = snapshot.credential.access_token.trim_start_matches("access-");
                        let refresh = snapshot
                            .credential
                            .refresh_token
                            .trim_start_matches("refresh-");
                        assert_eq!(access, refresh);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
