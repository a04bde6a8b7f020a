//! The per-session slot holding the one live round.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::types::Round;

/// A session's single live round.
///
/// Installing a round supersedes the previous one, so at most one round per
/// session can ever resolve.
#[derive(Debug, Default)]
pub struct ActiveRound {
    slot: Mutex<Option<Round>>,
}

impl ActiveRound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `round` the live round, returning the one it superseded.
    pub fn install(&self, round: Round) -> Option<Round> {
        self.slot.lock().replace(round)
    }

    /// The live round if its id is `round_id` and it has not expired.
    ///
    /// An expired round is cleared.
    pub fn current(&self, round_id: &str, now: DateTime<Utc>) -> Option<Round> {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|r| r.is_expired_at(now)) {
            *slot = None;
            return None;
        }
        slot.as_ref().filter(|r| r.round_id == round_id).cloned()
    }

    /// Remove and return the live round if it matches `round_id` and has not
    /// expired. A round can be consumed once.
    pub fn consume(&self, round_id: &str, now: DateTime<Utc>) -> Option<Round> {
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            Some(r) if r.is_expired_at(now) => {
                *slot = None;
                None
            }
            Some(r) if r.round_id == round_id => slot.take(),
            _ => None,
        }
    }

    /// Drop the live round if it has expired. Returns whether one was dropped.
    pub fn clear_expired(&self, now: DateTime<Utc>) -> bool {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|r| r.is_expired_at(now)) {
            *slot = None;
            return true;
        }
        false
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::GameMode;

    fn round(id: &str, now: DateTime<Utc>) -> Round {
        Round::new(id, GameMode::Play, 500, now, chrono::Duration::minutes(5))
    }

    #[test]
    fn test_install_supersedes() {
        let active = ActiveRound::new();
        let now = Utc::now();

        assert!(active.install(round("R1", now)).is_none());
        let old = active.install(round("R2", now)).unwrap();

        assert_eq!(old.round_id, "R1");
        assert!(active.current("R1", now).is_none());
        assert!(active.current("R2", now).is_some());
    }

    #[test]
    fn test_consume_once() {
        let active = ActiveRound::new();
        let now = Utc::now();
        active.install(round("R1", now));

        assert!(active.consume("R2", now).is_none());
        assert!(active.consume("R1", now).is_some());
        assert!(active.consume("R1", now).is_none());
        assert!(active.is_empty());
    }

    #[test]
    fn test_expired_round_is_cleared() {
        let active = ActiveRound::new();
        let now = Utc::now();
        active.install(round("R1", now));

        let later = now + chrono::Duration::minutes(5);
        assert!(active.current("R1", later).is_none());
        assert!(active.is_empty());

        active.install(round("R2", now));
        assert!(!active.clear_expired(now));
        assert!(active.clear_expired(later));
        assert!(active.is_empty());
    }
}
