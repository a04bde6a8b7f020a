//! Single-delivery result mailbox.
//!
//! Holds the outcome of the session's last completed round until the page
//! layer takes it. Taking is destructive and happens under the same lock as
//! the read, so two concurrent readers can never both observe a result.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::ResultSummary;
use crate::round::GameMode;

/// Outcome of a resolved round, as delivered to the page layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub game_type: GameMode,
    pub success: bool,
    pub score: i64,
    pub gold_change: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_gold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_rank: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_change: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_rank_gold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GameResult {
    pub fn succeeded(game_type: GameMode, score: i64, gold_change: i64) -> Self {
        Self {
            game_type,
            success: true,
            score: score.max(0),
            gold_change,
            current_gold: None,
            current_rank: None,
            rank_change: None,
            next_rank_gold: None,
            error: None,
        }
    }

    pub fn failed(game_type: GameMode, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::succeeded(game_type, 0, 0)
        }
    }

    /// Attach balance and ranking extras from `gameResult`.
    pub fn with_summary(mut self, summary: ResultSummary) -> Self {
        self.current_gold = summary.current_gold;
        self.current_rank = summary.current_rank;
        self.rank_change = summary.rank_change;
        self.next_rank_gold = summary.next_rank_gold;
        self
    }
}

#[derive(Debug)]
struct Entry {
    result: GameResult,
    expires_at: DateTime<Utc>,
}

/// One session's result slot.
#[derive(Debug)]
pub struct ResultMailbox {
    slot: Mutex<Option<Entry>>,
    ttl: chrono::Duration,
}

impl ResultMailbox {
    /// Results live for `ttl` after deposit (the round TTL).
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
        }
    }

    /// Store `result`, replacing any unconsumed one.
    pub fn deposit(&self, result: GameResult) {
        self.deposit_at(result, Utc::now());
    }

    pub fn deposit_at(&self, result: GameResult, now: DateTime<Utc>) {
        let expires_at = now + self.ttl;
        if self
            .slot
            .lock()
            .replace(Entry { result, expires_at })
            .is_some()
        {
            debug!("Replaced an unconsumed result");
        }
    }

    /// Remove and return the stored result.
    ///
    /// `None` covers never-deposited, already-taken and expired alike.
    pub fn take(&self) -> Option<GameResult> {
        self.take_at(Utc::now())
    }

    pub fn take_at(&self, now: DateTime<Utc>) -> Option<GameResult> {
        let entry = self.slot.lock().take()?;
        if now >= entry.expires_at {
            debug!("Discarded an expired result");
            return None;
        }
        Some(entry.result)
    }

    /// Whether an unexpired result is waiting. Does not consume it.
    #[cfg(test)]
    pub fn is_pending_at(&self, now: DateTime<Utc>) -> bool {
        self.slot
            .lock()
            .as_ref()
            .is_some_and(|entry| now < entry.expires_at)
    }
}
