//! Round records and the handle returned to the client.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a round is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// A real bet placed through `createBet`.
    Play,
    /// Practice round; no gold is staked on the backend.
    Simulate,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Simulate => "simulate",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(Self::Play),
            "simulate" => Ok(Self::Simulate),
            other => Err(format!("unknown game mode: {other}")),
        }
    }
}

/// A staked game round. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub round_id: String,
    pub mode: GameMode,
    pub stake: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Round {
    pub fn new(
        round_id: impl Into<String>,
        mode: GameMode,
        stake: i64,
        created_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            round_id: round_id.into(),
            mode,
            stake,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// What the caller gets back from round creation: the round plus its signed
/// capsule, which must be presented to resolve or complete the round.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundHandle {
    #[serde(flatten)]
    pub round: Round,
    pub token: String,
}

impl RoundHandle {
    pub fn round_id(&self) -> &str {
        &self.round.round_id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.round.expires_at
    }
}
