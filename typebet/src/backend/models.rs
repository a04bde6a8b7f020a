//! Payloads returned by the game backend.

use serde::{Deserialize, Deserializer, Serialize};

use crate::credentials::Credential;

/// Message the backend puts in `errors` when the caller is not logged in.
pub const LOGIN_REQUIRED_MESSAGE: &str = "ログインが必要です";

/// Message the backend puts in `errors` when a bet exceeds the balance.
pub const INSUFFICIENT_GOLD_MESSAGE: &str = "所持金が不足しています";

/// Treat an explicit `null` list the same as a missing one.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Game row as embedded in the bet payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetGame {
    pub id: String,
    pub bet_amount: Option<i64>,
}

/// `createBet` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BetReceipt {
    pub game: Option<BetGame>,
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<String>,
}

impl BetReceipt {
    /// Id of the created round, if the bet was accepted.
    pub fn round_id(&self) -> Option<&str> {
        self.game.as_ref().map(|g| g.id.as_str())
    }
}

/// Score and gold change reported when a round is completed.
///
/// Built from either the `updateGameScore` or the `completePractice` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreReceipt {
    pub success: bool,
    pub errors: Vec<String>,
    pub score: Option<i64>,
    pub gold_change: Option<i64>,
}

/// Balance and ranking extras for a finished round (`gameResult`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub current_gold: Option<i64>,
    pub gold_change: Option<i64>,
    pub current_rank: Option<i64>,
    pub rank_change: Option<i64>,
    pub next_rank_gold: Option<i64>,
}

/// Public profile of the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub gold: i64,
}

/// `loginUser` result after token conversion.
#[derive(Debug, Clone)]
pub struct LoginReceipt {
    pub success: bool,
    pub errors: Vec<String>,
    pub user: Option<UserProfile>,
    pub credential: Option<Credential>,
}
