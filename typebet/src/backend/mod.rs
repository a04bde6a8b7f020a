//! Game backend interface.
//!
//! [`GameBackend`] is the seam between the round lifecycle and the remote
//! GraphQL service; [`GraphQlBackend`] is the production implementation.

use async_trait::async_trait;

mod error;
mod graphql;
mod models;

pub use error::UpstreamError;
pub use graphql::GraphQlBackend;
pub use models::{
    BetGame, BetReceipt, INSUFFICIENT_GOLD_MESSAGE, LOGIN_REQUIRED_MESSAGE, LoginReceipt,
    ResultSummary, ScoreReceipt, UserProfile,
};

/// Operations the game backend exposes.
///
/// Every method except [`login`](GameBackend::login) takes the caller's
/// access token and is expected to be invoked through
/// [`AuthGateway`](crate::gateway::AuthGateway).
#[async_trait]
pub trait GameBackend: Send + Sync {
    /// `createBet(betAmount)`: place a stake and open a round.
    async fn create_bet(&self, access_token: &str, stake: i64) -> Result<BetReceipt, UpstreamError>;

    /// `updateGameScore(gameId, accuracy, correctTyped)`: finish a play round.
    async fn update_game_score(
        &self,
        access_token: &str,
        round_id: &str,
        accuracy: f64,
        correct_typed: i64,
    ) -> Result<ScoreReceipt, UpstreamError>;

    /// `completePractice(accuracy, correctTyped)`: finish a simulated round.
    async fn complete_practice(
        &self,
        access_token: &str,
        accuracy: f64,
        correct_typed: i64,
    ) -> Result<ScoreReceipt, UpstreamError>;

    /// `gameResult(gameId)`: balance and ranking after a play round.
    async fn game_result(
        &self,
        access_token: &str,
        round_id: &str,
    ) -> Result<ResultSummary, UpstreamError>;

    /// `userInfo(id).gold`: the authoritative balance.
    async fn user_gold(&self, access_token: &str, user_id: &str) -> Result<i64, UpstreamError>;

    /// `loginUser(email, password)`.
    async fn login(&self, email: &str, password: &str) -> Result<LoginReceipt, UpstreamError>;
}
