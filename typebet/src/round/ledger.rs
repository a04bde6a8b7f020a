//! Round ledger: stake validation, bet creation, capsule minting and round
//! completion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::backend::{GameBackend, INSUFFICIENT_GOLD_MESSAGE, ScoreReceipt};
use crate::config::StakeLimits;
use crate::mailbox::GameResult;
use crate::session::SessionContext;

use super::capsule::{CapsuleError, CapsuleSigner};
use super::error::RoundError;
use super::types::{GameMode, Round, RoundHandle};

const BET_FAILED_MESSAGE: &str = "掛け金の設定に失敗しました";
const COMPLETION_FAILED_MESSAGE: &str = "スコアの更新に失敗しました";

/// Creates, resolves and completes rounds for sessions.
pub struct RoundLedger {
    backend: Arc<dyn GameBackend>,
    capsules: CapsuleSigner,
    ttl: chrono::Duration,
    limits: StakeLimits,
}

impl RoundLedger {
    pub fn new(
        backend: Arc<dyn GameBackend>,
        capsules: CapsuleSigner,
        ttl: chrono::Duration,
        limits: StakeLimits,
    ) -> Self {
        Self {
            backend,
            capsules,
            ttl,
            limits,
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Open a round staking `stake` gold.
    ///
    /// The stake is checked locally before anything else; affordability is
    /// left to the backend's `createBet`. The new round supersedes any live
    /// round of the session.
    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn create_round(
        &self,
        session: &SessionContext,
        stake: i64,
        mode: GameMode,
    ) -> Result<RoundHandle, RoundError> {
        if !self.limits.contains(stake) {
            return Err(RoundError::InvalidStake {
                stake,
                min: self.limits.min,
                max: self.limits.max,
            });
        }

        let round_id = match mode {
            GameMode::Play => self.place_bet(session, stake).await?,
            GameMode::Simulate => Uuid::new_v4().to_string(),
        };

        let round = Round::new(round_id, mode, stake, Utc::now(), self.ttl);
        let token = self.capsules.seal(session.id(), &round)?;

        if let Some(previous) = session.active_round().install(round.clone()) {
            debug!(round_id = %previous.round_id, "Superseded live round");
        }

        info!(
            round_id = %round.round_id,
            mode = %mode,
            stake,
            expires_at = %round.expires_at,
            "Round created"
        );

        Ok(RoundHandle { round, token })
    }

    async fn place_bet(&self, session: &SessionContext, stake: i64) -> Result<String, RoundError> {
        let receipt = session
            .gateway()
            .execute(|token| async move { self.backend.create_bet(&token, stake).await })
            .await?;

        if !receipt.success {
            if let Some(message) = receipt
                .errors
                .iter()
                .find(|e| e.contains(INSUFFICIENT_GOLD_MESSAGE))
            {
                return Err(RoundError::InsufficientBalance(message.clone()));
            }
            warn!(errors = ?receipt.errors, "Backend rejected bet");
            if receipt.errors.is_empty() {
                return Err(RoundError::BetRejected(vec![BET_FAILED_MESSAGE.to_string()]));
            }
            return Err(RoundError::BetRejected(receipt.errors));
        }

        receipt
            .round_id()
            .map(str::to_string)
            .ok_or_else(|| RoundError::BackendUnavailable("createBet returned no game".into()))
    }

    /// The round behind `token`, if it is still live for this session.
    pub fn resolve(&self, session: &SessionContext, token: &str) -> Option<Round> {
        self.resolve_at(session, token, Utc::now())
    }

    pub fn resolve_at(
        &self,
        session: &SessionContext,
        token: &str,
        now: DateTime<Utc>,
    ) -> Option<Round> {
        match self.capsules.open(token, session.id(), now) {
            Ok(claims) => session.active_round().current(&claims.rid, now),
            Err(CapsuleError::Expired) => {
                session.active_round().clear_expired(now);
                None
            }
            Err(e) => {
                debug!(error = %e, "Capsule did not resolve");
                None
            }
        }
    }

    /// Complete the round behind `token` and deposit its result.
    ///
    /// The round is consumed first, so a capsule completes at most once.
    /// Backend-reported failures are deposited as a failed result rather than
    /// returned as errors.
    #[instrument(skip(self, session, token), fields(session_id = %session.id()))]
    pub async fn complete_round(
        &self,
        session: &SessionContext,
        token: &str,
        accuracy: f64,
        correct_typed: i64,
    ) -> Result<GameResult, RoundError> {
        validate_score(accuracy, correct_typed)?;

        let now = Utc::now();
        let claims = self.capsules.open(token, session.id(), now).map_err(|e| {
            debug!(error = %e, "Capsule rejected on completion");
            if matches!(e, CapsuleError::Expired) {
                session.active_round().clear_expired(now);
            }
            RoundError::RoundNotFound
        })?;

        let round = session
            .active_round()
            .consume(&claims.rid, now)
            .ok_or(RoundError::RoundNotFound)?;

        let round_id = round.round_id.as_str();
        let gateway = session.gateway();

        let receipt: ScoreReceipt = match round.mode {
            GameMode::Play => {
                gateway
                    .execute(|token| async move {
                        self.backend
                            .update_game_score(&token, round_id, accuracy, correct_typed)
                            .await
                    })
                    .await?
            }
            GameMode::Simulate => {
                gateway
                    .execute(|token| async move {
                        self.backend
                            .complete_practice(&token, accuracy, correct_typed)
                            .await
                    })
                    .await?
            }
        };

        let result = if !receipt.success {
            warn!(round_id, errors = ?receipt.errors, "Backend reported a failed completion");
            let message = if receipt.errors.is_empty() {
                COMPLETION_FAILED_MESSAGE.to_string()
            } else {
                receipt.errors.join("\n")
            };
            GameResult::failed(round.mode, message)
        } else {
            let result = GameResult::succeeded(
                round.mode,
                receipt.score.unwrap_or(0),
                receipt.gold_change.unwrap_or(0),
            );

            match round.mode {
                GameMode::Play => {
                    match gateway
                        .execute(|token| async move { self.backend.game_result(&token, round_id).await })
                        .await
                    {
                        Ok(summary) => {
                            if let Some(gold) = summary.current_gold {
                                session.set_cached_gold(gold);
                            }
                            result.with_summary(summary)
                        }
                        Err(e) => {
                            warn!(round_id, error = %e, "Result summary unavailable");
                            result
                        }
                    }
                }
                GameMode::Simulate => result,
            }
        };

        session.mailbox().deposit(result.clone());
        info!(
            round_id,
            success = result.success,
            score = result.score,
            gold_change = result.gold_change,
            "Round completed"
        );

        Ok(result)
    }
}

fn validate_score(accuracy: f64, correct_typed: i64) -> Result<(), RoundError> {
    if !accuracy.is_finite() || accuracy <= 0.0 || accuracy > 1.0 {
        return Err(RoundError::InvalidScore(format!(
            "accuracy must be in (0, 1], got {accuracy}"
        )));
    }
    if correct_typed < 0 {
        return Err(RoundError::InvalidScore(format!(
            "correct_typed must not be negative, got {correct_typed}"
        )));
    }
    Ok(())
}

impl std::fmt::Debug for RoundLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundLedger")
            .field("ttl", &self.ttl)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::testing::{self, FakeBackend};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_non_positive_stake_is_rejected_without_network(
            stake in i64::MIN..=0,
            simulate in any::<bool>(),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let backend = FakeBackend::new(1_000_000);
            let (_registry, session) = testing::session(&backend);
            let game_backend: Arc<dyn GameBackend> = backend.clone();
            let ledger = RoundLedger::new(
                game_backend,
                CapsuleSigner::new("test-secret-key-32-chars-long!!!"),
                chrono::Duration::minutes(5),
                StakeLimits::default(),
            );
            let mode = if simulate { GameMode::Simulate } else { GameMode::Play };

            let result = runtime.block_on(ledger.create_round(&session, stake, mode));

            let is_invalid_stake = matches!(result, Err(RoundError::InvalidStake { .. }));
            prop_assert!(is_invalid_stake);
            prop_assert_eq!(backend.calls(), 0);
        }
    }
}
