//! In-process backend used by unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::backend::{
    BetGame, BetReceipt, GameBackend, INSUFFICIENT_GOLD_MESSAGE, LoginReceipt, ResultSummary,
    ScoreReceipt, UpstreamError, UserProfile,
};
use crate::credentials::Credential;
use crate::gateway::{RefreshError, TokenRefresher};
use crate::session::{SessionContext, SessionRegistry, SessionSettings};

pub(crate) const PASSWORD: &str = "correct horse";

/// Scripted backend that keeps an authoritative balance and counts calls.
pub(crate) struct FakeBackend {
    pub gold: AtomicI64,
    pub score: AtomicI64,
    pub gold_change: AtomicI64,
    pub calls: AtomicUsize,
    pub refreshes: AtomicUsize,
    pub unavailable: AtomicBool,
    pub summary_unavailable: AtomicBool,
    bets: Mutex<HashMap<String, i64>>,
    next_round: AtomicUsize,
}

impl FakeBackend {
    pub fn new(gold: i64) -> Arc<Self> {
        Arc::new(Self {
            gold: AtomicI64::new(gold),
            score: AtomicI64::new(120),
            gold_change: AtomicI64::new(50),
            calls: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            summary_unavailable: AtomicBool::new(false),
            bets: Mutex::new(HashMap::new()),
            next_round: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn gold(&self) -> i64 {
        self.gold.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(UpstreamError::Http { status: 503 });
        }
        Ok(())
    }

    fn scored(&self) -> ScoreReceipt {
        ScoreReceipt {
            success: true,
            errors: Vec::new(),
            score: Some(self.score.load(Ordering::SeqCst)),
            gold_change: Some(self.gold_change.load(Ordering::SeqCst)),
        }
    }
}

#[async_trait]
impl GameBackend for FakeBackend {
    async fn create_bet(&self, _access_token: &str, stake: i64) -> Result<BetReceipt, UpstreamError> {
        self.enter()?;
        if stake > self.gold() {
            return Ok(BetReceipt {
                game: None,
                success: false,
                errors: vec![INSUFFICIENT_GOLD_MESSAGE.to_string()],
            });
        }

        self.gold.fetch_sub(stake, Ordering::SeqCst);
        let id = format!("R{}", self.next_round.fetch_add(1, Ordering::SeqCst) + 1);
        self.bets.lock().insert(id.clone(), stake);

        Ok(BetReceipt {
            game: Some(BetGame {
                id,
                bet_amount: Some(stake),
            }),
            success: true,
            errors: Vec::new(),
        })
    }

    async fn update_game_score(
        &self,
        _access_token: &str,
        round_id: &str,
        _accuracy: f64,
        _correct_typed: i64,
    ) -> Result<ScoreReceipt, UpstreamError> {
        self.enter()?;
        let Some(stake) = self.bets.lock().remove(round_id) else {
            return Ok(ScoreReceipt {
                success: false,
                errors: vec!["ゲームが見つかりません".to_string()],
                ..Default::default()
            });
        };

        let receipt = self.scored();
        self.gold
            .fetch_add(stake + receipt.gold_change.unwrap_or(0), Ordering::SeqCst);
        Ok(receipt)
    }

    async fn complete_practice(
        &self,
        _access_token: &str,
        _accuracy: f64,
        _correct_typed: i64,
    ) -> Result<ScoreReceipt, UpstreamError> {
        self.enter()?;
        Ok(ScoreReceipt {
            gold_change: Some(0),
            ..self.scored()
        })
    }

    async fn game_result(
        &self,
        _access_token: &str,
        _round_id: &str,
    ) -> Result<ResultSummary, UpstreamError> {
        self.enter()?;
        if self.summary_unavailable.load(Ordering::SeqCst) {
            return Err(UpstreamError::Http { status: 500 });
        }
        Ok(ResultSummary {
            current_gold: Some(self.gold()),
            gold_change: Some(self.gold_change.load(Ordering::SeqCst)),
            current_rank: Some(3),
            rank_change: Some(1),
            next_rank_gold: Some(200),
        })
    }

    async fn user_gold(&self, _access_token: &str, _user_id: &str) -> Result<i64, UpstreamError> {
        self.enter()?;
        Ok(self.gold())
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginReceipt, UpstreamError> {
        self.enter()?;
        if password != PASSWORD {
            return Ok(LoginReceipt {
                success: false,
                errors: vec!["メールアドレスまたはパスワードが正しくありません".to_string()],
                user: None,
                credential: None,
            });
        }

        Ok(LoginReceipt {
            success: true,
            errors: Vec::new(),
            user: Some(user_profile(email, self.gold())),
            credential: Some(fresh_credential("login")),
        })
    }
}

#[async_trait]
impl TokenRefresher for FakeBackend {
    async fn refresh(&self, _refresh_token: &str) -> Result<Credential, RefreshError> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(fresh_credential(&format!("refreshed-{n}")))
    }
}

pub(crate) fn user_profile(email: &str, gold: i64) -> UserProfile {
    UserProfile {
        id: "user-1".to_string(),
        name: "tester".to_string(),
        email: email.to_string(),
        icon: None,
        gold,
    }
}

pub(crate) fn fresh_credential(tag: &str) -> Credential {
    Credential::new(
        format!("access-{tag}"),
        format!("refresh-{tag}"),
        Utc::now() + chrono::Duration::hours(1),
    )
}

/// Registry whose sessions refresh through `backend`.
pub(crate) fn registry(backend: &Arc<FakeBackend>) -> Arc<SessionRegistry> {
    let refresher: Arc<dyn TokenRefresher> = backend.clone();
    Arc::new(SessionRegistry::new(refresher, SessionSettings::default()))
}

/// A logged-in session without going through the login call.
pub(crate) fn session(backend: &Arc<FakeBackend>) -> (Arc<SessionRegistry>, Arc<SessionContext>) {
    let registry = registry(backend);
    let session = registry.create(
        user_profile("tester@example.com", backend.gold()),
        fresh_credential("0"),
    );
    (registry, session)
}
