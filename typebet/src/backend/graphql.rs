//! GraphQL client for the game backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::credentials::Credential;
use crate::gateway::{RefreshError, TokenRefresher};
use crate::utils::http_client::build_backend_client;

use super::GameBackend;
use super::error::UpstreamError;
use super::models::{
    BetReceipt, LOGIN_REQUIRED_MESSAGE, LoginReceipt, ResultSummary, ScoreReceipt, UserProfile,
    null_as_empty,
};

const CREATE_BET: &str = r#"
mutation Bet($betAmount: Int!) {
  createBet(betAmount: $betAmount) {
    game { id betAmount }
    success
    errors
  }
}"#;

const UPDATE_GAME_SCORE: &str = r#"
mutation CompletePlay($gameId: UUID!, $accuracy: Float!, $correctTyped: Int!) {
  updateGameScore(gameId: $gameId, accuracy: $accuracy, correctTyped: $correctTyped) {
    game { id score goldChange }
    success
    errors
  }
}"#;

const COMPLETE_PRACTICE: &str = r#"
mutation CompletePractice($accuracy: Float!, $correctTyped: Int!) {
  completePractice(accuracy: $accuracy, correctTyped: $correctTyped) {
    success
    errors
    score
    goldChange
  }
}"#;

const GAME_RESULT: &str = r#"
query GetGameResult($gameId: UUID!) {
  gameResult(gameId: $gameId) {
    currentGold
    goldChange
    currentRank
    rankChange
    nextRankGold
  }
}"#;

const USER_GOLD: &str = r#"
query GetUserGold($userId: UUID!) {
  userInfo(userId: $userId) { gold }
}"#;

const REFRESH_TOKEN: &str = r#"
mutation RefreshToken($refreshToken: String!) {
  refreshToken(refreshToken: $refreshToken) {
    success
    errors
    oauthAuthenticate {
      tokens { accessToken refreshToken expiresAt }
    }
  }
}"#;

const LOGIN: &str = r#"
mutation Login($email: String!, $password: String!) {
  loginUser(email: $email, password: $password) {
    success
    errors
    user { id name email icon gold }
    tokens { accessToken refreshToken expiresAt }
  }
}"#;

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<D> {
    data: Option<D>,
    #[serde(default, deserialize_with = "null_as_empty")]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    message: String,
    #[serde(default)]
    extensions: Option<Value>,
}

impl ErrorEntry {
    fn is_unauthenticated(&self) -> bool {
        self.message.contains(LOGIN_REQUIRED_MESSAGE)
            || self
                .extensions
                .as_ref()
                .and_then(|ext| ext.get("code"))
                .and_then(Value::as_str)
                .is_some_and(|code| code == "UNAUTHENTICATED")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBetData {
    create_bet: Option<BetReceipt>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoredGame {
    score: Option<i64>,
    gold_change: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct UpdateScorePayload {
    game: Option<ScoredGame>,
    #[serde(default)]
    success: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateScoreData {
    update_game_score: Option<UpdateScorePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PracticePayload {
    #[serde(default)]
    success: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    errors: Vec<String>,
    score: Option<i64>,
    gold_change: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PracticeData {
    complete_practice: Option<PracticePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameResultData {
    game_result: Option<ResultSummary>,
}

#[derive(Debug, Deserialize)]
struct UserGold {
    gold: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserGoldData {
    user_info: Option<UserGold>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPair {
    access_token: String,
    refresh_token: String,
    /// Unix seconds.
    expires_at: i64,
}

impl TokenPair {
    fn into_credential(self) -> Option<Credential> {
        Credential::from_unix_expiry(self.access_token, self.refresh_token, self.expires_at)
    }
}

#[derive(Debug, Deserialize)]
struct IssuedTokens {
    tokens: Option<TokenPair>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshPayload {
    #[serde(default)]
    success: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    errors: Vec<String>,
    oauth_authenticate: Option<IssuedTokens>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    refresh_token: Option<RefreshPayload>,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    success: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    errors: Vec<String>,
    user: Option<UserProfile>,
    tokens: Option<TokenPair>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    login_user: Option<LoginPayload>,
}

/// Map payload-level "login required" errors to an auth failure.
///
/// The backend stringifies its validation errors, so the message may arrive
/// wrapped (e.g. `['ログインが必要です']`).
fn ensure_logged_in(errors: &[String]) -> Result<(), UpstreamError> {
    if errors.iter().any(|e| e.contains(LOGIN_REQUIRED_MESSAGE)) {
        return Err(UpstreamError::Unauthorized);
    }
    Ok(())
}

fn missing(field: &str) -> UpstreamError {
    UpstreamError::Decode(format!("response is missing `{field}`"))
}

/// [`GameBackend`] and [`TokenRefresher`] over the backend's GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GraphQlBackend {
    client: reqwest::Client,
    endpoint: Url,
}

impl GraphQlBackend {
    pub fn new(endpoint: Url, request_timeout: Duration) -> Self {
        Self {
            client: build_backend_client(request_timeout),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST one GraphQL document and decode its `data`.
    async fn request<D: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
        access_token: Option<&str>,
    ) -> Result<D, UpstreamError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "query": query, "variables": variables }));

        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(UpstreamError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Backend returned an error status");
            return Err(UpstreamError::Http {
                status: status.as_u16(),
            });
        }

        let envelope: Envelope<D> = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        if envelope.errors.iter().any(ErrorEntry::is_unauthenticated) {
            return Err(UpstreamError::Unauthorized);
        }
        if !envelope.errors.is_empty() {
            return Err(UpstreamError::GraphQl(
                envelope.errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        envelope.data.ok_or_else(|| missing("data"))
    }
}

#[async_trait]
impl GameBackend for GraphQlBackend {
    #[instrument(skip(self, access_token))]
    async fn create_bet(&self, access_token: &str, stake: i64) -> Result<BetReceipt, UpstreamError> {
        let data: CreateBetData = self
            .request(CREATE_BET, json!({ "betAmount": stake }), Some(access_token))
            .await?;
        let receipt = data.create_bet.ok_or_else(|| missing("createBet"))?;
        ensure_logged_in(&receipt.errors)?;
        debug!(success = receipt.success, round_id = ?receipt.round_id(), "createBet");
        Ok(receipt)
    }

    #[instrument(skip(self, access_token))]
    async fn update_game_score(
        &self,
        access_token: &str,
        round_id: &str,
        accuracy: f64,
        correct_typed: i64,
    ) -> Result<ScoreReceipt, UpstreamError> {
        let data: UpdateScoreData = self
            .request(
                UPDATE_GAME_SCORE,
                json!({
                    "gameId": round_id,
                    "accuracy": accuracy,
                    "correctTyped": correct_typed,
                }),
                Some(access_token),
            )
            .await?;
        let payload = data
            .update_game_score
            .ok_or_else(|| missing("updateGameScore"))?;
        ensure_logged_in(&payload.errors)?;

        let (score, gold_change) = payload
            .game
            .map(|g| (g.score, g.gold_change))
            .unwrap_or_default();

        Ok(ScoreReceipt {
            success: payload.success,
            errors: payload.errors,
            score,
            gold_change,
        })
    }

    #[instrument(skip(self, access_token))]
    async fn complete_practice(
        &self,
        access_token: &str,
        accuracy: f64,
        correct_typed: i64,
    ) -> Result<ScoreReceipt, UpstreamError> {
        let data: PracticeData = self
            .request(
                COMPLETE_PRACTICE,
                json!({ "accuracy": accuracy, "correctTyped": correct_typed }),
                Some(access_token),
            )
            .await?;
        let payload = data
            .complete_practice
            .ok_or_else(|| missing("completePractice"))?;
        ensure_logged_in(&payload.errors)?;

        Ok(ScoreReceipt {
            success: payload.success,
            errors: payload.errors,
            score: payload.score,
            gold_change: payload.gold_change,
        })
    }

    #[instrument(skip(self, access_token))]
    async fn game_result(
        &self,
        access_token: &str,
        round_id: &str,
    ) -> Result<ResultSummary, UpstreamError> {
        let data: GameResultData = self
            .request(GAME_RESULT, json!({ "gameId": round_id }), Some(access_token))
            .await?;
        data.game_result.ok_or_else(|| missing("gameResult"))
    }

    #[instrument(skip(self, access_token))]
    async fn user_gold(&self, access_token: &str, user_id: &str) -> Result<i64, UpstreamError> {
        let data: UserGoldData = self
            .request(USER_GOLD, json!({ "userId": user_id }), Some(access_token))
            .await?;
        data.user_info
            .map(|u| u.gold)
            .ok_or_else(|| missing("userInfo"))
    }

    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &str) -> Result<LoginReceipt, UpstreamError> {
        let data: LoginData = self
            .request(LOGIN, json!({ "email": email, "password": password }), None)
            .await?;
        let payload = data.login_user.ok_or_else(|| missing("loginUser"))?;

        let credential = match payload.tokens {
            Some(pair) => Some(
                pair.into_credential()
                    .ok_or_else(|| UpstreamError::Decode("token expiry out of range".into()))?,
            ),
            None => None,
        };

        Ok(LoginReceipt {
            success: payload.success,
            errors: payload.errors,
            user: payload.user,
            credential,
        })
    }
}

#[async_trait]
impl TokenRefresher for GraphQlBackend {
    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<Credential, RefreshError> {
        let data: RefreshData = match self
            .request(
                REFRESH_TOKEN,
                json!({ "refreshToken": refresh_token }),
                None,
            )
            .await
        {
            Ok(data) => data,
            Err(UpstreamError::GraphQl(messages)) => {
                return Err(RefreshError::Rejected(messages.join("; ")));
            }
            Err(UpstreamError::Unauthorized) => {
                return Err(RefreshError::Rejected("refresh token not accepted".into()));
            }
            Err(e) => return Err(e.into()),
        };

        let payload = data
            .refresh_token
            .ok_or_else(|| RefreshError::Upstream(missing("refreshToken")))?;

        if !payload.success {
            let reason = if payload.errors.is_empty() {
                "refresh token not accepted".to_string()
            } else {
                payload.errors.join("; ")
            };
            return Err(RefreshError::Rejected(reason));
        }

        let pair = payload
            .oauth_authenticate
            .and_then(|issued| issued.tokens)
            .ok_or_else(|| RefreshError::Rejected("no token pair returned".into()))?;

        pair.into_credential().ok_or_else(|| {
            RefreshError::Upstream(UpstreamError::Decode("token expiry out of range".into()))
        })
    }
}
