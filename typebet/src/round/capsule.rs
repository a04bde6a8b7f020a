//! Signed round capsules.
//!
//! A capsule is an HS256 JWT that carries a round's identity to the browser
//! and back. It is bound to one session and carries a millisecond expiry that
//! is checked against the caller's clock, so there is no leeway.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::types::{GameMode, Round};

const CAPSULE_TYPE: &str = "round";

/// Capsule claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundClaims {
    /// Session id the round belongs to
    pub sub: String,
    /// Round id
    pub rid: String,
    pub mode: GameMode,
    pub stake: i64,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
    /// Expiration (Unix milliseconds), authoritative
    pub exp_ms: i64,
    pub typ: String,
}

/// Capsule error types.
#[derive(Debug, thiserror::Error)]
pub enum CapsuleError {
    #[error("Capsule signing failed: {0}")]
    Signing(String),
    #[error("Invalid capsule")]
    Invalid,
    #[error("Capsule expired")]
    Expired,
    #[error("Capsule belongs to another session")]
    WrongSession,
}

/// Seals and opens round capsules with one HMAC secret.
#[derive(Clone)]
pub struct CapsuleSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl CapsuleSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Seal `round` for `session_id`.
    pub fn seal(&self, session_id: &str, round: &Round) -> Result<String, CapsuleError> {
        let claims = RoundClaims {
            sub: session_id.to_string(),
            rid: round.round_id.clone(),
            mode: round.mode,
            stake: round.stake,
            iat: round.created_at.timestamp(),
            exp: round.expires_at.timestamp(),
            exp_ms: round.expires_at.timestamp_millis(),
            typ: CAPSULE_TYPE.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| CapsuleError::Signing(e.to_string()))
    }

    /// Verify `token` and return its claims.
    ///
    /// Fails on a bad signature, a foreign session, or `now >= exp_ms`.
    pub fn open(
        &self,
        token: &str,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RoundClaims, CapsuleError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below with millisecond precision.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<RoundClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| CapsuleError::Invalid)?;

        if claims.typ != CAPSULE_TYPE {
            return Err(CapsuleError::Invalid);
        }
        if claims.sub != session_id {
            return Err(CapsuleError::WrongSession);
        }
        if now.timestamp_millis() >= claims.exp_ms {
            return Err(CapsuleError::Expired);
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for CapsuleSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapsuleSigner").finish_non_exhaustive()
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_capsule_never_opens_at_or_after_expiry(
            ttl_ms in 1i64..600_000,
            late_ms in 0i64..600_000,
        ) {
            let signer = CapsuleSigner::new("test-secret-key-32-chars-long!!!");
            let now = Utc::now();
            let round = Round::new("R1", GameMode::Play, 100, now, chrono::Duration::milliseconds(ttl_ms));
            let token = signer.seal("s", &round).unwrap();

            let presented_at = round.expires_at + chrono::Duration::milliseconds(late_ms);
            prop_assert!(matches!(signer.open(&token, "s", presented_at), Err(CapsuleError::Expired)));
        }
    }
}
