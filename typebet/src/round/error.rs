//! Round lifecycle errors.

use thiserror::Error;

use crate::gateway::GatewayError;

use super::capsule::CapsuleError;

#[derive(Debug, Error)]
pub enum RoundError {
    /// Rejected locally; no backend call was made.
    #[error("Invalid stake {stake}: must be between {min} and {max}")]
    InvalidStake { stake: i64, min: i64, max: i64 },

    /// Completion figures out of range; no backend call was made.
    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("{0}")]
    InsufficientBalance(String),

    /// Backend-reported bet errors, verbatim.
    #[error("{}", .0.join("\n"))]
    BetRejected(Vec<String>),

    /// Unknown, superseded, already completed or expired round.
    #[error("Round not found")]
    RoundNotFound,

    #[error(transparent)]
    Unauthenticated(GatewayError),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error(transparent)]
    Capsule(#[from] CapsuleError),
}

impl RoundError {
    pub fn requires_relogin(&self) -> bool {
        matches!(self, Self::Unauthenticated(_))
    }
}

impl From<GatewayError> for RoundError {
    fn from(err: GatewayError) -> Self {
        if err.requires_relogin() {
            Self::Unauthenticated(err)
        } else {
            Self::BackendUnavailable(err.to_string())
        }
    }
}
