//! Backend call errors.

use thiserror::Error;

/// Errors reported by a single backend call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The backend did not accept the access token.
    #[error("Backend rejected the access token")]
    Unauthorized,

    /// Transport failure (connect, timeout, body read).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status other than 401.
    #[error("Backend returned HTTP {status}")]
    Http { status: u16 },

    /// Top-level GraphQL errors.
    #[error("GraphQL error: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    /// The response did not have the expected shape.
    #[error("Malformed backend response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Whether the call failed because the credential was not accepted.
    #[inline]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(UpstreamError::Unauthorized.is_auth_failure());
        assert!(!UpstreamError::Http { status: 503 }.is_auth_failure());
        assert!(!UpstreamError::GraphQl(vec!["boom".into()]).is_auth_failure());
    }

    #[test]
    fn test_graphql_message_joins_errors() {
        let err = UpstreamError::GraphQl(vec!["first".into(), "second".into()]);
        assert_eq!(err.to_string(), "GraphQL error: first; second");
    }
}
