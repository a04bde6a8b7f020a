//! Application configuration.
//!
//! Everything is read from the process environment (a `.env` file is loaded by
//! `main` via `dotenvy`). Unset or unparsable values fall back to defaults;
//! values that parse but make no sense are rejected by [`AppConfig::validate`].

use std::path::PathBuf;
use std::time::Duration;

use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Default backend GraphQL endpoint (the backend service inside the compose network).
pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "http://backend:8000/graphql/";

/// Minimum accepted length for a configured capsule secret.
pub const MIN_SECRET_LEN: usize = 32;

/// Stake bounds accepted before any backend call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeLimits {
    pub min: i64,
    pub max: i64,
}

impl Default for StakeLimits {
    fn default() -> Self {
        Self { min: 100, max: 700 }
    }
}

impl StakeLimits {
    #[inline]
    pub fn contains(&self, stake: i64) -> bool {
        stake > 0 && stake >= self.min && stake <= self.max
    }
}

/// Top-level application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Backend GraphQL endpoint.
    pub graphql_endpoint: String,
    /// HTTP bind address.
    pub bind_address: String,
    /// HTTP port.
    pub port: u16,
    /// Enable permissive CORS.
    pub enable_cors: bool,
    /// HMAC secret used to sign round capsules.
    pub capsule_secret: String,
    /// Whether `capsule_secret` was generated for this process only.
    pub ephemeral_secret: bool,
    /// Lifetime of a round and of its result in the mailbox.
    pub round_ttl: chrono::Duration,
    /// Credentials expiring within this margin are refreshed before dispatch.
    pub refresh_margin: chrono::Duration,
    /// Lifetime of a login session.
    pub session_max_age: chrono::Duration,
    /// Timeout for a single backend request.
    pub backend_timeout: Duration,
    /// Locally enforced stake bounds.
    pub stake_limits: StakeLimits,
    /// Mark cookies `Secure`.
    pub cookie_secure: bool,
    /// Optional directory for rolling log files.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            graphql_endpoint: DEFAULT_GRAPHQL_ENDPOINT.to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
            capsule_secret: random_secret(),
            ephemeral_secret: true,
            round_ttl: chrono::Duration::seconds(300),
            refresh_margin: chrono::Duration::seconds(30),
            session_max_age: chrono::Duration::days(14),
            backend_timeout: Duration::from_secs(10),
            stake_limits: StakeLimits::default(),
            cookie_secure: false,
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `GRAPHQL_ENDPOINT`
    /// - `API_BIND_ADDRESS`, `API_PORT`, `ENABLE_CORS`
    /// - `CAPSULE_SECRET` (a random per-process secret is used when unset)
    /// - `ROUND_TTL_SECS`, `REFRESH_MARGIN_SECS`, `SESSION_MAX_AGE_SECS`
    /// - `BACKEND_TIMEOUT_SECS`
    /// - `MIN_STAKE`, `MAX_STAKE`
    /// - `COOKIE_SECURE`
    /// - `LOG_DIR`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("GRAPHQL_ENDPOINT")
            && !endpoint.trim().is_empty()
        {
            config.graphql_endpoint = endpoint.trim().to_string();
        }

        if let Ok(bind_address) = std::env::var("API_BIND_ADDRESS")
            && !bind_address.trim().is_empty()
        {
            config.bind_address = bind_address;
        }

        if let Some(port) = env_parse::<u16>("API_PORT") {
            config.port = port;
        }

        if let Some(enable_cors) = env_flag("ENABLE_CORS") {
            config.enable_cors = enable_cors;
        }

        if let Ok(secret) = std::env::var("CAPSULE_SECRET")
            && !secret.is_empty()
        {
            config.capsule_secret = secret;
            config.ephemeral_secret = false;
        }

        if let Some(secs) = env_parse::<i64>("ROUND_TTL_SECS") {
            config.round_ttl = chrono::Duration::seconds(secs);
        }

        if let Some(secs) = env_parse::<i64>("REFRESH_MARGIN_SECS") {
            config.refresh_margin = chrono::Duration::seconds(secs);
        }

        if let Some(secs) = env_parse::<i64>("SESSION_MAX_AGE_SECS") {
            config.session_max_age = chrono::Duration::seconds(secs);
        }

        if let Some(secs) = env_parse::<u64>("BACKEND_TIMEOUT_SECS") {
            config.backend_timeout = Duration::from_secs(secs);
        }

        if let Some(min) = env_parse::<i64>("MIN_STAKE") {
            config.stake_limits.min = min;
        }

        if let Some(max) = env_parse::<i64>("MAX_STAKE") {
            config.stake_limits.max = max;
        }

        if let Some(secure) = env_flag("COOKIE_SECURE") {
            config.cookie_secure = secure;
        }

        if let Ok(dir) = std::env::var("LOG_DIR")
            && !dir.trim().is_empty()
        {
            config.log_dir = Some(PathBuf::from(dir));
        }

        config.validate()?;
        Ok(config)
    }

    /// The backend endpoint as a parsed URL.
    pub fn graphql_url(&self) -> Result<Url> {
        Url::parse(&self.graphql_endpoint).map_err(|e| {
            Error::config(format!(
                "invalid GRAPHQL_ENDPOINT '{}': {}",
                self.graphql_endpoint, e
            ))
        })
    }

    /// Reject configurations that would break runtime invariants.
    pub fn validate(&self) -> Result<()> {
        self.graphql_url()?;

        if self.capsule_secret.len() < MIN_SECRET_LEN {
            return Err(Error::config(format!(
                "CAPSULE_SECRET must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        if self.round_ttl <= chrono::Duration::zero() {
            return Err(Error::config("ROUND_TTL_SECS must be positive"));
        }

        if self.refresh_margin < chrono::Duration::zero() {
            return Err(Error::config("REFRESH_MARGIN_SECS must not be negative"));
        }

        if self.session_max_age <= chrono::Duration::zero() {
            return Err(Error::config("SESSION_MAX_AGE_SECS must be positive"));
        }

        let limits = self.stake_limits;
        if limits.min < 1 || limits.min > limits.max {
            return Err(Error::config(format!(
                "invalid stake limits: min={} max={}",
                limits.min, limits.max
            )));
        }

        Ok(())
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("graphql_endpoint", &self.graphql_endpoint)
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("enable_cors", &self.enable_cors)
            .field("ephemeral_secret", &self.ephemeral_secret)
            .field("round_ttl", &self.round_ttl)
            .field("refresh_margin", &self.refresh_margin)
            .field("session_max_age", &self.session_max_age)
            .field("backend_timeout", &self.backend_timeout)
            .field("stake_limits", &self.stake_limits)
            .field("cookie_secure", &self.cookie_secure)
            .field("log_dir", &self.log_dir)
            .finish_non_exhaustive()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn random_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 3000);
        assert_eq!(config.round_ttl, chrono::Duration::seconds(300));
        assert_eq!(config.stake_limits, StakeLimits { min: 100, max: 700 });
        assert_eq!(config.capsule_secret.len(), 64);
    }

    #[test]
    fn test_random_secrets_differ() {
        assert_ne!(random_secret(), random_secret());
    }

    #[test]
    fn test_rejects_short_secret() {
        let config = AppConfig {
            capsule_secret: "short".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_rejects_inverted_stake_limits() {
        let config = AppConfig {
            stake_limits: StakeLimits { min: 800, max: 700 },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        let config = AppConfig {
            graphql_endpoint: "not a url".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stake_limits_contains() {
        let limits = StakeLimits::default();
        assert!(!limits.contains(0));
        assert!(!limits.contains(-100));
        assert!(!limits.contains(99));
        assert!(limits.contains(100));
        assert!(limits.contains(700));
        assert!(!limits.contains(701));
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = AppConfig::default();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains(&config.capsule_secret));
    }
}
