//! API server setup and configuration.

use axum::Router;
use axum::extract::Request;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::cookies::CookieSettings;
use crate::api::routes;
use crate::backend::GameBackend;
use crate::config::AppConfig;
use crate::error::Result;
use crate::gateway::TokenRefresher;
use crate::gold::GoldSynchronizer;
use crate::round::{CapsuleSigner, RoundLedger};
use crate::session::{AuthService, SessionRegistry, SessionSettings};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// How often expired sessions are pruned
    pub session_prune_interval: Duration,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
            session_prune_interval: Duration::from_secs(60),
        }
    }
}

impl From<&AppConfig> for ApiServerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            bind_address: config.bind_address.clone(),
            port: config.port,
            enable_cors: config.enable_cors,
            ..Self::default()
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    /// Live sessions
    pub sessions: Arc<SessionRegistry>,
    /// Login/logout
    pub auth_service: Arc<AuthService>,
    /// Round lifecycle
    pub ledger: Arc<RoundLedger>,
    /// Best-effort balance refresh
    pub gold: Arc<GoldSynchronizer>,
    pub cookies: CookieSettings,
    /// Session cookie lifetime in seconds
    pub session_max_age_secs: i64,
}

impl AppState {
    /// Wire every service against one backend.
    pub fn new<B>(backend: Arc<B>, config: &AppConfig) -> Self
    where
        B: GameBackend + TokenRefresher + 'static,
    {
        let game_backend: Arc<dyn GameBackend> = backend.clone();
        let refresher: Arc<dyn TokenRefresher> = backend;

        let sessions = Arc::new(SessionRegistry::new(
            refresher,
            SessionSettings {
                max_age: config.session_max_age,
                refresh_margin: config.refresh_margin,
                round_ttl: config.round_ttl,
            },
        ));

        let ledger = RoundLedger::new(
            Arc::clone(&game_backend),
            CapsuleSigner::new(&config.capsule_secret),
            config.round_ttl,
            config.stake_limits,
        );

        Self {
            start_time: Instant::now(),
            auth_service: Arc::new(AuthService::new(
                Arc::clone(&game_backend),
                Arc::clone(&sessions),
            )),
            sessions,
            ledger: Arc::new(ledger),
            gold: Arc::new(GoldSynchronizer::new(game_backend)),
            cookies: CookieSettings {
                secure: config.cookie_secure,
            },
            session_max_age_secs: config.session_max_age.num_seconds(),
        }
    }
}

/// Periodically drop expired sessions until `cancel_token` fires.
pub fn spawn_session_pruner(
    sessions: Arc<SessionRegistry>,
    interval: Duration,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = ticker.tick() => {
                    let pruned = sessions.prune_expired();
                    if pruned > 0 {
                        tracing::debug!(pruned, remaining = sessions.len(), "Pruned expired sessions");
                    }
                }
            }
        }
    })
}

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    /// Create with state.
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        let mut router = routes::create_router(self.state.clone());

        // Add CORS if enabled
        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        // Add tracing
        router = router.layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    if req.uri().path().starts_with("/health") {
                        Span::none()
                    } else {
                        let mut make_span =
                            tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO);
                        use tower_http::trace::MakeSpan;
                        make_span.make_span(req)
                    }
                })
                .on_request(|req: &Request, span: &Span| {
                    if span.is_disabled() || req.uri().path().starts_with("/health") {
                        return;
                    }
                    let mut on_request =
                        tower_http::trace::DefaultOnRequest::new().level(tracing::Level::INFO);
                    use tower_http::trace::OnRequest;
                    on_request.on_request(req, span);
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let on_response =
                            tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO);
                        use tower_http::trace::OnResponse;
                        on_response.on_response(res, latency, span);
                    },
                )
                .on_failure(
                    |class: tower_http::classify::ServerErrorsFailureClass,
                     latency: Duration,
                     span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let mut on_failure =
                            tower_http::trace::DefaultOnFailure::new().level(tracing::Level::ERROR);
                        use tower_http::trace::OnFailure;
                        on_failure.on_failure(class, latency, span);
                    },
                ),
        );
        router
    }

    /// Start the server and the session pruner; returns after shutdown.
    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| crate::error::Error::ApiError(format!("Invalid address: {}", e)))?;

        let router = self.build_router();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("API server listening on http://{}", addr);

        let pruner = spawn_session_pruner(
            Arc::clone(&self.state.sessions),
            self.config.session_prune_interval,
            self.cancel_token.child_token(),
        );

        let cancel_token = self.cancel_token.clone();

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("API server shutting down...");
            })
            .await
            .map_err(|e| crate::error::Error::ApiError(format!("Server error: {}", e)));

        self.cancel_token.cancel();
        if let Err(e) = pruner.await {
            tracing::warn!("Session pruner task failed: {}", e);
        }

        served
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, FakeBackend};

    #[test]
    fn test_config_defaults() {
        let config = ApiServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.enable_cors);
    }

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig {
            port: 8080,
            enable_cors: false,
            ..AppConfig::default()
        };
        let config = ApiServerConfig::from(&app);
        assert_eq!(config.port, 8080);
        assert!(!config.enable_cors);
    }

    #[test]
    fn test_app_state_creation() {
        let state = AppState::new(FakeBackend::new(0), &AppConfig::default());
        assert!(state.start_time.elapsed().as_secs() < 1);
        assert!(state.sessions.is_empty());
        assert_eq!(state.session_max_age_secs, 14 * 24 * 60 * 60);
    }

    #[test]
    fn test_server_creation() {
        let state = AppState::new(FakeBackend::new(0), &AppConfig::default());
        let server = ApiServer::new(ApiServerConfig::default(), state);

        // Server should have a valid cancel token
        let token = server.cancel_token();
        assert!(!token.is_cancelled());
        server.shutdown();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_pruner_stops_on_cancel() {
        let backend = FakeBackend::new(0);
        let registry = testing::registry(&backend);
        let cancel = CancellationToken::new();

        let handle = spawn_session_pruner(registry, Duration::from_millis(10), cancel.clone());
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("pruner should stop")
            .unwrap();
    }
}
