use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use typebet::api::{ApiServer, ApiServerConfig, AppState};
use typebet::backend::GraphQlBackend;
use typebet::config::AppConfig;
use typebet::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Initialize logging
    let _log_guard = logging::init_logging(config.log_dir.as_deref())?;

    if config.ephemeral_secret {
        warn!(
            "CAPSULE_SECRET is not set; using a per-process secret. \
             Round capsules will not survive a restart."
        );
    }

    info!(?config, "typebet starting");

    let backend = Arc::new(GraphQlBackend::new(
        config.graphql_url()?,
        config.backend_timeout,
    ));
    let state = AppState::new(backend, &config);
    let server = ApiServer::new(ApiServerConfig::from(&config), state);

    let shutdown = server.cancel_token();
    let background = CancellationToken::new();

    if let Some(dir) = config.log_dir.clone() {
        logging::spawn_retention_cleanup(dir, background.clone());
    }

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received interrupt, shutting down"),
            Err(e) => warn!("Failed to listen for interrupt: {}", e),
        }
        shutdown.cancel();
    });

    let result = server.run().await;
    background.cancel();
    result?;

    info!("typebet stopped");
    Ok(())
}
