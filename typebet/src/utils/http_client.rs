use std::{sync::OnceLock, time::Duration};

use tracing::{debug, warn};

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build the `reqwest::Client` used for every backend call.
///
/// A zero `request_timeout` leaves reqwest's default (no timeout) in place.
pub fn build_backend_client(request_timeout: Duration) -> reqwest::Client {
    install_rustls_provider();

    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("typebet/", env!("CARGO_PKG_VERSION")))
        .pool_idle_timeout(Duration::from_secs(90));

    if request_timeout > Duration::ZERO {
        builder = builder.timeout(request_timeout);
    }

    builder.build().unwrap_or_else(|error| {
        warn!(
            error = %error,
            "Failed to create configured HTTP client; falling back to reqwest defaults"
        );
        reqwest::Client::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_install_is_idempotent() {
        install_rustls_provider();
        install_rustls_provider();
    }

    #[test]
    fn test_build_backend_client() {
        let _client = build_backend_client(Duration::from_secs(5));
        let _untimed = build_backend_client(Duration::ZERO);
    }
}
