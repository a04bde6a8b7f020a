//! Authenticated request gateway.
//!
//! - [`TokenRefresher`]: backend-specific refresh protocol
//! - [`AuthGateway`]: staleness check, single-flight refresh, one
//!   refresh-and-retry on server-side rejection

mod error;
mod refresher;
mod service;

pub use error::GatewayError;
pub use refresher::{RefreshError, TokenRefresher};
pub use service::AuthGateway;
