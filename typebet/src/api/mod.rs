//! HTTP API for the page layer.
//!
//! Exposes login, round creation and completion, one-shot result delivery
//! and gold sync over the session cookie.

pub mod cookies;
pub mod error;
pub mod extract;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
