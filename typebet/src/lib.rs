//! typebet library crate.
//!
//! The authenticated game-round lifecycle of the Type&Bet game: session-scoped
//! credentials with single-flight refresh, signed round capsules, a take-once
//! result mailbox and best-effort gold sync, served over HTTP to the page
//! layer.

pub mod api;
pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod gold;
pub mod logging;
pub mod mailbox;
pub mod round;
pub mod session;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
