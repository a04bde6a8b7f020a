//! Credential storage.
//!
//! - [`Credential`]: access/refresh token pair with expiry
//! - [`CredentialStore`]: per-session holder, mutated only by login and the
//!   gateway's refresh protocol

mod store;
mod types;

pub use store::{CredentialSnapshot, CredentialStore};
pub use types::{Credential, token_fingerprint};
