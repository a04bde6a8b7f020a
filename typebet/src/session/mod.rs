//! Session-scoped state.
//!
//! A session is created by a successful login and owns its own credential
//! store, gateway, live round and result mailbox.

mod auth;
mod context;
mod registry;

pub use auth::{AuthError, AuthService};
pub use context::SessionContext;
pub use registry::{SessionRegistry, SessionSettings};
