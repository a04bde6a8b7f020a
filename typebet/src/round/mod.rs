//! Round lifecycle.
//!
//! - [`RoundLedger`]: stake validation, `createBet`, capsule minting, completion
//! - [`CapsuleSigner`]: HMAC-signed, session-bound, TTL-bound round capsules
//! - [`ActiveRound`]: a session's single live round

mod capsule;
mod error;
mod ledger;
mod slot;
mod types;

pub use capsule::{CapsuleError, CapsuleSigner, RoundClaims};
pub use error::RoundError;
pub use ledger::RoundLedger;
pub use slot::ActiveRound;
pub use types::{GameMode, Round, RoundHandle};
