//! matter-pase — PASE (Password-Authenticated Session Establishment), the
//! commissioning channel's first secure session (spec §4.3). Wraps
//! matter-spake2p's transcript math in the six-message wire flow and hands
//! the result off as a `SecureContext`.

pub mod error;
pub mod messages;
pub mod session_keys;
pub mod state;

pub use error::{PaseError, Result};
pub use session_keys::{derive_session_keys, PaseSessionKeys};
pub use state::{run_initiator, run_responder, InitiatorState, ResponderState};
