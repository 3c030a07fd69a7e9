//! matter-crypto — AEAD, MAC, KDF, elliptic-curve, and nonce/key-schedule
//! primitives for the Matter commissioning core (spec §4.1). Every other
//! protocol crate in the workspace builds its key schedules on top of this
//! one; nothing here is aware of TLV, PASE, or CASE message framing.

pub mod aead;
pub mod ctr;
pub mod ecc;
pub mod error;
pub mod groupkey;
pub mod hash;
pub mod kdf;
pub mod mac;
pub mod nonce;

pub use error::{CryptoError, Result};
