//! Session key derivation from the PASE shared secret (spec §4.1/§4.3):
//! `HKDF(Ke, salt = ∅, info = "SessionKeys", len = 48)`, split into the
//! initiator-to-responder key, responder-to-initiator key, and the
//! attestation challenge carried forward into CASE/attestation exchanges.

use matter_crypto::kdf::hkdf_sha256;

use crate::error::Result;

const SESSION_KEYS_INFO: &[u8] = b"SessionKeys";

pub struct PaseSessionKeys {
    pub i2r_key: [u8; 16],
    pub r2i_key: [u8; 16],
    pub attestation_challenge: [u8; 16],
}

pub fn derive_session_keys(ke: &[u8; 16]) -> Result<PaseSessionKeys> {
    let okm = hkdf_sha256(ke, &[], SESSION_KEYS_INFO, 48)?;
    let mut i2r_key = [0u8; 16];
    let mut r2i_key = [0u8; 16];
    let mut attestation_challenge = [0u8; 16];
    i2r_key.copy_from_slice(&okm[0..16]);
    r2i_key.copy_from_slice(&okm[16..32]);
    attestation_challenge.copy_from_slice(&okm[32..48]);
    Ok(PaseSessionKeys { i2r_key, r2i_key, attestation_challenge })
}
