//! Nonce construction for the AEAD and privacy layers (spec §4.1).

use crate::error::Result;
use crate::kdf::hkdf_sha256;

const PRIVACY_KEY_INFO: &[u8] = b"PrivacyKey";

/// AEAD nonce: `flags(1) ∥ message_counter(4, LE) ∥ source_node_id(8, LE)`.
/// `source_node_id` is `0` for PASE (spec §4.1, §5.1).
pub fn aead_nonce(flags: u8, message_counter: u32, source_node_id: u64) -> [u8; 13] {
    let mut out = [0u8; 13];
    out[0] = flags;
    out[1..5].copy_from_slice(&message_counter.to_le_bytes());
    out[5..13].copy_from_slice(&source_node_id.to_le_bytes());
    out
}

/// Privacy nonce: `session_id(2, BE) ∥ mic[5..16]` (the last 11 bytes of the
/// 16-byte AEAD tag).
pub fn privacy_nonce(session_id: u16, mic: &[u8; 16]) -> [u8; 13] {
    let mut out = [0u8; 13];
    out[0..2].copy_from_slice(&session_id.to_be_bytes());
    out[2..13].copy_from_slice(&mic[5..16]);
    out
}

/// `HKDF(encryption_key, salt = ∅, info = "PrivacyKey", len = 16)`.
pub fn derive_privacy_key(encryption_key: &[u8; 16]) -> Result<[u8; 16]> {
    let okm = hkdf_sha256(encryption_key, &[], PRIVACY_KEY_INFO, 16)?;
    let mut out = [0u8; 16];
    out.copy_from_slice(&okm);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aead_nonce_layout() {
        let n = aead_nonce(0x01, 0x00000002, 0x0807060504030201);
        assert_eq!(n[0], 0x01);
        assert_eq!(&n[1..5], &[0x02, 0x00, 0x00, 0x00]);
        assert_eq!(&n[5..13], &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
    }

    #[test]
    fn privacy_nonce_layout() {
        let mic = [0xAAu8; 16];
        let n = privacy_nonce(0x1234, &mic);
        assert_eq!(&n[0..2], &[0x12, 0x34]);
        assert_eq!(&n[2..13], &mic[5..16]);
    }

    #[test]
    fn privacy_key_is_deterministic() {
        let key = [0x5Au8; 16];
        assert_eq!(derive_privacy_key(&key).unwrap(), derive_privacy_key(&key).unwrap());
    }
}
