//! HKDF-SHA-256 and PBKDF2-HMAC-SHA-256 (spec §4.1).
//!
//! Shape grounded on `dl_crypto::kdf`'s one-shot `hkdf_expand(ikm, salt, info,
//! output)` helper, generalized here to also expose separate Extract/Expand
//! steps (SPAKE2+'s Ka/Ke split and CASE's key schedule both need the
//! pseudorandom key, not just the final output).

use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::error::{CryptoError, Result};

pub const MIN_PBKDF_ITERATIONS: u32 = 1000;
pub const MAX_PBKDF_ITERATIONS: u32 = 100_000;

/// One-shot HKDF-SHA-256: `HKDF-Expand(HKDF-Extract(salt, ikm), info, len)`.
pub fn hkdf_sha256(ikm: &[u8], salt: &[u8], info: &[u8], out_len: usize) -> Result<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; out_len];
    hk.expand(info, &mut okm)
        .map_err(|_| CryptoError::KeyDerivation(format!("HKDF output length {out_len} invalid")))?;
    Ok(okm)
}

/// `HKDF-Extract` alone, returning the 32-byte pseudorandom key. Needed when
/// a caller derives more than one output from the same PRK (SPAKE2+'s
/// Ka/Ke split from a single transcript hash).
pub fn hkdf_extract(salt: &[u8], ikm: &[u8]) -> [u8; 32] {
    let (prk, _) = Hkdf::<Sha256>::extract(Some(salt), ikm);
    prk.into()
}

/// `HKDF-Expand` over an already-extracted PRK.
pub fn hkdf_expand(prk: &[u8; 32], info: &[u8], out_len: usize) -> Result<Vec<u8>> {
    let hk = Hkdf::<Sha256>::from_prk(prk)
        .map_err(|_| CryptoError::KeyDerivation("PRK too short for HKDF-Expand".into()))?;
    let mut okm = vec![0u8; out_len];
    hk.expand(info, &mut okm)
        .map_err(|_| CryptoError::KeyDerivation(format!("HKDF output length {out_len} invalid")))?;
    Ok(okm)
}

/// PBKDF2-HMAC-SHA-256. `iterations` must be in `[1000, 100000]`
/// (spec §4.1).
pub fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32, out_len: usize) -> Result<Vec<u8>> {
    if !(MIN_PBKDF_ITERATIONS..=MAX_PBKDF_ITERATIONS).contains(&iterations) {
        return Err(CryptoError::PbkdfIterations(iterations));
    }
    let mut okm = vec![0u8; out_len];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut okm);
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hkdf_one_shot_matches_extract_then_expand() {
        let ikm = b"shared-secret";
        let salt = b"fabric-salt";
        let info = b"SessionKeys";
        let one_shot = hkdf_sha256(ikm, salt, info, 48).unwrap();

        let prk = hkdf_extract(salt, ikm);
        let expanded = hkdf_expand(&prk, info, 48).unwrap();
        assert_eq!(one_shot, expanded);
    }

    #[test]
    fn pbkdf2_rejects_out_of_range_iterations() {
        assert!(pbkdf2_sha256(b"pw", b"salt", 999, 32).is_err());
        assert!(pbkdf2_sha256(b"pw", b"salt", 100_001, 32).is_err());
        assert!(pbkdf2_sha256(b"pw", b"salt", 1000, 32).is_ok());
        assert!(pbkdf2_sha256(b"pw", b"salt", 100_000, 32).is_ok());
    }

    #[test]
    fn pbkdf2_is_deterministic() {
        let a = pbkdf2_sha256(b"pw", b"salt", 1000, 32).unwrap();
        let b = pbkdf2_sha256(b"pw", b"salt", 1000, 32).unwrap();
        assert_eq!(a, b);
    }
}
