//! HMAC-SHA-256 (spec §4.1). All comparisons against attacker-controlled
//! MACs go through [`verify`], never a plain `==`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{CryptoError, Result};

type HmacSha256 = Hmac<Sha256>;

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Constant-time MAC comparison.
pub fn verify(key: &[u8], data: &[u8], expected: &[u8; 32]) -> Result<()> {
    let computed = hmac_sha256(key, data);
    if computed.ct_eq(expected).into() {
        Ok(())
    } else {
        Err(CryptoError::InvalidKey("HMAC verification failed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc4231_case_1() {
        let key = [0x0bu8; 20];
        let data = b"Hi There";
        let expected =
            hex::decode("b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff")
                .unwrap();
        assert_eq!(&hmac_sha256(&key, data)[..], &expected[..]);
    }

    #[test]
    fn verify_rejects_tampered_mac() {
        let key = b"session-key";
        let data = b"sigma2-transcript";
        let mut mac = hmac_sha256(key, data);
        mac[0] ^= 0xff;
        assert!(verify(key, data, &mac).is_err());
    }
}
