//! AES-CCM-128 AEAD (spec §4.1).
//!
//! Wire format matches `dl_crypto::aead`'s convention of returning
//! `ciphertext ∥ tag` / accepting the same on `open`, except Matter's fixed
//! parameters (`tag = 16`, `nonce = 13`) are the production path; a tunable
//! constructor is kept alongside for RFC 3610 test-vector conformance.

use aes::Aes128;
use ccm::{
    aead::{generic_array::GenericArray, Aead, KeyInit, Payload},
    consts::{U10, U12, U13, U14, U16, U4, U6, U7, U8},
    Ccm,
};

use crate::error::{CryptoError, Result};

/// `2^16 - 1` (spec §4.1 plaintext length limit).
pub const MAX_PLAINTEXT_LEN: usize = 65535;

type ProdCipher = Ccm<Aes128, U16, U13>;

/// Seal with the fixed Matter parameters (tag = 16, nonce = 13).
pub fn seal(key: &[u8; 16], nonce: &[u8; 13], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(CryptoError::PlaintextTooLong);
    }
    let cipher = ProdCipher::new(GenericArray::from_slice(key));
    cipher
        .encrypt(GenericArray::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::AeadSeal)
}

/// Open with the fixed Matter parameters. Tag comparison inside `ccm` is
/// constant-time (RustCrypto's `subtle`-based `CtOption` comparison).
pub fn open(key: &[u8; 16], nonce: &[u8; 13], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = ProdCipher::new(GenericArray::from_slice(key));
    cipher
        .decrypt(GenericArray::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::AeadOpen)
}

/// Tunable tag/nonce sizes for RFC 3610 test-vector conformance
/// (spec §4.1: "nonce 7-13 bytes, tag even 4-16"). Production code paths
/// never call this — they use [`seal`]/[`open`] with the fixed parameters.
pub fn seal_with_params(
    tag_len: usize,
    nonce: &[u8],
    key: &[u8; 16],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    macro_rules! dispatch {
        ($nonce_size:ty, $($tag:literal => $tag_size:ty),+ $(,)?) => {
            match tag_len {
                $(
                    $tag => {
                        let cipher = Ccm::<Aes128, $tag_size, $nonce_size>::new(GenericArray::from_slice(key));
                        cipher
                            .encrypt(GenericArray::from_slice(nonce), Payload { msg: plaintext, aad })
                            .map_err(|_| CryptoError::AeadSeal)
                    }
                )+
                _ => Err(CryptoError::UnsupportedParams(format!("tag_len={tag_len}"))),
            }
        };
    }
    match nonce.len() {
        7 => dispatch!(U7, 4 => U4, 6 => U6, 8 => U8, 10 => U10, 12 => U12, 14 => U14, 16 => U16),
        13 => dispatch!(U13, 4 => U4, 6 => U6, 8 => U8, 10 => U10, 12 => U12, 14 => U14, 16 => U16),
        n => Err(CryptoError::UnsupportedParams(format!("nonce_len={n}"))),
    }
}

pub fn open_with_params(
    tag_len: usize,
    nonce: &[u8],
    key: &[u8; 16],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    macro_rules! dispatch {
        ($nonce_size:ty, $($tag:literal => $tag_size:ty),+ $(,)?) => {
            match tag_len {
                $(
                    $tag => {
                        let cipher = Ccm::<Aes128, $tag_size, $nonce_size>::new(GenericArray::from_slice(key));
                        cipher
                            .decrypt(GenericArray::from_slice(nonce), Payload { msg: ciphertext, aad })
                            .map_err(|_| CryptoError::AeadOpen)
                    }
                )+
                _ => Err(CryptoError::UnsupportedParams(format!("tag_len={tag_len}"))),
            }
        };
    }
    match nonce.len() {
        7 => dispatch!(U7, 4 => U4, 6 => U6, 8 => U8, 10 => U10, 12 => U12, 14 => U14, 16 => U16),
        13 => dispatch!(U13, 4 => U4, 6 => U6, 8 => U8, 10 => U10, 12 => U12, 14 => U14, 16 => U16),
        n => Err(CryptoError::UnsupportedParams(format!("nonce_len={n}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = [0x11u8; 16];
        let nonce = [0x22u8; 13];
        let pt = b"commission me";
        let aad = b"matter-aad";
        let ct = seal(&key, &nonce, pt, aad).unwrap();
        let back = open(&key, &nonce, &ct, aad).unwrap();
        assert_eq!(back, pt);
    }

    #[test]
    fn bit_flip_in_ciphertext_fails() {
        let key = [0x11u8; 16];
        let nonce = [0x22u8; 13];
        let pt = b"commission me";
        let aad = b"matter-aad";
        let mut ct = seal(&key, &nonce, pt, aad).unwrap();
        ct[0] ^= 0x01;
        assert!(open(&key, &nonce, &ct, aad).is_err());
    }

    #[test]
    fn bit_flip_in_aad_fails() {
        let key = [0x11u8; 16];
        let nonce = [0x22u8; 13];
        let pt = b"commission me";
        let ct = seal(&key, &nonce, pt, b"good-aad").unwrap();
        assert!(open(&key, &nonce, &ct, b"bad-aad-").is_err());
    }

    #[test]
    fn tunable_params_roundtrip() {
        let key = [0x33u8; 16];
        let nonce = [0x01u8; 7];
        let pt = b"rfc3610 vector";
        let ct = seal_with_params(4, &nonce, &key, pt, b"").unwrap();
        let back = open_with_params(4, &nonce, &key, &ct, b"").unwrap();
        assert_eq!(back, pt);
    }
}
