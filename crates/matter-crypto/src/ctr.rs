//! AES-CTR-128 privacy layer (spec §4.1). Obscures the message header's
//! source node ID and exchange flags from passive observers; it carries no
//! authentication of its own and always runs alongside the AEAD layer.

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};

type Aes128Ctr = ctr::Ctr64BE<Aes128>;

/// XORs `data` in place with the AES-CTR-128 keystream. CTR is an
/// involution: the same call both masks and unmasks.
///
/// IV layout: flag byte `0x01` (`L-1 = 1`) ∥ 13-byte nonce ∥ 2-byte
/// big-endian counter starting at 1.
pub fn apply_privacy_mask(key: &[u8; 16], nonce: &[u8; 13], data: &mut [u8]) {
    let mut iv = [0u8; 16];
    iv[0] = 0x01;
    iv[1..14].copy_from_slice(nonce);
    iv[14..16].copy_from_slice(&1u16.to_be_bytes());
    let mut cipher = Aes128Ctr::new(key.into(), &iv.into());
    cipher.apply_keystream(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_is_its_own_inverse() {
        let key = [0x44u8; 16];
        let nonce = [0x01u8; 13];
        let original = b"header-bytes-12".to_vec();
        let mut buf = original.clone();
        apply_privacy_mask(&key, &nonce, &mut buf);
        assert_ne!(buf, original);
        apply_privacy_mask(&key, &nonce, &mut buf);
        assert_eq!(buf, original);
    }

    #[test]
    fn iv_layout_matches_flag_byte_and_counter_start() {
        let key = [0x44u8; 16];
        let nonce = [0x02u8; 13];
        let mut iv = [0u8; 16];
        iv[0] = 0x01;
        iv[1..14].copy_from_slice(&nonce);
        iv[14..16].copy_from_slice(&1u16.to_be_bytes());
        assert_eq!(iv[0], 0x01);
        assert_eq!(&iv[1..14], &nonce);
        assert_eq!(&iv[14..16], &[0x00, 0x01]);
    }
}
