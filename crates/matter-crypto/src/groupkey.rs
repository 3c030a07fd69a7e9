//! Group (multicast) operational key derivation (spec §4.1).

use crate::error::Result;
use crate::kdf::hkdf_sha256;

const GROUP_KEY_INFO: &[u8] = b"GroupKey v1.0";
const GROUP_KEY_HASH_INFO: &[u8] = b"GroupKeyHash";

/// `HKDF(epoch_key, salt = compressed_fabric_id, info = "GroupKey v1.0", len = 16)`.
pub fn derive_group_operational_key(epoch_key: &[u8; 16], compressed_fabric_id: &[u8; 8]) -> Result<[u8; 16]> {
    let okm = hkdf_sha256(epoch_key, compressed_fabric_id, GROUP_KEY_INFO, 16)?;
    let mut out = [0u8; 16];
    out.copy_from_slice(&okm);
    Ok(out)
}

/// `HKDF(operational_key, salt = ∅, info = "GroupKeyHash", len = 2)`,
/// interpreted big-endian.
pub fn derive_group_session_id(operational_key: &[u8; 16]) -> Result<u16> {
    let okm = hkdf_sha256(operational_key, &[], GROUP_KEY_HASH_INFO, 2)?;
    Ok(u16::from_be_bytes([okm[0], okm[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let epoch = [0x11u8; 16];
        let fabric = [0x22u8; 8];
        let a = derive_group_operational_key(&epoch, &fabric).unwrap();
        let b = derive_group_operational_key(&epoch, &fabric).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_fabrics_give_different_keys() {
        let epoch = [0x11u8; 16];
        let key1 = derive_group_operational_key(&epoch, &[0x01; 8]).unwrap();
        let key2 = derive_group_operational_key(&epoch, &[0x02; 8]).unwrap();
        assert_ne!(key1, key2);
    }

    #[test]
    fn session_id_is_stable() {
        let key = [0x33u8; 16];
        let id1 = derive_group_session_id(&key).unwrap();
        let id2 = derive_group_session_id(&key).unwrap();
        assert_eq!(id1, id2);
    }
}
