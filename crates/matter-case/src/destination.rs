//! CASE destination identifier (spec §4.6): lets a responder holding many
//! installed fabrics pick the right one from Sigma1 without the initiator
//! disclosing which fabric it targets in the clear.

use matter_core_types::fabric::FabricInfo;
use matter_crypto::{groupkey::derive_group_operational_key, mac};

use crate::error::{CaseError, Result};

/// `HMAC-SHA-256(IPK, initiator_random ∥ root_pubkey ∥ fabric_id(8 LE) ∥
/// node_id(8 LE))`, where IPK is the derived operational group key, not the
/// raw epoch key.
pub fn compute_destination_id(
    epoch_key: &[u8; 16],
    compressed_fabric_id: &[u8; 8],
    initiator_random: &[u8; 32],
    root_public_key: &[u8; 65],
    fabric_id: u64,
    node_id: u64,
) -> Result<[u8; 32]> {
    let ipk = derive_group_operational_key(epoch_key, compressed_fabric_id)?;
    let mut message = Vec::with_capacity(32 + 65 + 8 + 8);
    message.extend_from_slice(initiator_random);
    message.extend_from_slice(root_public_key);
    message.extend_from_slice(&fabric_id.to_le_bytes());
    message.extend_from_slice(&node_id.to_le_bytes());
    Ok(mac::hmac_sha256(&ipk, &message))
}

/// Tries every installed fabric's every node ID is not known up front, so
/// the responder instead recomputes the destination ID for each of its own
/// `(fabric, node)` pairs and looks for a match. Matter only ever has one
/// operational node ID per fabric entry, so this is one HMAC per fabric.
pub fn find_fabric_by_destination_id<'a>(
    fabrics: &'a [FabricInfo],
    initiator_random: &[u8; 32],
    destination_id: &[u8; 32],
) -> Result<&'a FabricInfo> {
    for fabric in fabrics {
        let candidate = compute_destination_id(
            &fabric.ipk,
            &fabric.compressed_fabric_id.0,
            initiator_random,
            &fabric.root_public_key,
            fabric.fabric_id.0,
            fabric.node_id.0,
        )?;
        if &candidate == destination_id {
            return Ok(fabric);
        }
    }
    Err(CaseError::NoSharedRoot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use matter_core_types::ids::{CompressedFabricId, FabricId, FabricIndex, NodeId, VendorId};

    fn fabric(fabric_id: u64, node_id: u64) -> FabricInfo {
        FabricInfo {
            fabric_index: FabricIndex::new(1).unwrap(),
            fabric_id: FabricId(fabric_id),
            node_id: NodeId(node_id),
            vendor_id: VendorId(0xFFF1),
            root_public_key: [0x04u8; 65],
            compressed_fabric_id: CompressedFabricId([0x11u8; 8]),
            ipk: [0x22u8; 16],
            noc: vec![],
            icac: None,
        }
    }

    /// Pinned against an independently computed HMAC/HKDF reference
    /// (outside this crate), not just this function's own round-trip.
    #[test]
    fn destination_id_matches_independent_reference_vector() {
        let epoch_key = [0x11u8; 16];
        let compressed_fabric_id = [0x22u8; 8];
        let initiator_random = [0x33u8; 32];
        let mut root_public_key = [0x44u8; 65];
        root_public_key[0] = 0x04;
        let fabric_id = 0x2906_C908_D115_D362u64;
        let node_id = 0xCD55_44AA_7B13_EF14u64;

        let ipk = derive_group_operational_key(&epoch_key, &compressed_fabric_id).unwrap();
        assert_eq!(
            ipk,
            [
                0x4a, 0x41, 0xcf, 0x51, 0x85, 0xa2, 0x8c, 0xe1, 0x8e, 0x1d, 0x2b, 0x92, 0xe4, 0x47, 0xe2, 0xb2,
            ]
        );

        let destination_id = compute_destination_id(
            &epoch_key,
            &compressed_fabric_id,
            &initiator_random,
            &root_public_key,
            fabric_id,
            node_id,
        )
        .unwrap();
        assert_eq!(
            destination_id,
            [
                0xe5, 0xee, 0x8d, 0xd5, 0xa0, 0x7f, 0x31, 0xa7, 0x77, 0x3a, 0x43, 0x89, 0x8d, 0x50, 0x4a, 0xb8, 0xaa,
                0x96, 0x69, 0xfc, 0xad, 0x18, 0x43, 0xf6, 0x79, 0x0c, 0xfe, 0x91, 0xb6, 0x95, 0x52, 0x24,
            ]
        );
    }

    #[test]
    fn matching_fabric_is_found() {
        let f = fabric(42, 7);
        let random = [0x33u8; 32];
        let destination_id =
            compute_destination_id(&f.ipk, &f.compressed_fabric_id.0, &random, &f.root_public_key, 42, 7).unwrap();
        let found = find_fabric_by_destination_id(std::slice::from_ref(&f), &random, &destination_id).unwrap();
        assert_eq!(found.fabric_id.0, 42);
    }

    #[test]
    fn no_match_returns_no_shared_root() {
        let f = fabric(42, 7);
        let random = [0x33u8; 32];
        let bogus = [0xFFu8; 32];
        assert!(matches!(
            find_fabric_by_destination_id(std::slice::from_ref(&f), &random, &bogus),
            Err(CaseError::NoSharedRoot)
        ));
    }
}
