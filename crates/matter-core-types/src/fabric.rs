//! Fabric info (spec §3). Produced by commissioning, consumed by CASE.

use serde::{Deserialize, Serialize};

use crate::ids::{CompressedFabricId, FabricId, FabricIndex, NodeId, VendorId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricInfo {
    pub fabric_index: FabricIndex,
    pub fabric_id: FabricId,
    pub node_id: NodeId,
    pub vendor_id: VendorId,
    /// 65-byte uncompressed SEC1 public key (0x04 || X || Y).
    pub root_public_key: [u8; 65],
    pub compressed_fabric_id: CompressedFabricId,
    /// 16-byte epoch key (IPK); operational group keys are derived from it.
    pub ipk: [u8; 16],
    pub noc: Vec<u8>,
    pub icac: Option<Vec<u8>>,
}

impl FabricInfo {
    pub fn root_public_key(&self) -> &[u8; 65] {
        &self.root_public_key
    }
}
