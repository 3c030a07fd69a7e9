//! The orchestrator-only external collaborators (spec §4.7 steps 5-6):
//! CSR generation, AddNOC, and network provisioning are each named in the
//! spec as delegated wholesale rather than implemented by the core, so
//! unlike `CaseCertificateValidator` or `FabricStore` (shared by PASE/CASE
//! and defined in `matter-core-types`) this trait lives here, scoped to
//! the orchestrator that calls it.

use async_trait::async_trait;
use matter_core_types::ids::NodeId;
use matter_core_types::traits::{AttestationOutcome, ExchangeManager};

use crate::error::Result;

/// Network credentials handed to the device during provisioning. Profile
/// details (Wi-Fi vs Thread, channel maps, and so on) are out of scope;
/// callers that need them extend this collaborator, not the orchestrator.
#[derive(Debug, Clone)]
pub enum NetworkCredentials {
    Wifi { ssid: Vec<u8>, credentials: Vec<u8> },
    Thread { operational_dataset: Vec<u8> },
}

/// Drives CSR, AddNOC, and network provisioning against an already-open
/// exchange, once device attestation has been accepted. The orchestrator
/// already owns its own fabric identity as an existing admin; all it needs
/// back is the node ID the device was just assigned, to drive operational
/// discovery and CASE as initiator against it.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue_and_provision(
        &self,
        exchange: &dyn ExchangeManager,
        exchange_id: u16,
        attestation: &AttestationOutcome,
        network: &NetworkCredentials,
    ) -> Result<NodeId>;
}
