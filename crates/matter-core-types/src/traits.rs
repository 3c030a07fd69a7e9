//! External-collaborator capability traits (spec §6). The core consumes
//! these; it never implements transport, discovery, or storage itself.
//!
//! Pattern grounded on `aura-authentication`'s and `guard-core`'s use of
//! `async_trait` for capability interfaces owned elsewhere in the stack.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::fabric::FabricInfo;
use crate::ids::NodeId;
use crate::session::SecureContext;

/// A resolved commissionable-node service (mDNS/DNS-SD).
#[derive(Debug, Clone)]
pub struct ResolvedService {
    pub instance_name: String,
    pub addresses: Vec<std::net::SocketAddr>,
    pub txt: HashMap<String, String>,
}

/// Abstract DNS-SD collaborator (spec §6).
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Direct lookup by long (12-bit) discriminator.
    async fn discover_commissionable(&self, long_discriminator: u16) -> Result<ResolvedService>;

    /// Lazy browse, used for short (4-bit) discriminator matching. The
    /// provisional behavior noted in spec §9 (first match, no `D` TXT
    /// filtering) is preserved here deliberately.
    async fn browse_commissionable(&self) -> Result<Vec<ResolvedService>>;

    /// Operational discovery (spec §4.7 step 7): looks the device back up
    /// by its newly assigned node ID once it has left the commissionable
    /// service and joined the operational one.
    async fn discover_operational(&self, node_id: NodeId) -> Result<ResolvedService>;
}

/// Abstract exchange/transport collaborator (spec §6). Exchange IDs are
/// opaque 16-bit identifiers; the core never inspects transport framing.
#[async_trait]
pub trait ExchangeManager: Send + Sync {
    async fn new_exchange(&self, peer: std::net::SocketAddr, protocol_id: u16) -> Result<u16>;

    async fn send(&self, exchange_id: u16, opcode: u8, payload: Vec<u8>, ack: bool) -> Result<()>;

    /// Block for the next inbound message on this exchange, or return
    /// `Timeout` once `deadline` passes.
    async fn recv(&self, exchange_id: u16, deadline: std::time::Instant) -> Result<(u8, Vec<u8>)>;

    async fn close(&self, exchange_id: u16) -> Result<()>;
}

/// Owns `SecureContext` lifetime (spec §6); handshakes publish final keys
/// here and never hold them once published.
#[async_trait]
pub trait SessionManager: Send + Sync {
    async fn publish(&self, context: SecureContext) -> Result<()>;
    async fn remove(&self, local_session_id: u16) -> Result<()>;
}

/// Evidence bundle passed to the attestation verifier (spec §6).
#[derive(Debug, Clone)]
pub struct AttestationInfo {
    pub nonce: [u8; 32],
    pub elements: Vec<u8>,
    pub signature: Vec<u8>,
    pub dac: Vec<u8>,
    pub pai: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct AttestationOutcome {
    pub verified: bool,
    pub trusted: bool,
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub certification_declaration: Option<Vec<u8>>,
    pub nonce: [u8; 32],
}

#[async_trait]
pub trait AttestationVerifier: Send + Sync {
    async fn verify(&self, info: &AttestationInfo) -> Result<AttestationOutcome>;
}

/// `AcceptAllVerifier` — development-only default (spec §6, §9 Open
/// Question). Reports `verified = true, trusted = false`: the chain was
/// never inspected, so trust cannot be asserted, but rejecting it outright
/// would make every development build fail attestation by default. Callers
/// that care about trust must check `trusted`, not just `verified`.
pub struct AcceptAllVerifier;

#[async_trait]
impl AttestationVerifier for AcceptAllVerifier {
    async fn verify(&self, info: &AttestationInfo) -> Result<AttestationOutcome> {
        Ok(AttestationOutcome {
            verified: true,
            trusted: false,
            vendor_id: None,
            product_id: None,
            certification_declaration: None,
            nonce: info.nonce,
        })
    }
}

/// Identity extracted from a validated operational certificate chain.
#[derive(Debug, Clone, Copy)]
pub struct PeerCertInfo {
    pub node_id: NodeId,
    pub fabric_id: crate::ids::FabricId,
    /// 65-byte uncompressed P-256 public key taken from the leaf cert.
    pub public_key: [u8; 65],
}

/// CASE certificate validator (spec §6). When absent, signature
/// verification is skipped — test-only mode, never the production default.
#[async_trait]
pub trait CaseCertificateValidator: Send + Sync {
    async fn validate(
        &self,
        noc: &[u8],
        icac: Option<&[u8]>,
        trusted_root_public_key: &[u8; 65],
    ) -> Result<PeerCertInfo>;
}

/// Minimal get/put/delete store for fabric records and resumption records
/// (spec §6 "Persistent state"). Layout is out of scope for the core.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Device-side hook invoked when the fail-safe timer expires mid
/// commissioning. The core only calls this; the actual revert of
/// provisional NOC/network state is an external collaborator
/// (spec §4.7, "the revert itself is an external collaborator").
#[async_trait]
pub trait FailSafeRevert: Send + Sync {
    async fn revert_provisional_state(&self) -> Result<()>;
}

/// Fabric lookup used by CASE responders to match a destination ID.
#[async_trait]
pub trait FabricStore: Send + Sync {
    async fn all_fabrics(&self) -> Result<Vec<FabricInfo>>;
    async fn resumption_by_id(&self, resumption_id: &[u8; 16]) -> Result<Option<SecureContext>>;
}
