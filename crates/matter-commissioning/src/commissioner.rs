//! Controller-side commissioning orchestrator (spec §4.7). Sequences
//! discovery, PASE, fail-safe arming, attestation, credential issuance,
//! operational discovery, CASE, and completion against one overall
//! deadline plus per-step deadlines. Steps 2 and 8 delegate to
//! `matter-pase`/`matter-case` rather than reimplementing either
//! handshake here.

use std::sync::Arc;
use std::time::Instant;

use matter_core_types::fabric::FabricInfo;
use matter_core_types::ids::NodeId;
use matter_core_types::traits::{
    AttestationInfo, AttestationOutcome, AttestationVerifier, CaseCertificateValidator, ExchangeManager,
    Resolver, ResolvedService, SessionManager,
};
use matter_crypto::ecc;
use rand::RngCore;

use crate::collaborators::{CredentialIssuer, NetworkCredentials};
use crate::config::CommissioningConfig;
use crate::error::{CommissioningError, Result};
use crate::messages::{
    opcode, ArmFailSafeRequest, AttestationRequest, AttestationResponse, CertificateChainRequest,
    CertificateChainResponse, CertificateType, ClusterStatusResponse,
};

const PASE_PROTOCOL_ID: u16 = 0x0000;
const CASE_PROTOCOL_ID: u16 = 0x0001;
const COMMISSIONING_PROTOCOL_ID: u16 = 0x0030;

/// How the setup payload's discriminator was obtained (spec §4.7 step 1).
/// Manual pairing codes only ever carry the 4-bit short discriminator;
/// `SetupPayload` itself doesn't record which codec produced it, so the
/// caller that decoded the code tells the commissioner which it has.
#[derive(Debug, Clone, Copy)]
pub enum Discriminator {
    Long(u16),
    Short(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommissionerState {
    Idle,
    Discovering,
    Pase,
    ArmingFailSafe,
    DeviceAttestation,
    CredentialIssuance,
    OperationalDiscovery,
    Case,
    Completing,
    Complete,
    Failed,
}

/// Observability hooks for a run (spec §4.7: "Progress is observable
/// through callbacks"). Default methods are no-ops except attestation,
/// which defaults to accepting — callers that care about trust must
/// override it and inspect `AttestationOutcome::trusted`.
pub trait CommissioningProgress: Send + Sync {
    fn on_state_change(&self, _state: CommissionerState) {}
    fn on_progress(&self, _percent: u8) {}
    fn on_attestation(&self, _outcome: &AttestationOutcome) -> bool {
        true
    }
    fn on_complete(&self, _node_id: NodeId) {}
    fn on_error(&self, _error: &CommissioningError) {}
}

pub struct NoopProgress;
impl CommissioningProgress for NoopProgress {}

/// Everything the orchestrator needs that it does not implement itself.
pub struct Commissioner {
    pub resolver: Arc<dyn Resolver>,
    pub attestation_verifier: Arc<dyn AttestationVerifier>,
    pub case_validator: Arc<dyn CaseCertificateValidator>,
    pub credential_issuer: Arc<dyn CredentialIssuer>,
    pub session_manager: Arc<dyn SessionManager>,
    /// The commissioner's own fabric identity and operational keypair,
    /// already established before this run; used as CASE initiator in
    /// step 8. Distinct from the device's newly issued NOC.
    pub own_fabric: FabricInfo,
    pub own_operational_keypair: ecc::KeyPair,
    pub config: CommissioningConfig,
}

impl Commissioner {
    async fn discover(
        &self,
        discriminator: Discriminator,
        deadline: Instant,
    ) -> Result<ResolvedService> {
        match discriminator {
            Discriminator::Long(d) => Ok(self.resolver.discover_commissionable(d).await?),
            Discriminator::Short(short) => {
                let candidates = self.resolver.browse_commissionable().await?;
                for candidate in candidates {
                    if Instant::now() >= deadline {
                        break;
                    }
                    let Some(txt) = candidate.txt.get("D") else { continue };
                    let Ok(advertised) = txt.parse::<u16>() else { continue };
                    if (advertised >> 8) as u8 & 0x0F == short {
                        return Ok(candidate);
                    }
                }
                Err(CommissioningError::DeviceNotFound)
            }
        }
    }

    /// Runs the full commissioning flow against `peer` using `passcode`,
    /// returning the assigned node ID on success.
    pub async fn run(
        &self,
        exchange: &dyn ExchangeManager,
        discriminator: Discriminator,
        passcode: u32,
        network: NetworkCredentials,
        progress: &dyn CommissioningProgress,
    ) -> Result<NodeId> {
        let overall_deadline = Instant::now() + self.config.overall_timeout;
        let result = self.run_inner(exchange, discriminator, passcode, network, progress, overall_deadline).await;
        match &result {
            Ok(node_id) => progress.on_complete(*node_id),
            Err(e) => progress.on_error(e),
        }
        result
    }

    async fn run_inner(
        &self,
        exchange: &dyn ExchangeManager,
        discriminator: Discriminator,
        passcode: u32,
        network: NetworkCredentials,
        progress: &dyn CommissioningProgress,
        overall_deadline: Instant,
    ) -> Result<NodeId> {
        // Step 1: discovery.
        progress.on_state_change(CommissionerState::Discovering);
        progress.on_progress(0);
        let discovery_deadline = Instant::now() + self.config.discovery_timeout;
        let service = self.discover(discriminator, discovery_deadline.min(overall_deadline)).await?;
        let peer = *service.addresses.first().ok_or(CommissioningError::DeviceNotFound)?;

        // Step 2: PASE.
        progress.on_state_change(CommissionerState::Pase);
        progress.on_progress(10);
        let pase_deadline = (Instant::now() + self.config.pase_timeout).min(overall_deadline);
        let pase_exchange_id = exchange.new_exchange(peer, PASE_PROTOCOL_ID).await?;
        let local_session_id = gen_local_session_id();
        let pase_context =
            matter_pase::run_initiator(exchange, pase_exchange_id, passcode, local_session_id, pase_deadline)
                .await?;
        self.session_manager.publish(pase_context).await?;
        exchange.close(pase_exchange_id).await?;

        let cluster_exchange_id = exchange.new_exchange(peer, COMMISSIONING_PROTOCOL_ID).await?;

        // Step 3: ArmFailSafe.
        progress.on_state_change(CommissionerState::ArmingFailSafe);
        progress.on_progress(25);
        let arm = ArmFailSafeRequest {
            expiry_length_seconds: self.config.fail_safe_expiry.as_secs() as u16,
            breadcrumb: 0,
        };
        exchange
            .send(cluster_exchange_id, opcode::ARM_FAIL_SAFE, arm.encode()?, true)
            .await?;
        let (op, payload) = exchange.recv(cluster_exchange_id, overall_deadline).await?;
        if op != opcode::ARM_FAIL_SAFE_RESPONSE {
            return Err(CommissioningError::InvalidState("expected ArmFailSafeResponse"));
        }
        ClusterStatusResponse::decode(&payload)?.into_result()?;

        // Step 4: device attestation.
        progress.on_state_change(CommissionerState::DeviceAttestation);
        progress.on_progress(40);
        let mut nonce = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut nonce);
        exchange
            .send(cluster_exchange_id, opcode::ATTESTATION_REQUEST, AttestationRequest { attestation_nonce: nonce }.encode()?, true)
            .await?;
        let (op, payload) = exchange.recv(cluster_exchange_id, overall_deadline).await?;
        if op != opcode::ATTESTATION_RESPONSE {
            return Err(CommissioningError::InvalidState("expected AttestationResponse"));
        }
        let attestation = AttestationResponse::decode(&payload)?;

        let dac = self
            .request_certificate_chain(exchange, cluster_exchange_id, CertificateType::Dac, overall_deadline)
            .await?;
        let pai = self
            .request_certificate_chain(exchange, cluster_exchange_id, CertificateType::Pai, overall_deadline)
            .await?;

        let info = AttestationInfo {
            nonce,
            elements: attestation.attestation_elements,
            signature: attestation.signature,
            dac,
            pai,
        };
        let outcome = self.attestation_verifier.verify(&info).await?;
        if !progress.on_attestation(&outcome) {
            return Err(CommissioningError::AttestationRejected);
        }

        // Steps 5-6: CSR/AddNOC and network provisioning, delegated.
        progress.on_state_change(CommissionerState::CredentialIssuance);
        progress.on_progress(55);
        let assigned_node_id = self
            .credential_issuer
            .issue_and_provision(exchange, cluster_exchange_id, &outcome, &network)
            .await?;
        exchange.close(cluster_exchange_id).await?;

        // Step 7: operational discovery.
        progress.on_state_change(CommissionerState::OperationalDiscovery);
        progress.on_progress(70);
        let operational_service = self.resolver.discover_operational(assigned_node_id).await?;
        let operational_peer =
            *operational_service.addresses.first().ok_or(CommissioningError::DeviceNotFound)?;

        // Step 8: CASE.
        progress.on_state_change(CommissionerState::Case);
        progress.on_progress(85);
        let case_exchange_id = exchange.new_exchange(operational_peer, CASE_PROTOCOL_ID).await?;
        let case_local_session_id = gen_local_session_id();
        let case_context = matter_case::run_initiator(
            exchange,
            case_exchange_id,
            &self.own_fabric,
            &self.own_operational_keypair,
            assigned_node_id.0,
            case_local_session_id,
            self.case_validator.as_ref(),
            None,
            overall_deadline,
        )
        .await?;
        self.session_manager.publish(case_context).await?;
        self.session_manager.remove(local_session_id).await?;

        // Step 9: CommissioningComplete.
        progress.on_state_change(CommissionerState::Completing);
        progress.on_progress(95);
        let complete_exchange_id = exchange.new_exchange(operational_peer, COMMISSIONING_PROTOCOL_ID).await?;
        exchange
            .send(complete_exchange_id, opcode::COMMISSIONING_COMPLETE, Vec::new(), true)
            .await?;
        let (op, payload) = exchange.recv(complete_exchange_id, overall_deadline).await?;
        if op != opcode::COMMISSIONING_COMPLETE_RESPONSE {
            return Err(CommissioningError::InvalidState("expected CommissioningCompleteResponse"));
        }
        ClusterStatusResponse::decode(&payload)?.into_result()?;
        exchange.close(complete_exchange_id).await?;
        exchange.close(case_exchange_id).await?;

        progress.on_state_change(CommissionerState::Complete);
        progress.on_progress(100);
        Ok(assigned_node_id)
    }

    async fn request_certificate_chain(
        &self,
        exchange: &dyn ExchangeManager,
        exchange_id: u16,
        certificate_type: CertificateType,
        deadline: Instant,
    ) -> Result<Vec<u8>> {
        exchange
            .send(
                exchange_id,
                opcode::CERTIFICATE_CHAIN_REQUEST,
                CertificateChainRequest { certificate_type }.encode()?,
                true,
            )
            .await?;
        let (op, payload) = exchange.recv(exchange_id, deadline).await?;
        if op != opcode::CERTIFICATE_CHAIN_RESPONSE {
            return Err(CommissioningError::InvalidState("expected CertificateChainResponse"));
        }
        Ok(CertificateChainResponse::decode(&payload)?.certificate)
    }
}

fn gen_local_session_id() -> u16 {
    let mut buf = [0u8; 2];
    rand::thread_rng().fill_bytes(&mut buf);
    u16::from_be_bytes(buf)
}
