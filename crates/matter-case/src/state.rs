//! CASE initiator/responder state machines (spec §4.6). Unlike PASE's
//! strictly linear flow, the responder branches on whether Sigma1 carries a
//! usable resumption request; both branches still fail closed on any
//! cryptographic or certificate-chain failure before session keys surface.

use std::time::Instant;

use matter_core_types::fabric::FabricInfo;
use matter_core_types::ids::SessionId;
use matter_core_types::session::{CaseResumptionRecord, SecureContext, SessionType};
use matter_core_types::traits::{CaseCertificateValidator, ExchangeManager, FabricStore};
use matter_crypto::ecc;
use matter_crypto::groupkey::derive_group_operational_key;
use rand::RngCore;

use crate::destination::{compute_destination_id, find_fabric_by_destination_id};
use crate::error::{CaseError, Result};
use crate::keyschedule::{
    derive_resume1, derive_resume2, derive_s2k, derive_s3k, derive_session_keys, verify_resume_mic,
    SIGMA2_NONCE, SIGMA3_NONCE, SIGMA_S1_NONCE, SIGMA_S2_NONCE,
};
use crate::messages::{
    opcode, ResumptionRequest, Sigma1, Sigma2, Sigma2Resume, Sigma3, StatusReport, Tbe2, Tbe3,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Init,
    WaitingSigma2,
    WaitingSigma2Resume,
    WaitingSigma3,
    WaitingStatusReport,
    Complete,
    Failed,
}

async fn recv(exchange: &dyn ExchangeManager, exchange_id: u16, deadline: Instant) -> Result<(u8, Vec<u8>)> {
    exchange.recv(exchange_id, deadline).await.map_err(|_| CaseError::Timeout)
}

fn operational_ipk(fabric: &FabricInfo) -> Result<[u8; 16]> {
    Ok(derive_group_operational_key(&fabric.ipk, &fabric.compressed_fabric_id.0)?)
}

/// Runs the initiating side of CASE to completion, attempting resumption
/// when `resumption` names a previously stored record for `target_node_id`.
#[allow(clippy::too_many_arguments)]
pub async fn run_initiator(
    exchange: &dyn ExchangeManager,
    exchange_id: u16,
    fabric: &FabricInfo,
    operational_keypair: &ecc::KeyPair,
    target_node_id: u64,
    local_session_id: u16,
    validator: &dyn CaseCertificateValidator,
    resumption: Option<&CaseResumptionRecord>,
    deadline: Instant,
) -> Result<SecureContext> {
    let mut state = CaseState::Init;

    let mut initiator_random = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut initiator_random);
    let eph = ecc::generate_keypair();
    let initiator_eph_pub_key = ecc::encode_public_key_uncompressed(&eph.public);

    let destination_id = compute_destination_id(
        &fabric.ipk,
        &fabric.compressed_fabric_id.0,
        &initiator_random,
        &fabric.root_public_key,
        fabric.fabric_id.0,
        target_node_id,
    )?;

    let resume_request = match resumption {
        Some(record) => {
            let (_s1rk, mic) = derive_resume1(&record.shared_secret, &initiator_random, &record.resumption_id)?;
            Some((record, ResumptionRequest { resumption_id: record.resumption_id, initiator_resume_mic: mic }))
        }
        None => None,
    };

    let sigma1 = Sigma1 {
        initiator_random,
        initiator_session_id: local_session_id,
        destination_id,
        initiator_eph_pub_key,
        resumption: resume_request.as_ref().map(|(_, r)| r.clone()),
    };
    let sigma1_bytes = sigma1.encode()?;
    exchange
        .send(exchange_id, opcode::SIGMA1, sigma1_bytes.clone(), true)
        .await
        .map_err(|_| CaseError::Timeout)?;
    state = CaseState::WaitingSigma2;
    tracing::debug!(?state, "Sigma1 sent, awaiting Sigma2");

    let (op, payload) = recv(exchange, exchange_id, deadline).await?;
    match op {
        opcode::SIGMA2_RESUME => {
            let Some((record, _)) = resume_request else {
                return Err(CaseError::UnexpectedOpcode(op));
            };
            state = CaseState::WaitingSigma2Resume;
            tracing::debug!(?state, "initiator received Sigma2_Resume");
            let sigma2_resume = Sigma2Resume::decode(&payload)?;
            let (s2rk, _expected_mic) =
                derive_resume2(&record.shared_secret, &initiator_random, &sigma2_resume.resumption_id)?;
            verify_resume_mic(&s2rk, SIGMA_S2_NONCE, &sigma2_resume.resume2_mic)?;

            let mut transcript = sigma1_bytes.clone();
            transcript.extend_from_slice(&payload);
            let keys = derive_session_keys(&record.shared_secret, &operational_ipk(fabric)?, &transcript)?;

            state = CaseState::Complete;
            tracing::debug!(?state, "CASE resumption completed");
            return Ok(SecureContext {
                session_type: SessionType::Case,
                local_session_id: SessionId(local_session_id),
                peer_session_id: SessionId(sigma2_resume.responder_session_id),
                i2r_key: keys.i2r_key,
                r2i_key: keys.r2i_key,
                attestation_challenge: keys.attestation_challenge,
                peer_privacy_key: matter_crypto::nonce::derive_privacy_key(&keys.r2i_key)?,
                send_counter: 0,
                recv_window: Default::default(),
                peer_node_id: Some(matter_core_types::ids::NodeId(target_node_id)),
                resumption: Some(CaseResumptionRecord {
                    resumption_id: sigma2_resume.resumption_id,
                    shared_secret: record.shared_secret,
                    peer_node_id: matter_core_types::ids::NodeId(target_node_id),
                }),
            });
        }
        opcode::SIGMA2 => {}
        _ => {
            state = CaseState::Failed;
            tracing::warn!(?state, opcode = op, "unexpected opcode waiting for Sigma2");
            return Err(CaseError::UnexpectedOpcode(op));
        }
    }

    let sigma2 = Sigma2::decode(&payload)?;
    let responder_public = ecc::decode_public_key(&sigma2.responder_eph_pub_key)?;
    let shared_secret = ecc::ecdh_shared_secret(&eph.secret, &responder_public);
    let ipk = operational_ipk(fabric)?;
    let s2k = derive_s2k(&shared_secret, &ipk, &sigma2.responder_random, &sigma2.responder_eph_pub_key, &sigma1_bytes)?;
    let tbe2_bytes = matter_crypto::aead::open(&s2k, SIGMA2_NONCE, &sigma2.encrypted2, &[])?;
    let tbe2 = Tbe2::decode(&tbe2_bytes)?;

    let cert_info = validator
        .validate(&tbe2.responder_noc, tbe2.responder_icac.as_deref(), &fabric.root_public_key)
        .await
        .map_err(|e| CaseError::CertificateInvalid(e.to_string()))?;
    if cert_info.node_id.0 != target_node_id {
        return Err(CaseError::NodeIdMismatch(cert_info.node_id.0));
    }
    let tbs_data2 = crate::messages::tbs_data2(
        &tbe2.responder_noc,
        tbe2.responder_icac.as_deref(),
        &sigma2.responder_eph_pub_key,
        &initiator_eph_pub_key,
    );
    let responder_operational_key = ecc::decode_public_key(&cert_info.public_key)?;
    ecc::verify(&responder_operational_key, &tbs_data2, &tbe2.signature)
        .map_err(|_| CaseError::CertificateInvalid("Sigma2 signature verification failed".into()))?;

    let sigma2_bytes = payload;
    let tbs_data3 = crate::messages::tbs_data3(
        &fabric.noc,
        fabric.icac.as_deref(),
        &initiator_eph_pub_key,
        &sigma2.responder_eph_pub_key,
    );
    let signature = ecc::sign(&operational_keypair.secret, &tbs_data3);
    let tbe3 = Tbe3 { initiator_noc: fabric.noc.clone(), initiator_icac: fabric.icac.clone(), signature };
    let s3k = derive_s3k(&shared_secret, &ipk, &sigma1_bytes, &sigma2_bytes)?;
    let encrypted3 = matter_crypto::aead::seal(&s3k, SIGMA3_NONCE, &tbe3.encode()?, &[])?;
    let sigma3 = Sigma3 { encrypted3 };
    let sigma3_bytes = sigma3.encode()?;
    exchange
        .send(exchange_id, opcode::SIGMA3, sigma3_bytes.clone(), true)
        .await
        .map_err(|_| CaseError::Timeout)?;
    state = CaseState::WaitingStatusReport;
    tracing::debug!(?state, "Sigma3 sent, awaiting status report");

    let (op, payload) = recv(exchange, exchange_id, deadline).await?;
    if op != opcode::STATUS_REPORT {
        state = CaseState::Failed;
        return Err(CaseError::UnexpectedOpcode(op));
    }
    StatusReport::decode(&payload)?.into_result()?;

    let mut transcript = sigma1_bytes;
    transcript.extend_from_slice(&sigma2_bytes);
    transcript.extend_from_slice(&sigma3_bytes);
    let keys = derive_session_keys(&shared_secret, &ipk, &transcript)?;

    let mut new_resumption_id = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut new_resumption_id);
    state = CaseState::Complete;
    tracing::debug!(?state, "CASE initiator completed");
    Ok(SecureContext {
        session_type: SessionType::Case,
        local_session_id: SessionId(local_session_id),
        peer_session_id: SessionId(sigma2.responder_session_id),
        i2r_key: keys.i2r_key,
        r2i_key: keys.r2i_key,
        attestation_challenge: keys.attestation_challenge,
        peer_privacy_key: matter_crypto::nonce::derive_privacy_key(&keys.r2i_key)?,
        send_counter: 0,
        recv_window: Default::default(),
        peer_node_id: Some(matter_core_types::ids::NodeId(target_node_id)),
        resumption: Some(CaseResumptionRecord {
            resumption_id: tbe2.resumption_id,
            shared_secret,
            peer_node_id: matter_core_types::ids::NodeId(target_node_id),
        }),
    })
}

/// Runs the responding side of CASE to completion.
#[allow(clippy::too_many_arguments)]
pub async fn run_responder(
    exchange: &dyn ExchangeManager,
    exchange_id: u16,
    fabric_store: &dyn FabricStore,
    operational_keypair: &ecc::KeyPair,
    local_session_id: u16,
    validator: &dyn CaseCertificateValidator,
    deadline: Instant,
) -> Result<SecureContext> {
    let mut state = CaseState::Init;

    let (op, payload) = recv(exchange, exchange_id, deadline).await?;
    if op != opcode::SIGMA1 {
        state = CaseState::Failed;
        return Err(CaseError::UnexpectedOpcode(op));
    }
    let sigma1_bytes = payload;
    let sigma1 = Sigma1::decode(&sigma1_bytes)?;

    let fabrics = fabric_store.all_fabrics().await.map_err(|e| CaseError::CertificateInvalid(e.to_string()))?;
    let fabric = find_fabric_by_destination_id(&fabrics, &sigma1.initiator_random, &sigma1.destination_id)?.clone();
    let ipk = operational_ipk(&fabric)?;

    if let Some(resume) = &sigma1.resumption {
        if let Some(prev) = fabric_store
            .resumption_by_id(&resume.resumption_id)
            .await
            .map_err(|e| CaseError::CertificateInvalid(e.to_string()))?
        {
            if let Some(prev_record) = &prev.resumption {
                let (s1rk, _mic) = derive_resume1(&prev_record.shared_secret, &sigma1.initiator_random, &prev_record.resumption_id)?;
                if verify_resume_mic(&s1rk, SIGMA_S1_NONCE, &resume.initiator_resume_mic).is_ok() {
                    let mut new_resumption_id = [0u8; 16];
                    rand::thread_rng().fill_bytes(&mut new_resumption_id);
                    let (_s2rk, resume2_mic) =
                        derive_resume2(&prev_record.shared_secret, &sigma1.initiator_random, &new_resumption_id)?;
                    let sigma2_resume = Sigma2Resume {
                        resumption_id: new_resumption_id,
                        resume2_mic,
                        responder_session_id: local_session_id,
                    };
                    let sigma2_resume_bytes = sigma2_resume.encode()?;
                    exchange
                        .send(exchange_id, opcode::SIGMA2_RESUME, sigma2_resume_bytes.clone(), true)
                        .await
                        .map_err(|_| CaseError::Timeout)?;

                    let mut transcript = sigma1_bytes;
                    transcript.extend_from_slice(&sigma2_resume_bytes);
                    let keys = derive_session_keys(&prev_record.shared_secret, &ipk, &transcript)?;

                    state = CaseState::Complete;
                    tracing::debug!(?state, "CASE resumption completed on responder");
                    return Ok(SecureContext {
                        session_type: SessionType::Case,
                        local_session_id: SessionId(local_session_id),
                        peer_session_id: SessionId(sigma1.initiator_session_id),
                        i2r_key: keys.i2r_key,
                        r2i_key: keys.r2i_key,
                        attestation_challenge: keys.attestation_challenge,
                        peer_privacy_key: matter_crypto::nonce::derive_privacy_key(&keys.r2i_key)?,
                        send_counter: 0,
                        recv_window: Default::default(),
                        peer_node_id: Some(prev_record.peer_node_id),
                        resumption: Some(CaseResumptionRecord {
                            resumption_id: new_resumption_id,
                            shared_secret: prev_record.shared_secret,
                            peer_node_id: prev_record.peer_node_id,
                        }),
                    });
                }
            }
        }
    }

    state = CaseState::WaitingSigma3;
    tracing::debug!(?state, "no usable resumption, running full Sigma2/Sigma3 handshake");
    let mut responder_random = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut responder_random);
    let eph = ecc::generate_keypair();
    let responder_eph_pub_key = ecc::encode_public_key_uncompressed(&eph.public);

    let initiator_public = ecc::decode_public_key(&sigma1.initiator_eph_pub_key)?;
    let shared_secret = ecc::ecdh_shared_secret(&eph.secret, &initiator_public);

    let mut resumption_id = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut resumption_id);
    let tbs_data2 = crate::messages::tbs_data2(
        &fabric.noc,
        fabric.icac.as_deref(),
        &responder_eph_pub_key,
        &sigma1.initiator_eph_pub_key,
    );
    let signature = ecc::sign(&operational_keypair.secret, &tbs_data2);
    let tbe2 = Tbe2 { responder_noc: fabric.noc.clone(), responder_icac: fabric.icac.clone(), signature, resumption_id };
    let s2k = derive_s2k(&shared_secret, &ipk, &responder_random, &responder_eph_pub_key, &sigma1_bytes)?;
    let encrypted2 = matter_crypto::aead::seal(&s2k, SIGMA2_NONCE, &tbe2.encode()?, &[])?;
    let sigma2 = Sigma2 { responder_random, responder_session_id: local_session_id, responder_eph_pub_key, encrypted2 };
    let sigma2_bytes = sigma2.encode()?;
    exchange
        .send(exchange_id, opcode::SIGMA2, sigma2_bytes.clone(), true)
        .await
        .map_err(|_| CaseError::Timeout)?;

    let (op, payload) = recv(exchange, exchange_id, deadline).await?;
    if op != opcode::SIGMA3 {
        state = CaseState::Failed;
        return Err(CaseError::UnexpectedOpcode(op));
    }
    let sigma3 = Sigma3::decode(&payload)?;
    let s3k = derive_s3k(&shared_secret, &ipk, &sigma1_bytes, &sigma2_bytes)?;
    let tbe3_bytes = matter_crypto::aead::open(&s3k, SIGMA3_NONCE, &sigma3.encrypted3, &[])?;
    let tbe3 = Tbe3::decode(&tbe3_bytes)?;

    let cert_info = validator
        .validate(&tbe3.initiator_noc, tbe3.initiator_icac.as_deref(), &fabric.root_public_key)
        .await
        .map_err(|e| CaseError::CertificateInvalid(e.to_string()))?;
    if cert_info.fabric_id.0 != fabric.fabric_id.0 {
        return Err(CaseError::FabricIdMismatch(cert_info.fabric_id.0));
    }
    let tbs_data3 = crate::messages::tbs_data3(
        &tbe3.initiator_noc,
        tbe3.initiator_icac.as_deref(),
        &sigma1.initiator_eph_pub_key,
        &responder_eph_pub_key,
    );
    let initiator_operational_key = ecc::decode_public_key(&cert_info.public_key)?;
    ecc::verify(&initiator_operational_key, &tbs_data3, &tbe3.signature)
        .map_err(|_| CaseError::CertificateInvalid("Sigma3 signature verification failed".into()))?;

    let status = StatusReport { general_code: StatusReport::GENERAL_CODE_SUCCESS, protocol_id: 0, protocol_code: 0 };
    exchange
        .send(exchange_id, opcode::STATUS_REPORT, status.encode(), false)
        .await
        .map_err(|_| CaseError::Timeout)?;

    let mut transcript = sigma1_bytes;
    transcript.extend_from_slice(&sigma2_bytes);
    transcript.extend_from_slice(&payload);
    let keys = derive_session_keys(&shared_secret, &ipk, &transcript)?;

    state = CaseState::Complete;
    tracing::debug!(?state, "CASE responder completed");
    Ok(SecureContext {
        session_type: SessionType::Case,
        local_session_id: SessionId(local_session_id),
        peer_session_id: SessionId(sigma1.initiator_session_id),
        i2r_key: keys.i2r_key,
        r2i_key: keys.r2i_key,
        attestation_challenge: keys.attestation_challenge,
        peer_privacy_key: matter_crypto::nonce::derive_privacy_key(&keys.r2i_key)?,
        send_counter: 0,
        recv_window: Default::default(),
        peer_node_id: Some(cert_info.node_id),
        resumption: Some(CaseResumptionRecord { resumption_id, shared_secret, peer_node_id: cert_info.node_id }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use matter_core_types::ids::{CompressedFabricId, FabricId, FabricIndex, NodeId, VendorId};
    use matter_core_types::traits::PeerCertInfo;
    use matter_core_types::MatterError;
    use std::time::Duration;
    use tokio::sync::Mutex;

    struct PairedExchange {
        outgoing: Mutex<tokio::sync::mpsc::UnboundedSender<(u8, Vec<u8>)>>,
        incoming: Mutex<tokio::sync::mpsc::UnboundedReceiver<(u8, Vec<u8>)>>,
    }

    #[async_trait::async_trait]
    impl ExchangeManager for PairedExchange {
        async fn new_exchange(&self, _peer: std::net::SocketAddr, _protocol_id: u16) -> matter_core_types::Result<u16> {
            Ok(0)
        }

        async fn send(&self, _exchange_id: u16, opcode: u8, payload: Vec<u8>, _ack: bool) -> matter_core_types::Result<()> {
            self.outgoing
                .lock()
                .await
                .send((opcode, payload))
                .map_err(|e| MatterError::CollaboratorError(anyhow::anyhow!(e.to_string())))
        }

        async fn recv(&self, _exchange_id: u16, deadline: Instant) -> matter_core_types::Result<(u8, Vec<u8>)> {
            let timeout = deadline.saturating_duration_since(Instant::now());
            tokio::time::timeout(timeout, self.incoming.lock().await.recv())
                .await
                .map_err(|_| MatterError::Timeout("paired exchange".into()))?
                .ok_or_else(|| MatterError::Canceled)
        }

        async fn close(&self, _exchange_id: u16) -> matter_core_types::Result<()> {
            Ok(())
        }
    }

    fn paired() -> (PairedExchange, PairedExchange) {
        let (tx_a, rx_a) = tokio::sync::mpsc::unbounded_channel();
        let (tx_b, rx_b) = tokio::sync::mpsc::unbounded_channel();
        (
            PairedExchange { outgoing: Mutex::new(tx_a), incoming: Mutex::new(rx_b) },
            PairedExchange { outgoing: Mutex::new(tx_b), incoming: Mutex::new(rx_a) },
        )
    }

    struct FixedValidator(PeerCertInfo);

    #[async_trait::async_trait]
    impl CaseCertificateValidator for FixedValidator {
        async fn validate(
            &self,
            _noc: &[u8],
            _icac: Option<&[u8]>,
            _trusted_root_public_key: &[u8; 65],
        ) -> matter_core_types::Result<PeerCertInfo> {
            Ok(self.0)
        }
    }

    struct FixedFabricStore {
        fabrics: Vec<FabricInfo>,
        resumption: Mutex<Option<SecureContext>>,
    }

    #[async_trait::async_trait]
    impl FabricStore for FixedFabricStore {
        async fn all_fabrics(&self) -> matter_core_types::Result<Vec<FabricInfo>> {
            Ok(self.fabrics.clone())
        }

        async fn resumption_by_id(&self, resumption_id: &[u8; 16]) -> matter_core_types::Result<Option<SecureContext>> {
            let guard = self.resumption.lock().await;
            Ok(guard
                .as_ref()
                .filter(|ctx| ctx.resumption.as_ref().map(|r| r.resumption_id) == Some(*resumption_id))
                .cloned())
        }
    }

    const ROOT_PUBLIC_KEY: [u8; 65] = [0x04u8; 65];
    const COMPRESSED_FABRIC_ID: CompressedFabricId = CompressedFabricId([0x11u8; 8]);
    const EPOCH_KEY: [u8; 16] = [0x22u8; 16];
    const FABRIC_ID: u64 = 42;
    const RESPONDER_NODE_ID: u64 = 99;
    const INITIATOR_NODE_ID: u64 = 7;

    fn fabric(node_id: u64) -> FabricInfo {
        FabricInfo {
            fabric_index: FabricIndex::new(1).unwrap(),
            fabric_id: FabricId(FABRIC_ID),
            node_id: NodeId(node_id),
            vendor_id: VendorId(0xFFF1),
            root_public_key: ROOT_PUBLIC_KEY,
            compressed_fabric_id: COMPRESSED_FABRIC_ID,
            ipk: EPOCH_KEY,
            noc: format!("noc-for-{node_id}").into_bytes(),
            icac: None,
        }
    }

    #[tokio::test]
    async fn full_handshake_produces_matching_session_keys() {
        let (initiator_exchange, responder_exchange) = paired();
        let deadline = Instant::now() + Duration::from_secs(5);

        let initiator_fabric = fabric(INITIATOR_NODE_ID);
        let responder_fabric = fabric(RESPONDER_NODE_ID);
        let initiator_keypair = ecc::generate_keypair();
        let responder_keypair = ecc::generate_keypair();

        let initiator_validator = FixedValidator(PeerCertInfo {
            node_id: NodeId(RESPONDER_NODE_ID),
            fabric_id: FabricId(FABRIC_ID),
            public_key: ecc::encode_public_key_uncompressed(&responder_keypair.public),
        });
        let responder_validator = FixedValidator(PeerCertInfo {
            node_id: NodeId(INITIATOR_NODE_ID),
            fabric_id: FabricId(FABRIC_ID),
            public_key: ecc::encode_public_key_uncompressed(&initiator_keypair.public),
        });
        let fabric_store = FixedFabricStore { fabrics: vec![responder_fabric], resumption: Mutex::new(None) };

        let responder = tokio::spawn(async move {
            run_responder(&responder_exchange, 0, &fabric_store, &responder_keypair, 2, &responder_validator, deadline)
                .await
        });
        let initiator_ctx = run_initiator(
            &initiator_exchange,
            0,
            &initiator_fabric,
            &initiator_keypair,
            RESPONDER_NODE_ID,
            1,
            &initiator_validator,
            None,
            deadline,
        )
        .await
        .unwrap();
        let responder_ctx = responder.await.unwrap().unwrap();

        assert_eq!(initiator_ctx.i2r_key, responder_ctx.i2r_key);
        assert_eq!(initiator_ctx.r2i_key, responder_ctx.r2i_key);
        assert_eq!(initiator_ctx.attestation_challenge, responder_ctx.attestation_challenge);
        assert_eq!(initiator_ctx.local_session_id.0, 1);
        assert_eq!(responder_ctx.local_session_id.0, 2);
        assert_eq!(initiator_ctx.peer_session_id.0, 2);
        assert_eq!(responder_ctx.peer_session_id.0, 1);
        assert_eq!(responder_ctx.peer_node_id, Some(NodeId(INITIATOR_NODE_ID)));
        assert_eq!(initiator_ctx.peer_node_id, Some(NodeId(RESPONDER_NODE_ID)));
    }

    #[tokio::test]
    async fn resumption_skips_the_full_handshake() {
        let (initiator_exchange, responder_exchange) = paired();
        let deadline = Instant::now() + Duration::from_secs(5);

        let initiator_fabric = fabric(INITIATOR_NODE_ID);
        let responder_fabric = fabric(RESPONDER_NODE_ID);
        let initiator_keypair = ecc::generate_keypair();
        let responder_keypair = ecc::generate_keypair();

        let prior_shared_secret = [0x77u8; 32];
        let prior_resumption_id = [0x88u8; 16];
        let prior_record = CaseResumptionRecord {
            resumption_id: prior_resumption_id,
            shared_secret: prior_shared_secret,
            peer_node_id: NodeId(RESPONDER_NODE_ID),
        };
        let responder_side_context = SecureContext {
            session_type: SessionType::Case,
            local_session_id: SessionId(2),
            peer_session_id: SessionId(1),
            i2r_key: [0u8; 16],
            r2i_key: [0u8; 16],
            attestation_challenge: [0u8; 16],
            peer_privacy_key: [0u8; 16],
            send_counter: 0,
            recv_window: Default::default(),
            peer_node_id: Some(NodeId(INITIATOR_NODE_ID)),
            resumption: Some(CaseResumptionRecord {
                resumption_id: prior_resumption_id,
                shared_secret: prior_shared_secret,
                peer_node_id: NodeId(INITIATOR_NODE_ID),
            }),
        };

        let initiator_validator = FixedValidator(PeerCertInfo {
            node_id: NodeId(RESPONDER_NODE_ID),
            fabric_id: FabricId(FABRIC_ID),
            public_key: ecc::encode_public_key_uncompressed(&responder_keypair.public),
        });
        let fabric_store =
            FixedFabricStore { fabrics: vec![responder_fabric], resumption: Mutex::new(Some(responder_side_context)) };

        let responder = tokio::spawn(async move {
            run_responder(&responder_exchange, 0, &fabric_store, &responder_keypair, 2, &FixedValidator(PeerCertInfo {
                node_id: NodeId(INITIATOR_NODE_ID),
                fabric_id: FabricId(FABRIC_ID),
                public_key: ecc::encode_public_key_uncompressed(&initiator_keypair.public),
            }), deadline)
                .await
        });
        let initiator_ctx = run_initiator(
            &initiator_exchange,
            0,
            &initiator_fabric,
            &initiator_keypair,
            RESPONDER_NODE_ID,
            1,
            &initiator_validator,
            Some(&prior_record),
            deadline,
        )
        .await
        .unwrap();
        let responder_ctx = responder.await.unwrap().unwrap();

        assert_eq!(initiator_ctx.i2r_key, responder_ctx.i2r_key);
        assert_eq!(initiator_ctx.r2i_key, responder_ctx.r2i_key);
        assert_ne!(initiator_ctx.resumption.as_ref().unwrap().resumption_id, prior_resumption_id);
        assert_eq!(
            initiator_ctx.resumption.as_ref().unwrap().resumption_id,
            responder_ctx.resumption.as_ref().unwrap().resumption_id
        );
    }

    #[tokio::test]
    async fn unknown_resumption_id_falls_back_to_full_handshake() {
        let (initiator_exchange, responder_exchange) = paired();
        let deadline = Instant::now() + Duration::from_secs(5);

        let initiator_fabric = fabric(INITIATOR_NODE_ID);
        let responder_fabric = fabric(RESPONDER_NODE_ID);
        let initiator_keypair = ecc::generate_keypair();
        let responder_keypair = ecc::generate_keypair();

        // Initiator offers a resumption record the responder has never seen.
        let offered_shared_secret = [0x77u8; 32];
        let offered_resumption_id = [0x88u8; 16];
        let offered_record = CaseResumptionRecord {
            resumption_id: offered_resumption_id,
            shared_secret: offered_shared_secret,
            peer_node_id: NodeId(RESPONDER_NODE_ID),
        };

        let initiator_validator = FixedValidator(PeerCertInfo {
            node_id: NodeId(RESPONDER_NODE_ID),
            fabric_id: FabricId(FABRIC_ID),
            public_key: ecc::encode_public_key_uncompressed(&responder_keypair.public),
        });
        let responder_validator = FixedValidator(PeerCertInfo {
            node_id: NodeId(INITIATOR_NODE_ID),
            fabric_id: FabricId(FABRIC_ID),
            public_key: ecc::encode_public_key_uncompressed(&initiator_keypair.public),
        });
        // Responder's store has no resumption record at all.
        let fabric_store = FixedFabricStore { fabrics: vec![responder_fabric], resumption: Mutex::new(None) };

        let responder = tokio::spawn(async move {
            run_responder(&responder_exchange, 0, &fabric_store, &responder_keypair, 2, &responder_validator, deadline)
                .await
        });
        let initiator_ctx = run_initiator(
            &initiator_exchange,
            0,
            &initiator_fabric,
            &initiator_keypair,
            RESPONDER_NODE_ID,
            1,
            &initiator_validator,
            Some(&offered_record),
            deadline,
        )
        .await
        .unwrap();
        let responder_ctx = responder.await.unwrap().unwrap();

        // Session still completes, via the full Sigma2/Sigma3 path rather
        // than the resumption shortcut: a fresh shared secret is derived,
        // not the one tied to the unrecognized resumption id.
        assert_eq!(initiator_ctx.i2r_key, responder_ctx.i2r_key);
        assert_eq!(initiator_ctx.r2i_key, responder_ctx.r2i_key);
        assert_ne!(initiator_ctx.resumption.as_ref().unwrap().shared_secret, offered_shared_secret);
        assert_ne!(initiator_ctx.resumption.as_ref().unwrap().resumption_id, offered_resumption_id);
    }

    #[tokio::test]
    async fn responder_rejects_unexpected_opcode() {
        let (initiator_exchange, responder_exchange) = paired();
        let deadline = Instant::now() + Duration::from_secs(5);
        let fabric_store = FixedFabricStore { fabrics: vec![], resumption: Mutex::new(None) };
        let responder_keypair = ecc::generate_keypair();
        let validator = FixedValidator(PeerCertInfo {
            node_id: NodeId(INITIATOR_NODE_ID),
            fabric_id: FabricId(FABRIC_ID),
            public_key: [0u8; 65],
        });

        let spoof = tokio::spawn(async move {
            initiator_exchange.send(0, opcode::SIGMA3, Vec::new(), true).await.unwrap();
        });
        let result = run_responder(&responder_exchange, 0, &fabric_store, &responder_keypair, 2, &validator, deadline).await;
        spoof.await.unwrap();

        assert!(matches!(result, Err(CaseError::UnexpectedOpcode(op)) if op == opcode::SIGMA3));
    }
}
