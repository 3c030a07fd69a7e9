//! PASE initiator/responder state machines (spec §4.3, §5.1). Both run the
//! six-message flow to completion or fail closed: any invalid-state entry,
//! unexpected opcode, SPAKE2+ confirmation mismatch, or exchange timeout
//! aborts the handshake without publishing a session.

use std::time::Instant;

use matter_core_types::ids::SessionId;
use matter_core_types::session::SecureContext;
use matter_core_types::session::SessionType;
use matter_core_types::traits::ExchangeManager;
use matter_spake2p::{compute_w0_w1, Spake2pProver, Spake2pVerifier};
use rand::RngCore;

use crate::error::{PaseError, Result};
use crate::messages::{opcode, Pake1, Pake2, Pake3, PbkdfParamRequest, PbkdfParamResponse, PbkdfParams, StatusReport};
use crate::session_keys::derive_session_keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiatorState {
    Init,
    WaitingPbkdfParamResponse,
    WaitingPake2,
    WaitingStatusReport,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    Init,
    WaitingPake1,
    WaitingPake3,
    Complete,
    Failed,
}

async fn recv(exchange: &dyn ExchangeManager, exchange_id: u16, deadline: Instant) -> Result<(u8, Vec<u8>)> {
    exchange.recv(exchange_id, deadline).await.map_err(|_| PaseError::Timeout)
}

fn build_context(ke: &[u8; 16], local_session_id: u16, peer_session_id: u16) -> Result<SecureContext> {
    let keys = derive_session_keys(ke)?;
    Ok(SecureContext {
        session_type: SessionType::Pase,
        local_session_id: SessionId(local_session_id),
        peer_session_id: SessionId(peer_session_id),
        i2r_key: keys.i2r_key,
        r2i_key: keys.r2i_key,
        attestation_challenge: keys.attestation_challenge,
        peer_privacy_key: matter_crypto::nonce::derive_privacy_key(&keys.r2i_key)?,
        send_counter: 0,
        recv_window: Default::default(),
        peer_node_id: None,
        resumption: None,
    })
}

/// Runs the commissioner side of PASE to completion.
pub async fn run_initiator(
    exchange: &dyn ExchangeManager,
    exchange_id: u16,
    passcode: u32,
    local_session_id: u16,
    deadline: Instant,
) -> Result<SecureContext> {
    let mut state = InitiatorState::Init;

    let mut initiator_random = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut initiator_random);
    let request = PbkdfParamRequest {
        initiator_random,
        initiator_session_id: local_session_id,
        passcode_id: 0,
        has_pbkdf_params: true,
    };
    exchange
        .send(exchange_id, opcode::PBKDF_PARAM_REQUEST, request.encode()?, true)
        .await
        .map_err(|_| PaseError::Timeout)?;
    state = InitiatorState::WaitingPbkdfParamResponse;

    let (op, payload) = recv(exchange, exchange_id, deadline).await?;
    if op != opcode::PBKDF_PARAM_RESPONSE {
        state = InitiatorState::Failed;
        tracing::warn!(?state, opcode = op, "unexpected opcode waiting for PBKDFParamResponse");
        return Err(PaseError::UnexpectedOpcode(op));
    }
    let response = PbkdfParamResponse::decode(&payload)?;
    let params = response
        .pbkdf_params
        .ok_or(PaseError::InvalidState("PBKDFParamResponse without params"))?;

    let (w0, w1) = compute_w0_w1(passcode, &params.salt, params.iterations)?;
    let mut prover = Spake2pProver::new(w0, w1);
    let p_a = prover.generate_share()?;
    exchange
        .send(exchange_id, opcode::PAKE1, Pake1 { p_a }.encode()?, true)
        .await
        .map_err(|_| PaseError::Timeout)?;
    state = InitiatorState::WaitingPake2;

    let (op, payload) = recv(exchange, exchange_id, deadline).await?;
    if op != opcode::PAKE2 {
        state = InitiatorState::Failed;
        tracing::warn!(?state, opcode = op, "unexpected opcode waiting for Pake2");
        return Err(PaseError::UnexpectedOpcode(op));
    }
    let pake2 = Pake2::decode(&payload)?;
    let c_a = prover.process_peer_share(&pake2.p_b)?;
    let ke = prover.verify_peer_confirmation(&pake2.c_b)?;

    exchange
        .send(exchange_id, opcode::PAKE3, Pake3 { c_a }.encode()?, true)
        .await
        .map_err(|_| PaseError::Timeout)?;
    state = InitiatorState::WaitingStatusReport;

    let (op, payload) = recv(exchange, exchange_id, deadline).await?;
    if op != opcode::STATUS_REPORT {
        state = InitiatorState::Failed;
        return Err(PaseError::UnexpectedOpcode(op));
    }
    StatusReport::decode(&payload)?.into_result()?;
    state = InitiatorState::Complete;
    tracing::debug!(?state, "PASE initiator completed");

    build_context(&ke, local_session_id, response.responder_session_id)
}

/// Runs the commissionee side of PASE to completion. `w0`/`l` are derived
/// by the caller from the device's stored passcode verifier (spec §9: the
/// device never holds the raw passcode after provisioning).
pub async fn run_responder(
    exchange: &dyn ExchangeManager,
    exchange_id: u16,
    w0: p256::Scalar,
    l: p256::ProjectivePoint,
    local_session_id: u16,
    iterations: u32,
    salt: Vec<u8>,
    deadline: Instant,
) -> Result<SecureContext> {
    let mut state = ResponderState::Init;

    let (op, payload) = recv(exchange, exchange_id, deadline).await?;
    if op != opcode::PBKDF_PARAM_REQUEST {
        state = ResponderState::Failed;
        return Err(PaseError::UnexpectedOpcode(op));
    }
    let request = PbkdfParamRequest::decode(&payload)?;

    let mut responder_random = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut responder_random);
    let response = PbkdfParamResponse {
        initiator_random: request.initiator_random,
        responder_random,
        responder_session_id: local_session_id,
        pbkdf_params: request.has_pbkdf_params.then(|| PbkdfParams { iterations, salt }),
    };
    exchange
        .send(exchange_id, opcode::PBKDF_PARAM_RESPONSE, response.encode()?, true)
        .await
        .map_err(|_| PaseError::Timeout)?;
    state = ResponderState::WaitingPake1;

    let mut verifier = Spake2pVerifier::new(w0, l);
    let p_b = verifier.generate_share()?;

    let (op, payload) = recv(exchange, exchange_id, deadline).await?;
    if op != opcode::PAKE1 {
        state = ResponderState::Failed;
        return Err(PaseError::UnexpectedOpcode(op));
    }
    let pake1 = Pake1::decode(&payload)?;
    let c_b = verifier.process_peer_share(&pake1.p_a)?;

    exchange
        .send(exchange_id, opcode::PAKE2, Pake2 { p_b, c_b }.encode()?, true)
        .await
        .map_err(|_| PaseError::Timeout)?;
    state = ResponderState::WaitingPake3;

    let (op, payload) = recv(exchange, exchange_id, deadline).await?;
    if op != opcode::PAKE3 {
        state = ResponderState::Failed;
        return Err(PaseError::UnexpectedOpcode(op));
    }
    let pake3 = Pake3::decode(&payload)?;
    let ke = verifier.verify_peer_confirmation(&pake3.c_a)?;

    let status = StatusReport { general_code: StatusReport::GENERAL_CODE_SUCCESS, protocol_id: 0, protocol_code: 0 };
    exchange
        .send(exchange_id, opcode::STATUS_REPORT, status.encode(), false)
        .await
        .map_err(|_| PaseError::Timeout)?;
    state = ResponderState::Complete;
    tracing::debug!(?state, "PASE responder completed");

    let _ = response;
    build_context(&ke, local_session_id, request.initiator_session_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use matter_core_types::MatterError;
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Connects an initiator and a responder over in-process channels so
    /// the full six-message flow can run without a real transport.
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

    #[tokio::test]
    async fn full_handshake_produces_matching_session_keys() {
        let (initiator_exchange, responder_exchange) = paired();
        let passcode = 20202021u32;
        let salt = b"0123456789012345".to_vec();
        let iterations = 1000;

        let (w0, w1) = matter_spake2p::compute_w0_w1(passcode, &salt, iterations).unwrap();
        let l = matter_spake2p::compute_l(&w1);

        let deadline = Instant::now() + Duration::from_secs(5);
        let responder = tokio::spawn(async move {
            run_responder(&responder_exchange, 0, w0, l, 2, iterations, salt, deadline).await
        });
        let initiator_ctx = run_initiator(&initiator_exchange, 0, passcode, 1, deadline).await.unwrap();
        let responder_ctx = responder.await.unwrap().unwrap();

        assert_eq!(initiator_ctx.i2r_key, responder_ctx.i2r_key);
        assert_eq!(initiator_ctx.r2i_key, responder_ctx.r2i_key);
        assert_eq!(initiator_ctx.attestation_challenge, responder_ctx.attestation_challenge);
        assert_eq!(initiator_ctx.local_session_id.0, 1);
        assert_eq!(responder_ctx.local_session_id.0, 2);
        assert_eq!(initiator_ctx.peer_session_id.0, 2);
        assert_eq!(responder_ctx.peer_session_id.0, 1);
    }

    #[tokio::test]
    async fn wrong_passcode_fails_confirmation() {
        let (initiator_exchange, responder_exchange) = paired();
        let salt = b"0123456789012345".to_vec();
        let iterations = 1000;

        let (w0, w1) = matter_spake2p::compute_w0_w1(20202021, &salt, iterations).unwrap();
        let l = matter_spake2p::compute_l(&w1);

        let deadline = Instant::now() + Duration::from_secs(5);
        let responder = tokio::spawn(async move {
            run_responder(&responder_exchange, 0, w0, l, 2, iterations, salt, deadline).await
        });
        let initiator_result = run_initiator(&initiator_exchange, 0, 11111111, 1, deadline).await;
        let responder_result = responder.await.unwrap();

        assert!(initiator_result.is_err() || responder_result.is_err());
    }

    #[tokio::test]
    async fn initiator_rejects_unexpected_opcode() {
        let (initiator_exchange, responder_exchange) = paired();
        let deadline = Instant::now() + Duration::from_secs(5);

        let spoof = tokio::spawn(async move {
            let (_op, _payload) = responder_exchange.recv(0, deadline).await.unwrap();
            responder_exchange.send(0, opcode::PAKE2, Vec::new(), false).await.unwrap();
        });
        let result = run_initiator(&initiator_exchange, 0, 20202021, 1, deadline).await;
        spoof.await.unwrap();

        assert!(matches!(result, Err(PaseError::UnexpectedOpcode(op)) if op == opcode::PAKE2));
    }
}
