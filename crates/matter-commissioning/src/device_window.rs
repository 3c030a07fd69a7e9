//! Device-side commissioning window (spec §4.7): a mirror state machine
//! that advertises, runs PASE as responder, reacts to ArmFailSafe and
//! CommissioningComplete, and arms/disarms the fail-safe timer across the
//! run. Attestation and credential-issuance commands are handed off to a
//! `DeviceCommandHandler` collaborator rather than answered here, the same
//! delegation the controller side uses for CSR/AddNOC/network
//! provisioning.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use matter_core_types::traits::{ExchangeManager, FailSafeRevert, SessionManager};
use tokio::sync::watch;

use crate::error::{CommissioningError, Result};
use crate::fail_safe::FailSafeTimer;
use crate::messages::{opcode, ClusterStatusResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Uncommissioned,
    Advertising,
    PASEPending,
    PASEEstablished,
    Commissioning,
    Commissioned,
    Failed,
}

/// Any cluster command other than ArmFailSafe/CommissioningComplete,
/// handled entirely outside the window's own state transitions.
#[async_trait]
pub trait DeviceCommandHandler: Send + Sync {
    async fn handle(&self, opcode: u8, payload: Vec<u8>) -> Result<(u8, Vec<u8>)>;
}

/// Handed to `open()`; carries the run's deadline and a cooperative
/// cancellation signal.
pub struct WindowContext {
    deadline: Instant,
    cancel_rx: watch::Receiver<bool>,
}

/// Returned alongside the context's matching half so the caller can cancel
/// or close the window from another task.
pub struct WindowHandle {
    close_tx: watch::Sender<bool>,
}

impl WindowHandle {
    pub fn close(&self) {
        let _ = self.close_tx.send(true);
    }
}

pub fn window_context(timeout: Duration) -> (WindowContext, WindowHandle) {
    let (close_tx, cancel_rx) = watch::channel(false);
    (WindowContext { deadline: Instant::now() + timeout, cancel_rx }, WindowHandle { close_tx })
}

pub struct DeviceCommissioningWindow {
    state: WindowState,
    fail_safe: FailSafeTimer,
    expired: std::sync::Arc<tokio::sync::Notify>,
}

impl DeviceCommissioningWindow {
    pub fn new(revert: std::sync::Arc<dyn FailSafeRevert>) -> Self {
        let revert_cb = revert.clone();
        let expired = std::sync::Arc::new(tokio::sync::Notify::new());
        let expired_cb = expired.clone();
        let fail_safe = FailSafeTimer::new(move || {
            let revert_cb = revert_cb.clone();
            let expired_cb = expired_cb.clone();
            tokio::spawn(async move {
                if let Err(e) = revert_cb.revert_provisional_state().await {
                    tracing::warn!(error = %e, "fail-safe revert collaborator failed");
                }
                expired_cb.notify_one();
            });
        });
        Self { state: WindowState::Uncommissioned, fail_safe, expired }
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Begins advertising, runs PASE as responder, then services cluster
    /// traffic until CommissioningComplete succeeds, the context is
    /// canceled, the deadline passes, or `close()` is called.
    #[allow(clippy::too_many_arguments)]
    pub async fn open(
        &mut self,
        exchange: &dyn ExchangeManager,
        pase_exchange_id: u16,
        cluster_exchange_id: u16,
        w0: p256::Scalar,
        l: p256::ProjectivePoint,
        local_session_id: u16,
        iterations: u32,
        salt: Vec<u8>,
        session_manager: &dyn SessionManager,
        command_handler: &dyn DeviceCommandHandler,
        ctx: WindowContext,
    ) -> Result<()> {
        self.state = WindowState::Advertising;
        tracing::debug!(state = ?self.state, "commissioning window opened");

        let mut cancel_rx = ctx.cancel_rx;
        let pase_result = tokio::select! {
            result = self.run_pase(exchange, pase_exchange_id, w0, l, local_session_id, iterations, salt, ctx.deadline) => result,
            _ = cancel_rx.changed() => {
                self.state = WindowState::Failed;
                return Err(CommissioningError::Canceled);
            }
        };

        let context = match pase_result {
            Ok(context) => context,
            Err(e) => {
                self.state = WindowState::Failed;
                return Err(e);
            }
        };
        self.state = WindowState::PASEEstablished;
        tracing::debug!(state = ?self.state, "PASE established");
        session_manager.publish(context).await?;

        loop {
            if Instant::now() >= ctx.deadline {
                self.state = WindowState::Failed;
                return Err(CommissioningError::Timeout);
            }
            let recv_fut = exchange.recv(cluster_exchange_id, ctx.deadline);
            tokio::select! {
                _ = self.expired.notified() => {
                    self.state = WindowState::Failed;
                    return Err(CommissioningError::FailSafeExpired);
                }
                result = recv_fut => {
                    let (op, payload) = result?;
                    match op {
                        opcode::ARM_FAIL_SAFE => {
                            let request = crate::messages::ArmFailSafeRequest::decode(&payload)?;
                            self.fail_safe.arm(Duration::from_secs(request.expiry_length_seconds as u64));
                            self.state = WindowState::Commissioning;
                            tracing::debug!(state = ?self.state, "fail-safe armed");
                            exchange.send(cluster_exchange_id, opcode::ARM_FAIL_SAFE_RESPONSE, ClusterStatusResponse::ok().encode()?, true).await?;
                        }
                        opcode::COMMISSIONING_COMPLETE => {
                            self.fail_safe.disarm();
                            self.state = WindowState::Commissioned;
                            tracing::debug!(state = ?self.state, "commissioning complete");
                            exchange.send(cluster_exchange_id, opcode::COMMISSIONING_COMPLETE_RESPONSE, ClusterStatusResponse::ok().encode()?, true).await?;
                            return Ok(());
                        }
                        other => {
                            let (response_opcode, response_payload) = command_handler.handle(other, payload).await?;
                            exchange.send(cluster_exchange_id, response_opcode, response_payload, true).await?;
                        }
                    }
                }
                _ = cancel_rx.changed() => {
                    self.state = WindowState::Failed;
                    return Err(CommissioningError::Canceled);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_pase(
        &mut self,
        exchange: &dyn ExchangeManager,
        exchange_id: u16,
        w0: p256::Scalar,
        l: p256::ProjectivePoint,
        local_session_id: u16,
        iterations: u32,
        salt: Vec<u8>,
        deadline: Instant,
    ) -> Result<matter_core_types::session::SecureContext> {
        self.state = WindowState::PASEPending;
        tracing::debug!(state = ?self.state, "PASE traffic observed");
        Ok(matter_pase::run_responder(exchange, exchange_id, w0, l, local_session_id, iterations, salt, deadline).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matter_core_types::session::SecureContext;
    use matter_core_types::traits::FailSafeRevert;
    use matter_core_types::MatterError;
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
                .ok_or(MatterError::Canceled)
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

    struct NoopRevert;
    #[async_trait::async_trait]
    impl FailSafeRevert for NoopRevert {
        async fn revert_provisional_state(&self) -> matter_core_types::Result<()> {
            Ok(())
        }
    }

    struct RecordingSessionManager {
        published: Mutex<Option<SecureContext>>,
    }
    #[async_trait::async_trait]
    impl SessionManager for RecordingSessionManager {
        async fn publish(&self, context: SecureContext) -> matter_core_types::Result<()> {
            *self.published.lock().await = Some(context);
            Ok(())
        }
        async fn remove(&self, _local_session_id: u16) -> matter_core_types::Result<()> {
            Ok(())
        }
    }

    struct UnreachableHandler;
    #[async_trait::async_trait]
    impl DeviceCommandHandler for UnreachableHandler {
        async fn handle(&self, opcode: u8, _payload: Vec<u8>) -> Result<(u8, Vec<u8>)> {
            panic!("unexpected cluster command 0x{opcode:02x}");
        }
    }

    #[tokio::test]
    async fn full_window_reaches_commissioned_on_arm_and_complete() {
        let (controller, device) = paired();
        let passcode = 20202021u32;
        let salt = b"0123456789012345".to_vec();
        let iterations = 1000;
        let (w0, w1) = matter_spake2p::compute_w0_w1(passcode, &salt, iterations).unwrap();
        let l = matter_spake2p::compute_l(&w1);

        let (ctx, _handle) = window_context(Duration::from_secs(5));
        let session_manager = RecordingSessionManager { published: Mutex::new(None) };

        let window_task = tokio::spawn(async move {
            let mut window = DeviceCommissioningWindow::new(std::sync::Arc::new(NoopRevert));
            let result = window
                .open(&device, 0, 0, w0, l, 2, iterations, salt, &session_manager, &UnreachableHandler, ctx)
                .await;
            (window.state(), result)
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        let _controller_pase = matter_pase::run_initiator(&controller, 0, passcode, 1, deadline).await.unwrap();

        let arm = crate::messages::ArmFailSafeRequest { expiry_length_seconds: 60, breadcrumb: 7 };
        controller.send(0, opcode::ARM_FAIL_SAFE, arm.encode().unwrap(), true).await.unwrap();
        let (op, payload) = controller.recv(0, deadline).await.unwrap();
        assert_eq!(op, opcode::ARM_FAIL_SAFE_RESPONSE);
        ClusterStatusResponse::decode(&payload).unwrap().into_result().unwrap();

        controller.send(0, opcode::COMMISSIONING_COMPLETE, Vec::new(), true).await.unwrap();
        let (op, payload) = controller.recv(0, deadline).await.unwrap();
        assert_eq!(op, opcode::COMMISSIONING_COMPLETE_RESPONSE);
        ClusterStatusResponse::decode(&payload).unwrap().into_result().unwrap();

        let (final_state, result) = window_task.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(final_state, WindowState::Commissioned);
    }

    #[tokio::test]
    async fn fail_safe_expiry_closes_the_window() {
        let (controller, device) = paired();
        let passcode = 20202021u32;
        let salt = b"0123456789012345".to_vec();
        let iterations = 1000;
        let (w0, w1) = matter_spake2p::compute_w0_w1(passcode, &salt, iterations).unwrap();
        let l = matter_spake2p::compute_l(&w1);

        let (ctx, _handle) = window_context(Duration::from_secs(5));
        let session_manager = RecordingSessionManager { published: Mutex::new(None) };

        let window_task = tokio::spawn(async move {
            let mut window = DeviceCommissioningWindow::new(std::sync::Arc::new(NoopRevert));
            let result = window
                .open(&device, 0, 0, w0, l, 2, iterations, salt, &session_manager, &UnreachableHandler, ctx)
                .await;
            (window.state(), result)
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        let _controller_pase = matter_pase::run_initiator(&controller, 0, passcode, 1, deadline).await.unwrap();

        let arm = crate::messages::ArmFailSafeRequest { expiry_length_seconds: 0, breadcrumb: 0 };
        controller.send(0, opcode::ARM_FAIL_SAFE, arm.encode().unwrap(), true).await.unwrap();
        let (op, payload) = controller.recv(0, deadline).await.unwrap();
        assert_eq!(op, opcode::ARM_FAIL_SAFE_RESPONSE);
        ClusterStatusResponse::decode(&payload).unwrap().into_result().unwrap();

        let (final_state, result) = window_task.await.unwrap();
        assert!(matches!(result, Err(CommissioningError::FailSafeExpired)));
        assert_eq!(final_state, WindowState::Failed);
    }
}
