//! Secure session context (spec §3 "Secure session context") and the replay
//! state it carries. Owned by the session manager collaborator (§6); PASE
//! and CASE only ever construct one and hand it over on success.

use crate::ids::{NodeId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    Pase,
    Case,
    Group,
}

/// Sliding receive-window replay state. 64-message window, matching the
/// Matter transport spec's recommended bitmap width.
#[derive(Debug, Clone)]
pub struct ReplayWindow {
    pub max_counter: u32,
    pub bitmap: u64,
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self {
            max_counter: 0,
            bitmap: 0,
        }
    }
}

impl ReplayWindow {
    /// Returns `true` if `counter` is new (not previously seen and not too
    /// far behind the window) and records it.
    pub fn accept(&mut self, counter: u32) -> bool {
        if counter > self.max_counter {
            let shift = counter - self.max_counter;
            self.bitmap = if shift >= 64 { 0 } else { self.bitmap << shift };
            self.bitmap |= 1;
            self.max_counter = counter;
            return true;
        }
        let back = self.max_counter - counter;
        if back >= 64 {
            return false;
        }
        let mask = 1u64 << back;
        if self.bitmap & mask != 0 {
            return false;
        }
        self.bitmap |= mask;
        true
    }
}

#[derive(Debug, Clone)]
pub struct SecureContext {
    pub session_type: SessionType,
    pub local_session_id: SessionId,
    pub peer_session_id: SessionId,
    /// Initiator-to-responder and responder-to-initiator encryption keys.
    pub i2r_key: [u8; 16],
    pub r2i_key: [u8; 16],
    pub attestation_challenge: [u8; 16],
    /// HKDF(encryption_key, info = "PrivacyKey") — see spec §4.1.
    pub peer_privacy_key: [u8; 16],
    pub send_counter: u32,
    pub recv_window: ReplayWindow,
    pub peer_node_id: Option<NodeId>,
    pub resumption: Option<CaseResumptionRecord>,
}

/// Persisted alongside a fabric to allow abbreviated CASE (Sigma2_Resume).
#[derive(Debug, Clone)]
pub struct CaseResumptionRecord {
    pub resumption_id: [u8; 16],
    pub shared_secret: [u8; 32],
    pub peer_node_id: NodeId,
}
