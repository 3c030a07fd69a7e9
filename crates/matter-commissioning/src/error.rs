use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommissioningError {
    #[error("operation invalid in state {0}")]
    InvalidState(&'static str),

    #[error("no commissionable device found for the given discriminator")]
    DeviceNotFound,

    #[error("commissioning step timed out")]
    Timeout,

    #[error("commissioning was canceled")]
    Canceled,

    #[error("peer reported a cluster error: {0:#x}")]
    ClusterError(u8),

    #[error("device attestation was rejected")]
    AttestationRejected,

    #[error("fail-safe timer expired")]
    FailSafeExpired,

    #[error(transparent)]
    Pase(#[from] matter_pase::PaseError),

    #[error(transparent)]
    Case(#[from] matter_case::CaseError),

    #[error(transparent)]
    SetupPayload(#[from] matter_setup_payload::SetupPayloadError),

    #[error(transparent)]
    Tlv(#[from] matter_tlv::TlvError),

    #[error(transparent)]
    Crypto(#[from] matter_crypto::CryptoError),

    #[error(transparent)]
    Collaborator(#[from] matter_core_types::MatterError),
}

impl From<CommissioningError> for matter_core_types::MatterError {
    fn from(e: CommissioningError) -> Self {
        match e {
            CommissioningError::Collaborator(inner) => inner,
            CommissioningError::Timeout => matter_core_types::MatterError::Timeout(e.to_string()),
            CommissioningError::Canceled => matter_core_types::MatterError::Canceled,
            CommissioningError::AttestationRejected => matter_core_types::MatterError::AttestationRejected(e.to_string()),
            CommissioningError::FailSafeExpired => matter_core_types::MatterError::FailSafeExpired,
            CommissioningError::DeviceNotFound => matter_core_types::MatterError::PeerProtocolError(e.to_string()),
            _ => matter_core_types::MatterError::PeerProtocolError(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CommissioningError>;
