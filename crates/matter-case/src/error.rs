use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaseError {
    #[error("operation invalid in state {0}")]
    InvalidState(&'static str),

    #[error("received opcode {0:#x} is not valid for the current state")]
    UnexpectedOpcode(u8),

    #[error("CASE handshake timed out")]
    Timeout,

    #[error("resumption and resume-MIC fields must both be present or both absent")]
    IncompleteResumptionFields,

    #[error("no installed fabric matches the destination identifier")]
    NoSharedRoot,

    #[error("peer node id {0} does not match the expected target")]
    NodeIdMismatch(u64),

    #[error("peer fabric id {0} does not match the responder's fabric")]
    FabricIdMismatch(u64),

    #[error(transparent)]
    Tlv(#[from] matter_tlv::TlvError),

    #[error(transparent)]
    Crypto(#[from] matter_crypto::CryptoError),

    #[error("certificate chain validation failed: {0}")]
    CertificateInvalid(String),

    #[error("peer reported a status: general={general_code:#x} protocol={protocol_code:#x}")]
    PeerStatusReport { general_code: u16, protocol_code: u16 },
}

impl From<CaseError> for matter_core_types::MatterError {
    fn from(e: CaseError) -> Self {
        match e {
            CaseError::Timeout => matter_core_types::MatterError::Timeout(e.to_string()),
            CaseError::CertificateInvalid(msg) => matter_core_types::MatterError::CertificateInvalid(msg),
            _ => matter_core_types::MatterError::PeerProtocolError(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CaseError>;
