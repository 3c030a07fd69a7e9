use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaseError {
    #[error("operation invalid in state {0}")]
    InvalidState(&'static str),

    #[error("received opcode {0:#x} is not valid for the current state")]
    UnexpectedOpcode(u8),

    #[error("PASE handshake timed out")]
    Timeout,

    #[error(transparent)]
    Tlv(#[from] matter_tlv::TlvError),

    #[error(transparent)]
    Spake2p(#[from] matter_spake2p::Spake2pError),

    #[error(transparent)]
    Crypto(#[from] matter_crypto::CryptoError),

    #[error("peer reported a status: general={general_code:#x} protocol={protocol_code:#x}")]
    PeerStatusReport { general_code: u16, protocol_code: u16 },
}

impl From<PaseError> for matter_core_types::MatterError {
    fn from(e: PaseError) -> Self {
        match e {
            PaseError::Timeout => matter_core_types::MatterError::Timeout(e.to_string()),
            PaseError::Spake2p(inner) => inner.into(),
            _ => matter_core_types::MatterError::PeerProtocolError(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PaseError>;
