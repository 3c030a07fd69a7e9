use thiserror::Error;

#[derive(Debug, Error)]
pub enum Spake2pError {
    #[error("operation invalid in state {0:?}")]
    InvalidState(&'static str),

    #[error("peer key share is not a valid P-256 point")]
    InvalidPeerShare,

    #[error("peer confirmation MAC did not match")]
    ConfirmationMismatch,

    #[error("PBKDF2 parameters invalid: {0}")]
    InvalidPbkdfParams(String),

    #[error(transparent)]
    Crypto(#[from] matter_crypto::CryptoError),
}

impl From<Spake2pError> for matter_core_types::MatterError {
    fn from(e: Spake2pError) -> Self {
        match e {
            Spake2pError::ConfirmationMismatch | Spake2pError::InvalidPeerShare => {
                matter_core_types::MatterError::AuthFailure(e.to_string())
            }
            _ => matter_core_types::MatterError::InvalidInput(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Spake2pError>;
