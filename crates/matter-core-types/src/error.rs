//! Unified error taxonomy (spec §7). Every crate in the workspace converts
//! its own errors into `MatterError` at its public boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatterError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("canceled")]
    Canceled,

    #[error("peer protocol error: {0}")]
    PeerProtocolError(String),

    #[error("authentication failure: {0}")]
    AuthFailure(String),

    #[error("certificate invalid: {0}")]
    CertificateInvalid(String),

    #[error("attestation rejected: {0}")]
    AttestationRejected(String),

    #[error("fail-safe expired")]
    FailSafeExpired,

    #[error("collaborator error: {0}")]
    CollaboratorError(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MatterError>;
