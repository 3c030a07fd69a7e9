use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("AEAD seal failed")]
    AeadSeal,

    #[error("AEAD open failed (authentication tag mismatch — possible tampering)")]
    AeadOpen,

    #[error("unsupported AEAD parameter: {0}")]
    UnsupportedParams(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("PBKDF2 iteration count out of range [1000, 100000]: {0}")]
    PbkdfIterations(u32),

    #[error("public key is not on the P-256 curve")]
    PointNotOnCurve,

    #[error("signature verification failed")]
    SignatureVerification,

    #[error("plaintext exceeds the 2^16 - 1 AES-CCM length limit")]
    PlaintextTooLong,
}

impl From<CryptoError> for matter_core_types::MatterError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::AeadOpen | CryptoError::SignatureVerification => {
                matter_core_types::MatterError::AuthFailure(e.to_string())
            }
            _ => matter_core_types::MatterError::InvalidInput(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;
