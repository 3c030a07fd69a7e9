use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupPayloadError {
    #[error("invalid Base38 character: {0:?}")]
    InvalidBase38Char(char),

    #[error("invalid Base38 chunk length: {0}")]
    InvalidBase38ChunkLength(usize),

    #[error("Base38 chunk value out of range for its byte width")]
    Base38ValueOutOfRange,

    #[error("missing 'MT:' prefix")]
    MissingQrPrefix,

    #[error("QR payload is too short: expected at least {expected} bytes, got {got}")]
    QrPayloadTooShort { expected: usize, got: usize },

    #[error("QR padding bits are non-zero")]
    QrPaddingNonZero,

    #[error("manual pairing code has invalid length: {0}")]
    InvalidManualCodeLength(usize),

    #[error("manual pairing code contains a non-digit character")]
    ManualCodeNotDigits,

    #[error("manual pairing code check digit mismatch")]
    ManualCodeCheckDigitMismatch,

    #[error("manual pairing code's first chunk value {0} is reserved")]
    ReservedChunk1Value(u8),

    #[error("discriminator does not fit in {0} bits")]
    DiscriminatorOutOfRange(u32),

    #[error("passcode does not fit in 27 bits or is a forbidden value")]
    InvalidPasscode,
}

impl From<SetupPayloadError> for matter_core_types::MatterError {
    fn from(e: SetupPayloadError) -> Self {
        matter_core_types::MatterError::InvalidInput(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SetupPayloadError>;
