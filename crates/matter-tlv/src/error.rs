use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlvError {
    #[error("unexpected end of TLV input")]
    UnexpectedEof,

    #[error("unknown element type: {0:#x}")]
    UnknownElementType(u8),

    #[error("expected tag {expected:?}, found {found:?}")]
    TagMismatch { expected: String, found: String },

    #[error("expected container end, found another element")]
    ExpectedContainerEnd,

    #[error("expected {0}, found a different element type")]
    TypeMismatch(&'static str),

    #[error("container nesting too deep")]
    NestingTooDeep,

    #[error("integer value does not fit the requested width")]
    IntegerTooWide,

    #[error("string or octet string exceeds the declared length")]
    LengthMismatch,
}

impl From<TlvError> for matter_core_types::MatterError {
    fn from(e: TlvError) -> Self {
        matter_core_types::MatterError::PeerProtocolError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TlvError>;
