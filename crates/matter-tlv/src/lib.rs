//! matter-tlv — the TLV wire encoding every handshake message in this
//! workspace is framed in. No knowledge of PASE/CASE semantics lives here,
//! only tags, lengths, and values.

mod element;
pub mod error;
pub mod reader;
pub mod tag;
pub mod writer;

pub use error::{Result, TlvError};
pub use reader::{TlvElement, TlvReader, TlvValue};
pub use tag::Tag;
pub use writer::TlvWriter;
