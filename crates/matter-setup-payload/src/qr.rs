//! QR-code onboarding payload (spec §4.4): `MT:` prefix followed by
//! Base38(88-bit bit-packed record `∥` optional TLV tail).

use crate::base38;
use crate::error::{Result, SetupPayloadError};
use crate::payload::{CommissioningFlow, DiscoveryCapabilities, SetupPayload};
use matter_core_types::ids::{ProductId, VendorId};

const PREFIX: &str = "MT:";
const RECORD_BITS: u32 = 88;
const RECORD_BYTES: usize = 11;

struct BitWriter {
    value: u128,
    offset: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self { value: 0, offset: 0 }
    }

    fn push(&mut self, field: u64, width: u32) {
        self.value |= (field as u128) << self.offset;
        self.offset += width;
    }

    fn into_bytes(self) -> [u8; RECORD_BYTES] {
        let mut out = [0u8; RECORD_BYTES];
        out.copy_from_slice(&self.value.to_le_bytes()[..RECORD_BYTES]);
        out
    }
}

struct BitReader {
    value: u128,
    offset: u32,
}

impl BitReader {
    fn from_bytes(bytes: &[u8]) -> Self {
        let mut padded = [0u8; 16];
        padded[..bytes.len().min(16)].copy_from_slice(&bytes[..bytes.len().min(16)]);
        Self { value: u128::from_le_bytes(padded), offset: 0 }
    }

    fn pull(&mut self, width: u32) -> u64 {
        let mask = (1u128 << width) - 1;
        let field = (self.value >> self.offset) & mask;
        self.offset += width;
        field as u64
    }
}

/// Encodes a setup payload as a `MT:` QR-code string.
pub fn encode(payload: &SetupPayload) -> Result<String> {
    if payload.discriminator > 0x0FFF {
        return Err(SetupPayloadError::DiscriminatorOutOfRange(12));
    }
    if payload.passcode == 0 || payload.passcode > 0x07FF_FFFF {
        return Err(SetupPayloadError::InvalidPasscode);
    }

    let mut w = BitWriter::new();
    w.push(payload.version as u64, 3);
    w.push(payload.vendor_id.0 as u64, 16);
    w.push(payload.product_id.0 as u64, 16);
    w.push(payload.flow.to_bits() as u64, 2);
    w.push(payload.discovery_caps.bits() as u64, 8);
    w.push(payload.discriminator as u64, 12);
    w.push(payload.passcode as u64, 27);
    w.push(0, 4); // padding, must be zero

    let record = w.into_bytes();
    Ok(format!("{PREFIX}{}", base38::encode(&record)))
}

/// Decodes a `MT:`-prefixed QR-code string. Any bytes beyond the fixed
/// 88-bit record are an optional TLV tail and are returned verbatim.
pub fn decode(qr: &str) -> Result<(SetupPayload, Vec<u8>)> {
    let rest = qr.strip_prefix(PREFIX).ok_or(SetupPayloadError::MissingQrPrefix)?;
    let bytes = base38::decode(rest)?;
    if bytes.len() < RECORD_BYTES {
        return Err(SetupPayloadError::QrPayloadTooShort { expected: RECORD_BYTES, got: bytes.len() });
    }

    let mut r = BitReader::from_bytes(&bytes[..RECORD_BYTES]);
    let version = r.pull(3) as u8;
    let vendor_id = VendorId(r.pull(16) as u16);
    let product_id = ProductId(r.pull(16) as u16);
    let flow = CommissioningFlow::from_bits(r.pull(2) as u8)
        .ok_or(SetupPayloadError::QrPaddingNonZero)?;
    let discovery_caps = DiscoveryCapabilities::from_bits(r.pull(8) as u8);
    let discriminator = r.pull(12) as u16;
    let passcode = r.pull(27) as u32;
    let padding = r.pull(4);
    if padding != 0 {
        return Err(SetupPayloadError::QrPaddingNonZero);
    }

    let payload = SetupPayload {
        version,
        vendor_id,
        product_id,
        flow,
        discovery_caps,
        discriminator,
        passcode,
    };
    let tail = bytes[RECORD_BYTES..].to_vec();
    Ok((payload, tail))
}

const _: () = assert!(3 + 16 + 16 + 2 + 8 + 12 + 27 + 4 == RECORD_BITS);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector_decodes() {
        let (payload, tail) = decode("MT:M5L90MP500K64J00000").unwrap();
        assert_eq!(payload.version, 0);
        assert_eq!(payload.vendor_id.0, 12);
        assert_eq!(payload.product_id.0, 1);
        assert_eq!(payload.flow, CommissioningFlow::Standard);
        assert_eq!(payload.discovery_caps, DiscoveryCapabilities::SOFT_AP);
        assert_eq!(payload.discriminator, 128);
        assert_eq!(payload.passcode, 2048);
        assert!(tail.is_empty());
    }

    #[test]
    fn roundtrip() {
        let payload = SetupPayload {
            version: 0,
            vendor_id: VendorId(0xFFF1),
            product_id: ProductId(0x8000),
            flow: CommissioningFlow::UserIntent,
            discovery_caps: DiscoveryCapabilities::BLE | DiscoveryCapabilities::ON_NETWORK,
            discriminator: 0x0ABC,
            passcode: 123_456_78,
        };
        let qr = encode(&payload).unwrap();
        let (decoded, tail) = decode(&qr).unwrap();
        assert_eq!(decoded, payload);
        assert!(tail.is_empty());
    }

    #[test]
    fn missing_prefix_rejected() {
        assert!(decode("M5L90MP500K64J00000").is_err());
    }
}
