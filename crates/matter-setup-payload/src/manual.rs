//! Manual pairing code (spec §4.4): 11 digits (10 data + Verhoeff check), or
//! 21 digits when the vendor/product ID are appended.
//!
//! Chunk layout (decimal digit groups, most significant group first):
//!   chunk1 (1 digit)  = vid_pid_present_flag*4 + high 2 bits of the
//!                       4-bit short discriminator
//!   chunk2 (5 digits) = (low 2 bits of short discriminator << 14) | (passcode & 0x3FFF)
//!   chunk3 (4 digits) = passcode >> 14
//!   chunk4 (5 digits) = vendor_id        (only when vid_pid_present)
//!   chunk5 (5 digits) = product_id       (only when vid_pid_present)
//! A Verhoeff check digit follows the last chunk.

use matter_core_types::ids::{ProductId, VendorId};

use crate::error::{Result, SetupPayloadError};
use crate::payload::{CommissioningFlow, DiscoveryCapabilities, SetupPayload};
use crate::verhoeff;

const SHORT_DATA_DIGITS: usize = 10;
const LONG_DATA_DIGITS: usize = 20;

pub fn encode(payload: &SetupPayload, vid_pid_present: bool) -> Result<String> {
    if payload.passcode == 0 || payload.passcode > 0x07FF_FFFF {
        return Err(SetupPayloadError::InvalidPasscode);
    }
    let short_disc = payload.short_discriminator() & 0x0F;
    let high2 = (short_disc >> 2) & 0x3;
    let low2 = short_disc & 0x3;

    let chunk1 = (vid_pid_present as u8) * 4 + high2;
    let chunk2 = ((low2 as u32) << 14) | (payload.passcode & 0x3FFF);
    let chunk3 = payload.passcode >> 14;

    let mut digits = format!("{:01}{:05}{:04}", chunk1, chunk2, chunk3);
    if vid_pid_present {
        digits.push_str(&format!("{:05}{:05}", payload.vendor_id.0, payload.product_id.0));
    }
    let check = verhoeff::compute(&digits).expect("digits is all ASCII digits by construction");
    digits.push(check);
    Ok(digits)
}

pub fn decode(code: &str) -> Result<SetupPayload> {
    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(SetupPayloadError::ManualCodeNotDigits);
    }
    let len = code.len();
    if len != SHORT_DATA_DIGITS + 1 && len != LONG_DATA_DIGITS + 1 {
        return Err(SetupPayloadError::InvalidManualCodeLength(len));
    }
    if !verhoeff::validate(code) {
        return Err(SetupPayloadError::ManualCodeCheckDigitMismatch);
    }

    let data = &code[..len - 1];
    let chunk1: u8 = data[0..1].parse().unwrap();
    if chunk1 >= 8 {
        return Err(SetupPayloadError::ReservedChunk1Value(chunk1));
    }
    let vid_pid_present = chunk1 / 4 == 1;
    let high2 = chunk1 % 4;

    let chunk2: u32 = data[1..6].parse().unwrap();
    let chunk3: u32 = data[6..10].parse().unwrap();
    if chunk2 > 0xFFFF || chunk3 > 0x1FFF {
        return Err(SetupPayloadError::InvalidPasscode);
    }
    let low2 = (chunk2 >> 14) as u8;
    let passcode_low14 = chunk2 & 0x3FFF;
    let passcode = (chunk3 << 14) | passcode_low14;
    if passcode == 0 {
        return Err(SetupPayloadError::InvalidPasscode);
    }

    let short_disc = (high2 << 2) | low2;

    let expected_len = if vid_pid_present { LONG_DATA_DIGITS + 1 } else { SHORT_DATA_DIGITS + 1 };
    if len != expected_len {
        return Err(SetupPayloadError::InvalidManualCodeLength(len));
    }

    let (vendor_id, product_id, flow) = if vid_pid_present {
        let vendor_id: u16 = data[10..15].parse().unwrap();
        let product_id: u16 = data[15..20].parse().unwrap();
        (VendorId(vendor_id), ProductId(product_id), CommissioningFlow::Custom)
    } else {
        (VendorId(0), ProductId(0), CommissioningFlow::Standard)
    };

    Ok(SetupPayload {
        version: 0,
        vendor_id,
        product_id,
        flow,
        discovery_caps: DiscoveryCapabilities::default(),
        discriminator: (short_disc as u16) << 8,
        passcode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_code_known_vector() {
        let payload = decode("24129507533").unwrap();
        assert_eq!(payload.passcode, 12345679);
        assert_eq!(payload.short_discriminator(), 0xA);
        assert_eq!(payload.flow, CommissioningFlow::Standard);
    }

    #[test]
    fn long_code_known_vector() {
        let payload = decode("641295075345367145262").unwrap();
        assert_eq!(payload.passcode, 12345679);
        assert_eq!(payload.vendor_id.0, 45367);
        assert_eq!(payload.product_id.0, 14526);
        assert_eq!(payload.flow, CommissioningFlow::Custom);
    }

    #[test]
    fn reserved_chunk1_value_rejected() {
        assert!(decode("84129507534").is_err());
    }

    #[test]
    fn chunk2_out_of_range_rejected() {
        // chunk2 = 70000 > 0xFFFF, correctly Verhoeff-checksummed otherwise.
        assert!(decode("07000000009").is_err());
    }

    #[test]
    fn roundtrip_short_code() {
        let payload = SetupPayload {
            version: 0,
            vendor_id: VendorId(0),
            product_id: ProductId(0),
            flow: CommissioningFlow::Standard,
            discovery_caps: DiscoveryCapabilities::default(),
            discriminator: 0x0A00,
            passcode: 12345679,
        };
        let code = encode(&payload, false).unwrap();
        let decoded = decode(&code).unwrap();
        assert_eq!(decoded.passcode, payload.passcode);
        assert_eq!(decoded.short_discriminator(), payload.short_discriminator());
    }
}
