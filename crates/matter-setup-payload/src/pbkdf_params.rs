//! Default PBKDF parameters carried alongside a setup payload when a device
//! advertises them out-of-band rather than over PBKDFParamRequest/Response
//! (spec §4.1/§4.3).

use matter_crypto::kdf::{MAX_PBKDF_ITERATIONS, MIN_PBKDF_ITERATIONS};
use rand::RngCore;

use crate::error::{Result, SetupPayloadError};

pub const DEFAULT_ITERATIONS: u32 = 1000;
pub const DEFAULT_SALT_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct PbkdfParams {
    pub iterations: u32,
    pub salt: Vec<u8>,
}

impl PbkdfParams {
    pub fn generate_default() -> Self {
        let mut salt = vec![0u8; DEFAULT_SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self { iterations: DEFAULT_ITERATIONS, salt }
    }

    pub fn validated(iterations: u32, salt: Vec<u8>) -> Result<Self> {
        if !(MIN_PBKDF_ITERATIONS..=MAX_PBKDF_ITERATIONS).contains(&iterations) {
            return Err(SetupPayloadError::InvalidPasscode);
        }
        Ok(Self { iterations, salt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_minimum_iterations_and_correct_salt_length() {
        let params = PbkdfParams::generate_default();
        assert_eq!(params.iterations, DEFAULT_ITERATIONS);
        assert_eq!(params.salt.len(), DEFAULT_SALT_LEN);
    }
}
