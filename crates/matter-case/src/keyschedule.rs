//! CASE key schedule (spec §4.6): all the HKDF derivations that turn a
//! Sigma ECDH shared secret into per-message encryption keys, resumption
//! MICs, and the final operational session keys.

use matter_crypto::{aead, hash::sha256, kdf::hkdf_sha256};

use crate::error::Result;

const SIGMA2_INFO: &[u8] = b"Sigma2";
const SIGMA3_INFO: &[u8] = b"Sigma3";
const SIGMA1_RESUME_INFO: &[u8] = b"Sigma1_Resume";
const SIGMA2_RESUME_INFO: &[u8] = b"Sigma2_Resume";
const SESSION_KEYS_INFO: &[u8] = b"SessionKeys";

pub(crate) const SIGMA2_NONCE: &[u8; 13] = b"NCASE_Sigma2N";
pub(crate) const SIGMA3_NONCE: &[u8; 13] = b"NCASE_Sigma3N";
pub(crate) const SIGMA_S1_NONCE: &[u8; 13] = b"NCASE_SigmaS1";
pub(crate) const SIGMA_S2_NONCE: &[u8; 13] = b"NCASE_SigmaS2";

fn derive16(shared_secret: &[u8; 32], salt: &[u8], info: &[u8]) -> Result<[u8; 16]> {
    let okm = hkdf_sha256(shared_secret, salt, info, 16)?;
    let mut out = [0u8; 16];
    out.copy_from_slice(&okm);
    Ok(out)
}

/// `S2K = HKDF(SharedSecret, salt = IPK ∥ ResponderRandom ∥
/// ResponderEphPubKey ∥ SHA-256(Msg1), info = "Sigma2", len = 16)`.
pub fn derive_s2k(shared_secret: &[u8; 32], ipk: &[u8; 16], responder_random: &[u8; 32], responder_eph_pub_key: &[u8; 65], sigma1: &[u8]) -> Result<[u8; 16]> {
    let mut salt = Vec::with_capacity(16 + 32 + 65 + 32);
    salt.extend_from_slice(ipk);
    salt.extend_from_slice(responder_random);
    salt.extend_from_slice(responder_eph_pub_key);
    salt.extend_from_slice(&sha256(sigma1));
    derive16(shared_secret, &salt, SIGMA2_INFO)
}

/// `S3K = HKDF(SharedSecret, salt = IPK ∥ SHA-256(Msg1 ∥ Msg2), info =
/// "Sigma3", len = 16)`.
pub fn derive_s3k(shared_secret: &[u8; 32], ipk: &[u8; 16], sigma1: &[u8], sigma2: &[u8]) -> Result<[u8; 16]> {
    let mut transcript = Vec::with_capacity(sigma1.len() + sigma2.len());
    transcript.extend_from_slice(sigma1);
    transcript.extend_from_slice(sigma2);
    let mut salt = Vec::with_capacity(16 + 32);
    salt.extend_from_slice(ipk);
    salt.extend_from_slice(&sha256(&transcript));
    derive16(shared_secret, &salt, SIGMA3_INFO)
}

/// `S1RK = HKDF(prev_shared_secret, salt = InitiatorRandom ∥
/// PrevResumptionID, info = "Sigma1_Resume", len = 16)` and
/// `Resume1MIC = AEAD-seal(S1RK, nonce = "NCASE_SigmaS1", pt = ∅, aad = ∅)[tag]`.
pub fn derive_resume1(prev_shared_secret: &[u8; 32], initiator_random: &[u8; 32], prev_resumption_id: &[u8; 16]) -> Result<([u8; 16], [u8; 16])> {
    let mut salt = Vec::with_capacity(32 + 16);
    salt.extend_from_slice(initiator_random);
    salt.extend_from_slice(prev_resumption_id);
    let s1rk = derive16(prev_shared_secret, &salt, SIGMA1_RESUME_INFO)?;
    let tag = aead::seal(&s1rk, SIGMA_S1_NONCE, &[], &[])?;
    let mut mic = [0u8; 16];
    mic.copy_from_slice(&tag);
    Ok((s1rk, mic))
}

/// `S2RK`/`Resume2MIC` mirror [`derive_resume1`] with info
/// `"Sigma2_Resume"`, nonce `"NCASE_SigmaS2"`, salted with InitiatorRandom ∥
/// NewResumptionID.
pub fn derive_resume2(prev_shared_secret: &[u8; 32], initiator_random: &[u8; 32], new_resumption_id: &[u8; 16]) -> Result<([u8; 16], [u8; 16])> {
    let mut salt = Vec::with_capacity(32 + 16);
    salt.extend_from_slice(initiator_random);
    salt.extend_from_slice(new_resumption_id);
    let s2rk = derive16(prev_shared_secret, &salt, SIGMA2_RESUME_INFO)?;
    let tag = aead::seal(&s2rk, SIGMA_S2_NONCE, &[], &[])?;
    let mut mic = [0u8; 16];
    mic.copy_from_slice(&tag);
    Ok((s2rk, mic))
}

/// Verifies a peer-supplied resume MIC without needing the plaintext: reseal
/// and compare, since `aead::open` on an empty plaintext ciphertext (the tag
/// alone) would otherwise require reconstructing a zero-length ciphertext.
pub fn verify_resume_mic(key: &[u8; 16], nonce: &[u8; 13], mic: &[u8; 16]) -> Result<()> {
    aead::open(key, nonce, mic, &[])?;
    Ok(())
}

pub struct CaseSessionKeys {
    pub i2r_key: [u8; 16],
    pub r2i_key: [u8; 16],
    pub attestation_challenge: [u8; 16],
}

/// `I2RKey ∥ R2IKey ∥ AttestationChallenge = HKDF(SharedSecret, salt = IPK ∥
/// SHA-256(transcript), info = "SessionKeys", len = 48)`. `transcript` is
/// `Msg1 ∥ Msg2 ∥ Msg3` for a full handshake or `Msg1 ∥ Sigma2_Resume` for a
/// resumed one, with `shared_secret` being the previous session's in the
/// resumption case.
pub fn derive_session_keys(shared_secret: &[u8; 32], ipk: &[u8; 16], transcript: &[u8]) -> Result<CaseSessionKeys> {
    let mut salt = Vec::with_capacity(16 + 32);
    salt.extend_from_slice(ipk);
    salt.extend_from_slice(&sha256(transcript));
    let okm = hkdf_sha256(shared_secret, &salt, SESSION_KEYS_INFO, 48)?;
    let mut i2r_key = [0u8; 16];
    let mut r2i_key = [0u8; 16];
    let mut attestation_challenge = [0u8; 16];
    i2r_key.copy_from_slice(&okm[0..16]);
    r2i_key.copy_from_slice(&okm[16..32]);
    attestation_challenge.copy_from_slice(&okm[32..48]);
    Ok(CaseSessionKeys { i2r_key, r2i_key, attestation_challenge })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_mic_roundtrips() {
        let shared = [0x11u8; 32];
        let initiator_random = [0x22u8; 32];
        let resumption_id = [0x33u8; 16];
        let (s1rk, mic) = derive_resume1(&shared, &initiator_random, &resumption_id).unwrap();
        verify_resume_mic(&s1rk, SIGMA_S1_NONCE, &mic).unwrap();
    }

    #[test]
    fn tampered_resume_mic_fails() {
        let shared = [0x11u8; 32];
        let initiator_random = [0x22u8; 32];
        let resumption_id = [0x33u8; 16];
        let (s1rk, mut mic) = derive_resume1(&shared, &initiator_random, &resumption_id).unwrap();
        mic[0] ^= 0xff;
        assert!(verify_resume_mic(&s1rk, SIGMA_S1_NONCE, &mic).is_err());
    }

    #[test]
    fn session_keys_are_deterministic() {
        let shared = [0x44u8; 32];
        let ipk = [0x55u8; 16];
        let transcript = b"msg1msg2msg3";
        let a = derive_session_keys(&shared, &ipk, transcript).unwrap();
        let b = derive_session_keys(&shared, &ipk, transcript).unwrap();
        assert_eq!(a.i2r_key, b.i2r_key);
        assert_eq!(a.r2i_key, b.r2i_key);
        assert_eq!(a.attestation_challenge, b.attestation_challenge);
    }
}
