//! P-256 keygen, ECDSA, ECDH, and point encode/decode (spec §4.1).
//!
//! Matter uses raw `r ∥ s` ECDSA signatures (no ASN.1 DER framing) and
//! 65-byte uncompressed SEC1 public keys on the wire; this module is the
//! only place those conversions happen.

use ecdsa::signature::{Signer, Verifier};
use elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::{
    ecdsa::{Signature, SigningKey, VerifyingKey},
    EncodedPoint, PublicKey, SecretKey,
};
use rand_core::OsRng;

use crate::error::{CryptoError, Result};

/// 65-byte uncompressed SEC1 encoding: `0x04 ∥ X(32) ∥ Y(32)`.
pub type UncompressedPoint = [u8; 65];

pub struct KeyPair {
    pub secret: SecretKey,
    pub public: PublicKey,
}

pub fn generate_keypair() -> KeyPair {
    let secret = SecretKey::random(&mut OsRng);
    let public = secret.public_key();
    KeyPair { secret, public }
}

/// Validates that `point` decodes to a valid on-curve, non-identity P-256
/// point before any scalar multiplication touches it (spec §4.1: untrusted
/// peer points must be validated before use).
pub fn decode_public_key(point: &[u8]) -> Result<PublicKey> {
    let encoded = EncodedPoint::from_bytes(point)
        .map_err(|_| CryptoError::InvalidKey("malformed SEC1 point encoding".into()))?;
    let opt: Option<PublicKey> = PublicKey::from_encoded_point(&encoded).into();
    opt.ok_or(CryptoError::PointNotOnCurve)
}

pub fn encode_public_key_uncompressed(public: &PublicKey) -> UncompressedPoint {
    let encoded = public.to_encoded_point(false);
    let mut out = [0u8; 65];
    out.copy_from_slice(encoded.as_bytes());
    out
}

pub fn encode_public_key_compressed(public: &PublicKey) -> [u8; 33] {
    let encoded = public.to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// ECDH, returning the 32-byte X coordinate of the shared point (spec §4.1 —
/// Matter does not run the result through a KDF at this layer; callers feed
/// it directly into SPAKE2+/CASE transcript hashing).
pub fn ecdh_shared_secret(secret: &SecretKey, peer_public: &PublicKey) -> [u8; 32] {
    let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer_public.as_affine());
    let mut out = [0u8; 32];
    out.copy_from_slice(shared.raw_secret_bytes().as_slice());
    out
}

/// Sign with a raw 64-byte `r ∥ s` signature, each half zero-padded to 32
/// bytes (spec §4.1).
pub fn sign(secret: &SecretKey, message: &[u8]) -> [u8; 64] {
    let signing_key = SigningKey::from(secret);
    let signature: Signature = signing_key.sign(message);
    let mut out = [0u8; 64];
    out.copy_from_slice(&signature.to_bytes());
    out
}

pub fn verify(public: &PublicKey, message: &[u8], signature: &[u8; 64]) -> Result<()> {
    let verifying_key = VerifyingKey::from(public);
    let sig = Signature::from_slice(signature)
        .map_err(|_| CryptoError::SignatureVerification)?;
    verifying_key
        .verify(message, &sig)
        .map_err(|_| CryptoError::SignatureVerification)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let kp = generate_keypair();
        let msg = b"sigma2 tbs data";
        let sig = sign(&kp.secret, msg);
        verify(&kp.public, msg, &sig).unwrap();
    }

    #[test]
    fn verify_rejects_wrong_message() {
        let kp = generate_keypair();
        let sig = sign(&kp.secret, b"original");
        assert!(verify(&kp.public, b"tampered", &sig).is_err());
    }

    #[test]
    fn ecdh_is_symmetric() {
        let a = generate_keypair();
        let b = generate_keypair();
        let shared_a = ecdh_shared_secret(&a.secret, &b.public);
        let shared_b = ecdh_shared_secret(&b.secret, &a.public);
        assert_eq!(shared_a, shared_b);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let kp = generate_keypair();
        let encoded = encode_public_key_uncompressed(&kp.public);
        let decoded = decode_public_key(&encoded).unwrap();
        assert_eq!(decoded, kp.public);
    }

    #[test]
    fn compressed_point_decodes_to_same_key() {
        let kp = generate_keypair();
        let compressed = encode_public_key_compressed(&kp.public);
        let decoded = decode_public_key(&compressed).unwrap();
        assert_eq!(decoded, kp.public);
    }

    #[test]
    fn all_zero_point_rejected() {
        let bogus = [0u8; 65];
        assert!(decode_public_key(&bogus).is_err());
    }
}
