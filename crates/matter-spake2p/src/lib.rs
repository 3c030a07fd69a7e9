//! SPAKE2+ (RFC 9383, P256-SHA256-HKDF-HMAC ciphersuite) as used by PASE.
//!
//! Matter's commissioner plays the "Prover" role (it holds the full passcode
//! and therefore both `w0` and `w1`); the commissionee plays "Verifier" (it
//! only ever stores `w0` and `L = w1 * G`, the value it was provisioned
//! with). Both sides otherwise run the same transcript-hash confirmation
//! dance described in RFC 9383 §3.

pub mod constants;
pub mod error;
mod reduce;

use elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use elliptic_curve::Field;
use matter_crypto::{hash::sha256, kdf::pbkdf2_sha256, mac};
use p256::{AffinePoint, EncodedPoint, ProjectivePoint, Scalar};
use rand_core::OsRng;
use zeroize::Zeroize;

pub use error::{Result, Spake2pError};

fn decode_fixed_point(hex_str: &str) -> AffinePoint {
    let bytes = decode_hex(hex_str);
    let encoded = EncodedPoint::from_bytes(bytes).expect("fixed ciphersuite constant is a valid point");
    Option::from(AffinePoint::from_encoded_point(&encoded)).expect("fixed constant is on-curve")
}

fn decode_hex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

fn m_point() -> AffinePoint {
    decode_fixed_point(constants::M_POINT)
}

fn n_point() -> AffinePoint {
    decode_fixed_point(constants::N_POINT)
}

fn len_prefixed(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u64).to_le_bytes());
    out.extend_from_slice(data);
}

fn encode_point(p: &ProjectivePoint) -> [u8; 65] {
    let encoded = p.to_affine().to_encoded_point(false);
    let mut out = [0u8; 65];
    out.copy_from_slice(encoded.as_bytes());
    out
}

fn decode_point(bytes: &[u8]) -> Result<ProjectivePoint> {
    let encoded = EncodedPoint::from_bytes(bytes).map_err(|_| Spake2pError::InvalidPeerShare)?;
    let affine: Option<AffinePoint> = AffinePoint::from_encoded_point(&encoded).into();
    affine.map(ProjectivePoint::from).ok_or(Spake2pError::InvalidPeerShare)
}

fn scalar_to_be_bytes(s: &Scalar) -> [u8; 32] {
    use elliptic_curve::ff::PrimeField;
    let repr = s.to_repr();
    let mut out = [0u8; 32];
    out.copy_from_slice(&repr);
    out
}

/// Derives `(w0, w1)` from the setup passcode (spec §4.1/§4.3 via
/// `PASE::PBKDFParamRequest/Response`): PBKDF2 produces an 80-byte string,
/// split into two 40-byte halves, each reduced modulo the P-256 order.
pub fn compute_w0_w1(passcode: u32, salt: &[u8], iterations: u32) -> Result<(Scalar, Scalar)> {
    let w0w1s = pbkdf2_sha256(&passcode.to_le_bytes(), salt, iterations, 2 * constants::W_SCALAR_MHF_LEN)?;
    let w0 = reduce::reduce_wide_mod_order(&w0w1s[..constants::W_SCALAR_MHF_LEN]);
    let w1 = reduce::reduce_wide_mod_order(&w0w1s[constants::W_SCALAR_MHF_LEN..]);
    Ok((w0, w1))
}

/// `L = w1 * G`, the value a device is provisioned with instead of `w1`
/// itself (spec §9, "device never stores the raw w1").
pub fn compute_l(w1: &Scalar) -> ProjectivePoint {
    ProjectivePoint::GENERATOR * w1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    ShareGenerated,
    SharedSecretComputed,
    Confirmed,
}

struct Transcript {
    context: Vec<u8>,
}

impl Transcript {
    fn build(
        &self,
        id_prover: &[u8],
        id_verifier: &[u8],
        share_a: &[u8; 65],
        share_b: &[u8; 65],
        z: &ProjectivePoint,
        v: &ProjectivePoint,
        w0: &Scalar,
    ) -> Vec<u8> {
        let mut tt = Vec::new();
        len_prefixed(&mut tt, &self.context);
        len_prefixed(&mut tt, id_prover);
        len_prefixed(&mut tt, id_verifier);
        len_prefixed(&mut tt, m_point().to_encoded_point(false).as_bytes());
        len_prefixed(&mut tt, n_point().to_encoded_point(false).as_bytes());
        len_prefixed(&mut tt, share_a);
        len_prefixed(&mut tt, share_b);
        len_prefixed(&mut tt, &encode_point(z));
        len_prefixed(&mut tt, &encode_point(v));
        len_prefixed(&mut tt, &scalar_to_be_bytes(w0));
        tt
    }
}

fn split_ka_ke(tt_hash: &[u8; 32]) -> ([u8; 16], [u8; 16]) {
    let mut ka = [0u8; 16];
    let mut ke = [0u8; 16];
    ka.copy_from_slice(&tt_hash[..16]);
    ke.copy_from_slice(&tt_hash[16..]);
    (ka, ke)
}

fn confirmation_keys(ka: &[u8; 16]) -> Result<([u8; 16], [u8; 16])> {
    let okm = matter_crypto::kdf::hkdf_sha256(ka, &[], constants::CONFIRMATION_KEYS_INFO, 32)?;
    let mut kc_a = [0u8; 16];
    let mut kc_b = [0u8; 16];
    kc_a.copy_from_slice(&okm[..16]);
    kc_b.copy_from_slice(&okm[16..]);
    Ok((kc_a, kc_b))
}

/// The commissioner side: holds the full passcode, so both `w0` and `w1`.
pub struct Spake2pProver {
    state: State,
    w0: Scalar,
    w1: Scalar,
    x: Option<Scalar>,
    share_a: Option<[u8; 65]>,
    share_b: Option<[u8; 65]>,
    ke: Option<[u8; 16]>,
    kc_a: Option<[u8; 16]>,
    kc_b: Option<[u8; 16]>,
    transcript: Transcript,
}

impl Spake2pProver {
    pub fn new(w0: Scalar, w1: Scalar) -> Self {
        Self {
            state: State::Init,
            w0,
            w1,
            x: None,
            share_a: None,
            share_b: None,
            ke: None,
            kc_a: None,
            kc_b: None,
            transcript: Transcript { context: constants::PASE_CONTEXT.to_vec() },
        }
    }

    /// `pA = w0*M + x*G`.
    pub fn generate_share(&mut self) -> Result<[u8; 65]> {
        if self.state != State::Init {
            return Err(Spake2pError::InvalidState("generate_share"));
        }
        let x = Scalar::random(&mut OsRng);
        let share = ProjectivePoint::from(m_point()) * self.w0 + ProjectivePoint::GENERATOR * x;
        let encoded = encode_point(&share);
        self.x = Some(x);
        self.share_a = Some(encoded);
        self.state = State::ShareGenerated;
        Ok(encoded)
    }

    /// Consumes the verifier's share `pB`, derives `Z`/`V`, and returns this
    /// side's confirmation MAC (`cA`) to send.
    pub fn process_peer_share(&mut self, peer_share: &[u8; 65]) -> Result<[u8; 32]> {
        if self.state != State::ShareGenerated {
            return Err(Spake2pError::InvalidState("process_peer_share"));
        }
        let y_point = decode_point(peer_share)?;
        let x = self.x.ok_or(Spake2pError::InvalidState("process_peer_share"))?;

        let n = ProjectivePoint::from(n_point());
        let z = (y_point - n * self.w0) * x;
        let v = (y_point - n * self.w0) * self.w1;

        let tt = self.transcript.build(
            &[],
            &[],
            self.share_a.as_ref().expect("share_a set before process_peer_share"),
            peer_share,
            &z,
            &v,
            &self.w0,
        );
        let tt_hash = sha256(&tt);
        let (ka, ke) = split_ka_ke(&tt_hash);
        let (kc_a, kc_b) = confirmation_keys(&ka)?;

        self.share_b = Some(*peer_share);
        self.ke = Some(ke);
        let mac_a = mac::hmac_sha256(&kc_a, self.share_b.as_ref().unwrap());
        self.kc_a = Some(kc_a);
        self.kc_b = Some(kc_b);
        self.state = State::SharedSecretComputed;
        Ok(mac_a)
    }

    /// Verifies the verifier's confirmation MAC `cB` and returns `Ke`, the
    /// shared secret PASE hands to the session key schedule.
    pub fn verify_peer_confirmation(&mut self, peer_mac: &[u8; 32]) -> Result<[u8; 16]> {
        if self.state != State::SharedSecretComputed {
            return Err(Spake2pError::InvalidState("verify_peer_confirmation"));
        }
        let kc_b = self.kc_b.expect("kc_b set in process_peer_share");
        let share_a = self.share_a.expect("share_a set in generate_share");
        mac::verify(&kc_b, &share_a, peer_mac).map_err(|_| Spake2pError::ConfirmationMismatch)?;
        self.state = State::Confirmed;
        Ok(self.ke.expect("ke set in process_peer_share"))
    }
}

impl Drop for Spake2pProver {
    fn drop(&mut self) {
        if let Some(x) = self.x.as_mut() {
            *x = Scalar::ZERO;
        }
        self.w0 = Scalar::ZERO;
        self.w1 = Scalar::ZERO;
        if let Some(ke) = self.ke.as_mut() {
            ke.zeroize();
        }
    }
}

/// The commissionee side: holds `w0` and `L = w1 * G`, never the raw `w1`.
pub struct Spake2pVerifier {
    state: State,
    w0: Scalar,
    l: ProjectivePoint,
    y: Option<Scalar>,
    share_a: Option<[u8; 65]>,
    share_b: Option<[u8; 65]>,
    ke: Option<[u8; 16]>,
    kc_a: Option<[u8; 16]>,
    kc_b: Option<[u8; 16]>,
    transcript: Transcript,
}

impl Spake2pVerifier {
    pub fn new(w0: Scalar, l: ProjectivePoint) -> Self {
        Self {
            state: State::Init,
            w0,
            l,
            y: None,
            share_a: None,
            share_b: None,
            ke: None,
            kc_a: None,
            kc_b: None,
            transcript: Transcript { context: constants::PASE_CONTEXT.to_vec() },
        }
    }

    /// `pB = w0*N + y*G`.
    pub fn generate_share(&mut self) -> Result<[u8; 65]> {
        if self.state != State::Init {
            return Err(Spake2pError::InvalidState("generate_share"));
        }
        let y = Scalar::random(&mut OsRng);
        let share = ProjectivePoint::from(n_point()) * self.w0 + ProjectivePoint::GENERATOR * y;
        let encoded = encode_point(&share);
        self.y = Some(y);
        self.share_b = Some(encoded);
        self.state = State::ShareGenerated;
        Ok(encoded)
    }

    /// Consumes the prover's share `pA` (sent alone, before the prover has
    /// seen `pB`) and returns this side's confirmation MAC `cB`, sent
    /// alongside `pB`. The prover's own confirmation `cA` arrives later,
    /// in a separate message, and is checked by [`verify_peer_confirmation`].
    pub fn process_peer_share(&mut self, peer_share: &[u8; 65]) -> Result<[u8; 32]> {
        if self.state != State::ShareGenerated {
            return Err(Spake2pError::InvalidState("process_peer_share"));
        }
        let x_point = decode_point(peer_share)?;
        let y = self.y.ok_or(Spake2pError::InvalidState("process_peer_share"))?;

        let m = ProjectivePoint::from(m_point());
        let z = (x_point - m * self.w0) * y;
        let v = self.l * y;

        let share_b = self.share_b.expect("share_b set before processing peer share");
        let tt = self.transcript.build(&[], &[], peer_share, &share_b, &z, &v, &self.w0);
        let tt_hash = sha256(&tt);
        let (ka, ke) = split_ka_ke(&tt_hash);
        let (kc_a, kc_b) = confirmation_keys(&ka)?;

        self.share_a = Some(*peer_share);
        self.ke = Some(ke);
        let mac_b = mac::hmac_sha256(&kc_b, peer_share);
        self.kc_a = Some(kc_a);
        self.kc_b = Some(kc_b);
        self.state = State::SharedSecretComputed;
        Ok(mac_b)
    }

    /// Verifies the prover's confirmation MAC `cA` and returns `Ke`.
    pub fn verify_peer_confirmation(&mut self, peer_mac: &[u8; 32]) -> Result<[u8; 16]> {
        if self.state != State::SharedSecretComputed {
            return Err(Spake2pError::InvalidState("verify_peer_confirmation"));
        }
        let kc_a = self.kc_a.expect("kc_a set in process_peer_share");
        let share_b = self.share_b.expect("share_b set in generate_share");
        mac::verify(&kc_a, &share_b, peer_mac).map_err(|_| Spake2pError::ConfirmationMismatch)?;
        self.state = State::Confirmed;
        Ok(self.ke.expect("ke set in process_peer_share"))
    }
}

impl Drop for Spake2pVerifier {
    fn drop(&mut self) {
        if let Some(y) = self.y.as_mut() {
            *y = Scalar::ZERO;
        }
        self.w0 = Scalar::ZERO;
        if let Some(ke) = self.ke.as_mut() {
            ke.zeroize();
        }
    }
}
