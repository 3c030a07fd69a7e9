//! Fixed SPAKE2+ parameters for the P256-SHA256-HKDF-HMAC ciphersuite
//! (RFC 9383 §4), as mandated for PASE.

/// `M`, SEC1-uncompressed, defined by RFC 9383 for the P-256 ciphersuite.
pub const M_POINT: &str = "02886e2f97ace46e55ba9dd7242579f2993b64e16ef3dcab95afd497333d8fa12f";

/// `N`, SEC1-uncompressed, defined by RFC 9383 for the P-256 ciphersuite.
pub const N_POINT: &str = "03d8bbd6c639c62937b04d997f38c3770719c629d7014d49a24b4f98baa1292b49";

/// The fixed `Context` string PASE feeds into the SPAKE2+ transcript.
pub const PASE_CONTEXT: &[u8] = b"CHIP PAKE V1 Commissioning";

pub const CONFIRMATION_KEYS_INFO: &[u8] = b"ConfirmationKeys";

/// `w0`/`w1` are each derived from a PBKDF2 output this wide (bytes), then
/// reduced modulo the P-256 group order (RFC 9383 §3.1: `L = ceil((ceil(log2(p)) + 64) / 8)`,
/// which is 40 for P-256).
pub const W_SCALAR_MHF_LEN: usize = 40;
