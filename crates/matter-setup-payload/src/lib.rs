//! matter-setup-payload — QR-code and manual pairing code onboarding
//! payload codecs (spec §4.4).

pub mod base38;
pub mod error;
pub mod manual;
pub mod payload;
pub mod pbkdf_params;
pub mod qr;
pub mod verhoeff;

pub use error::{Result, SetupPayloadError};
pub use payload::{CommissioningFlow, DiscoveryCapabilities, SetupPayload};
