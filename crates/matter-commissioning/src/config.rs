//! Tunables for the commissioning flow (spec §4.7), constructed by the
//! embedding application. No file or CLI parsing lives here; that's a
//! Non-goal.

use std::time::Duration;

use matter_crypto::kdf::{MAX_PBKDF_ITERATIONS, MIN_PBKDF_ITERATIONS};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissioningConfig {
    pub discovery_timeout: Duration,
    pub pase_timeout: Duration,
    pub overall_timeout: Duration,
    pub fail_safe_expiry: Duration,
    pub pbkdf_iterations_min: u32,
    pub pbkdf_iterations_max: u32,
    pub open_window_timeout: Duration,
}

impl Default for CommissioningConfig {
    fn default() -> Self {
        Self {
            discovery_timeout: Duration::from_secs(30),
            pase_timeout: Duration::from_secs(30),
            overall_timeout: Duration::from_secs(5 * 60),
            fail_safe_expiry: Duration::from_secs(60),
            pbkdf_iterations_min: MIN_PBKDF_ITERATIONS,
            pbkdf_iterations_max: MAX_PBKDF_ITERATIONS,
            open_window_timeout: Duration::from_secs(15 * 60),
        }
    }
}
