pub mod collaborators;
pub mod commissioner;
pub mod config;
pub mod device_window;
pub mod error;
pub mod fail_safe;
pub mod messages;

pub use collaborators::{CredentialIssuer, NetworkCredentials};
pub use commissioner::{Commissioner, CommissionerState, CommissioningProgress, Discriminator, NoopProgress};
pub use config::CommissioningConfig;
pub use device_window::{
    window_context, DeviceCommandHandler, DeviceCommissioningWindow, WindowContext, WindowHandle, WindowState,
};
pub use error::{CommissioningError, Result};
pub use fail_safe::FailSafeTimer;
