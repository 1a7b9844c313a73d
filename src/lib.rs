//! POTA - secure over-the-air update client
//!
//! Checks in with the update service over TLS, authenticates the reply with
//! an HMAC-SHA256 server token and hands an accepted firmware URL to the
//! board's apply mechanism. Everything except `platform` runs on the host,
//! so the protocol can be tested without ESP32 hardware.

pub mod apply;
pub mod bounded;
pub mod config;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod logging;
pub mod manager;
pub mod origin;
pub mod platform;
pub mod protocol;
pub mod session;
pub mod token;
pub mod transport;
pub mod version;
pub mod wifi;

pub use apply::{ApplyCapability, OtaApplier};
pub use config::{BuildConfig, ServiceConfig};
pub use credentials::{AuthCredentials, Credentials};
pub use error::{describe, OperationOutcome, PotaError, UpdateStatus};
pub use identity::{DeviceId, DeviceIdProvider, DeviceIdentity, DeviceMetadata, FixedMac};
pub use manager::UpdateManager;
pub use session::{CheckOutcome, SessionState, UpdateCheckSession};
pub use transport::{Readiness, SecureTransport};
pub use wifi::WifiLink;
