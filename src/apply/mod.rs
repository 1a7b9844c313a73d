// OTA apply mechanisms
//
// Each board class flashes firmware differently:
// 1. Streaming: one call downloads and flashes over TLS, then restart
// 2. Library-managed: a platform helper owns download, write and restart
// 3. Staged: capability check -> begin -> download -> decompress -> flash -> reset
//
// The manager only sees `OtaApplier`; the concrete variant is picked at build
// time through the apply-* cargo features.

pub mod managed;
pub mod staged;
pub mod streaming;

pub use managed::{ManagedApplier, ManagedUpdateFailure, ManagedUpdatePrimitive};
pub use staged::{StagedApplier, StagedOtaPrimitive, WIFI_FIRMWARE_MISSING};
pub use streaming::{HttpsOtaPrimitive, StreamingApplier};

use crate::error::PotaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyCapability {
    Streaming,
    LibraryManaged,
    Staged,
}

pub trait OtaApplier {
    fn capability(&self) -> ApplyCapability;

    /// Installs the firmware at `url`. On success the device restarts, so
    /// this may never return. On failure the running image is untouched.
    fn apply(&mut self, url: &str) -> Result<(), PotaError>;
}

fn require_url(url: &str) -> Result<(), PotaError> {
    if url.trim().is_empty() {
        log::error!("OTA requested without a firmware URL");
        return Err(PotaError::InvalidOtaUrl);
    }
    Ok(())
}
