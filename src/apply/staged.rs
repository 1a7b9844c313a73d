use std::fmt::Debug;
use std::thread;
use std::time::Duration;

use super::{require_url, ApplyCapability, OtaApplier};
use crate::error::PotaError;

/// Download result meaning the companion Wi-Fi firmware is not installed.
pub const WIFI_FIRMWARE_MISSING: i32 = -3011;

const RESET_DELAY: Duration = Duration::from_millis(1000);

/// Bootloader-driven update: each stage is a separate call.
///
/// `download` and `decompress` return a byte count on success and zero or a
/// negative status code on failure.
pub trait StagedOtaPrimitive {
    type Error: Debug;

    fn is_ota_capable(&self) -> bool;
    fn begin(&mut self) -> Result<(), Self::Error>;
    fn download(&mut self, url: &str) -> i32;
    fn decompress(&mut self) -> i32;
    fn update(&mut self) -> Result<(), Self::Error>;
    fn reset(&mut self);
}

pub struct StagedApplier<P> {
    primitive: P,
    reset_delay: Duration,
}

impl<P: StagedOtaPrimitive> StagedApplier<P> {
    pub fn new(primitive: P) -> Self {
        Self {
            primitive,
            reset_delay: RESET_DELAY,
        }
    }

    pub fn with_reset_delay(mut self, delay: Duration) -> Self {
        self.reset_delay = delay;
        self
    }

    pub fn primitive(&self) -> &P {
        &self.primitive
    }
}

impl<P: StagedOtaPrimitive> OtaApplier for StagedApplier<P> {
    fn capability(&self) -> ApplyCapability {
        ApplyCapability::Staged
    }

    fn apply(&mut self, url: &str) -> Result<(), PotaError> {
        require_url(url)?;

        if !self.primitive.is_ota_capable() {
            log::error!("Bootloader is not OTA capable");
            return Err(PotaError::OtaNotCapable);
        }

        self.primitive.begin().map_err(|e| {
            log::error!("OTA begin failed: {:?}", e);
            PotaError::OtaBeginFailed
        })?;

        log::info!("Starting OTA firmware download...");
        let downloaded = self.primitive.download(url);
        log::info!("Download result: {}", downloaded);
        if downloaded == WIFI_FIRMWARE_MISSING {
            return Err(PotaError::OtaWifiFirmwareMissing);
        }
        if downloaded <= 0 {
            return Err(PotaError::OtaDownloadFailed);
        }

        log::info!("Decompressing OTA firmware...");
        let decompressed = self.primitive.decompress();
        log::info!("Decompression result: {}", decompressed);
        if decompressed <= 0 {
            return Err(PotaError::OtaDecompressionFailed);
        }

        log::info!("Applying OTA update...");
        self.primitive.update().map_err(|e| {
            log::error!("OTA apply failed: {:?}", e);
            PotaError::OtaApplyFailed
        })?;

        log::info!("OTA update completed. Restarting...");
        thread::sleep(self.reset_delay);
        self.primitive.reset();
        Ok(())
    }
}
