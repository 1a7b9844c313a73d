use std::fmt::Debug;
use std::time::Duration;

use super::{require_url, ApplyCapability, OtaApplier};
use crate::config::ServiceConfig;
use crate::error::PotaError;

/// Download-and-flash in a single call (esp_https_ota on ESP-IDF).
pub trait HttpsOtaPrimitive {
    type Error: Debug;

    fn download_and_flash(
        &mut self,
        url: &str,
        trust_anchor: &str,
        timeout: Duration,
    ) -> Result<(), Self::Error>;

    fn restart(&mut self);
}

pub struct StreamingApplier<P> {
    primitive: P,
    trust_anchor: String,
    timeout: Duration,
}

impl<P: HttpsOtaPrimitive> StreamingApplier<P> {
    pub fn new(primitive: P, config: &ServiceConfig) -> Self {
        Self {
            primitive,
            trust_anchor: config.trust_anchor.clone(),
            timeout: config.ota_timeout(),
        }
    }

    pub fn primitive(&self) -> &P {
        &self.primitive
    }
}

impl<P: HttpsOtaPrimitive> OtaApplier for StreamingApplier<P> {
    fn capability(&self) -> ApplyCapability {
        ApplyCapability::Streaming
    }

    fn apply(&mut self, url: &str) -> Result<(), PotaError> {
        require_url(url)?;

        log::info!("Starting OTA download from {}", url);
        match self
            .primitive
            .download_and_flash(url, &self.trust_anchor, self.timeout)
        {
            Ok(()) => {
                log::info!("OTA update completed. Restarting...");
                self.primitive.restart();
                Ok(())
            }
            Err(e) => {
                log::error!("OTA failed. Error: {:?}", e);
                Err(PotaError::OtaFailed)
            }
        }
    }
}
