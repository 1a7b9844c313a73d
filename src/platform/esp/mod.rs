// ESP-IDF implementations: TLS transport, eFuse MAC, Wi-Fi station and the
// two OTA apply mechanisms available on ESP32 parts.

pub mod identity;
pub mod ota;
pub mod tls;
pub mod wifi;

pub use identity::EfuseMac;
pub use ota::{EspHttpsOta, EspOtaHelper};
pub use tls::EspTlsTransport;
pub use wifi::WifiManager;

use crate::config::ServiceConfig;

#[cfg(feature = "apply-staged")]
compile_error!("apply-staged needs a bootloader primitive; ESP32 parts use apply-streaming or apply-managed");

#[cfg(not(feature = "apply-managed"))]
pub type PlatformApplier = crate::apply::StreamingApplier<EspHttpsOta>;

#[cfg(feature = "apply-managed")]
pub type PlatformApplier = crate::apply::ManagedApplier<EspOtaHelper>;

#[cfg(not(feature = "apply-managed"))]
pub fn platform_applier(config: &ServiceConfig) -> PlatformApplier {
    crate::apply::StreamingApplier::new(EspHttpsOta, config)
}

#[cfg(feature = "apply-managed")]
pub fn platform_applier(config: &ServiceConfig) -> PlatformApplier {
    crate::apply::ManagedApplier::new(EspOtaHelper::new(config.ota_timeout(), &config.trust_anchor))
}
