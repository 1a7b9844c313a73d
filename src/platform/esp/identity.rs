use esp_idf_svc::sys::{esp, esp_efuse_mac_get_default, EspError};

use crate::identity::DeviceIdProvider;

/// Factory-programmed base MAC from eFuse; stable across reflashes.
///
/// Read once at boot. A failed read stops start-up instead of reporting a
/// placeholder address every broken board would share.
#[derive(Debug, Clone, Copy)]
pub struct EfuseMac([u8; 6]);

impl EfuseMac {
    pub fn read() -> Result<Self, EspError> {
        let mut mac = [0u8; 6];
        esp!(unsafe { esp_efuse_mac_get_default(mac.as_mut_ptr()) }).inspect_err(|e| {
            log::error!("Failed to read eFuse MAC: {}", e);
        })?;
        Ok(Self(mac))
    }
}

impl DeviceIdProvider for EfuseMac {
    fn mac_address(&self) -> [u8; 6] {
        self.0
    }
}
