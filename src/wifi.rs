// Link bring-up ahead of the first check-in

use std::fmt::Debug;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::PotaError;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Station-mode Wi-Fi as needed by `UpdateManager::begin`.
pub trait WifiLink {
    type Error: Debug;

    /// Configures the station and starts associating. May return before the
    /// link is up.
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), Self::Error>;

    fn is_connected(&mut self) -> bool;

    fn local_ip(&self) -> Option<String>;
}

/// Validates the credentials and waits up to `timeout` for the link.
pub fn connect<W: WifiLink>(
    wifi: &mut W,
    ssid: &str,
    password: &str,
    timeout: Duration,
) -> Result<(), PotaError> {
    if ssid.is_empty() {
        log::error!("WiFi SSID is empty! Check pota_config.h");
        return Err(PotaError::InvalidSsid);
    }
    if password.is_empty() {
        return Err(PotaError::InvalidPassword);
    }

    log::info!("Connecting to Wi-Fi: {}", ssid);
    wifi.begin(ssid, password).map_err(|e| {
        log::error!("Wi-Fi start failed: {:?}", e);
        PotaError::WifiConnectFailed
    })?;

    let start = Instant::now();
    while !wifi.is_connected() {
        if start.elapsed() >= timeout {
            log::error!("Wi-Fi not connected after {:?}", timeout);
            return Err(PotaError::WifiConnectFailed);
        }
        thread::sleep(POLL_INTERVAL);
    }

    log::info!("Wi-Fi connected, IP: {:?}", wifi.local_ip());
    Ok(())
}
