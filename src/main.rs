use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::prelude::*;
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};
use esp_idf_sys as _; // Binstart

use log::{error, info};

use pota::platform::esp::{platform_applier, EfuseMac, EspTlsTransport, WifiManager};
use pota::{describe, BuildConfig, ServiceConfig, UpdateManager};

// Generate ESP-IDF app descriptor
#[allow(unexpected_cfgs)]
mod app_desc {
    esp_idf_sys::esp_app_desc!();
}

// Time between check-ins when nothing was applied
const CHECK_INTERVAL_MS: u32 = 60 * 60 * 1000;

fn main() -> Result<()> {
    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();

    pota::logging::init_logger()?;
    info!("{}", pota::version::version_info());

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let build = BuildConfig::default();
    let service = ServiceConfig::default();

    let mut wifi = WifiManager::new(peripherals.modem, sys_loop, nvs)?;
    let transport = EspTlsTransport::new(&service);
    let applier = platform_applier(&service);
    let mut manager = UpdateManager::new(service, applier, EfuseMac::read()?);

    info!("Device ID: {}", manager.device_identity());

    let started = manager.begin(
        &mut wifi,
        build.wifi_ssid,
        build.wifi_password,
        build.metadata(),
        build.credentials(),
        transport,
    );
    if let Err(e) = started {
        error!("POTA begin failed: {}", e);
        return Err(e.into());
    }

    // No retry policy inside the library; the firmware checks again later
    loop {
        let outcome = manager.check_and_apply();
        match &outcome {
            Ok(_) => info!("OTA check: {}", describe(&outcome)),
            Err(_) => error!("OTA check failed: {}", describe(&outcome)),
        }
        FreeRtos::delay_ms(CHECK_INTERVAL_MS);
    }
}
