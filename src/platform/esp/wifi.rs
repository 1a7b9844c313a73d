use anyhow::Result;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

use crate::wifi::WifiLink;

pub struct WifiManager {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl WifiManager {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self> {
        let esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))?;
        let wifi = BlockingWifi::wrap(esp_wifi, sys_loop)?;
        log::info!("WiFi manager initialized successfully");
        Ok(Self { wifi })
    }

    fn configure(&mut self, ssid: &str, password: &str) -> Result<()> {
        let cfg = Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| anyhow::anyhow!("Invalid SSID format: {}", ssid))?,
            password: password
                .try_into()
                .map_err(|_| anyhow::anyhow!("Invalid password format"))?,
            auth_method: AuthMethod::WPA2Personal,
            ..Default::default()
        });

        log::info!("Setting WiFi configuration...");
        self.wifi.set_configuration(&cfg)?;
        self.wifi.start()?;

        log::info!("Connecting to {}...", ssid);
        self.wifi.connect()?;
        Ok(())
    }
}

impl WifiLink for WifiManager {
    type Error = anyhow::Error;

    fn begin(&mut self, ssid: &str, password: &str) -> Result<()> {
        self.configure(ssid, password)
    }

    fn is_connected(&mut self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn local_ip(&self) -> Option<String> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|ip_info| format!("{}", ip_info.ip))
    }
}
