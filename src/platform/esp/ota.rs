use std::ffi::CString;
use std::time::Duration;

use anyhow::{bail, Result};
use embedded_svc::http::client::{Client, Method};
use esp_idf_svc::http::client::{Configuration as HttpConfig, EspHttpConnection};
use esp_idf_svc::io::Read;
use esp_idf_svc::ota::EspOta;
use esp_idf_svc::tls::X509;
use esp_idf_svc::sys::{
    esp, esp_http_client_config_t, esp_https_ota, esp_https_ota_config_t, esp_restart, EspError,
    ESP_ERR_INVALID_ARG,
};

use crate::apply::{HttpsOtaPrimitive, ManagedUpdateFailure, ManagedUpdatePrimitive};

/// esp_https_ota: streams the image straight into the next OTA partition.
#[derive(Debug, Clone, Copy, Default)]
pub struct EspHttpsOta;

impl HttpsOtaPrimitive for EspHttpsOta {
    type Error = EspError;

    fn download_and_flash(&mut self, url: &str, trust_anchor: &str, timeout: Duration) -> Result<(), EspError> {
        let invalid = |_| EspError::from_infallible::<ESP_ERR_INVALID_ARG>();
        let url = CString::new(url).map_err(invalid)?;
        let cert = CString::new(trust_anchor).map_err(invalid)?;

        let http_config = esp_http_client_config_t {
            url: url.as_ptr(),
            cert_pem: cert.as_ptr(),
            timeout_ms: timeout.as_millis() as _,
            ..Default::default()
        };
        let ota_config = esp_https_ota_config_t {
            http_config: &http_config,
            ..Default::default()
        };

        esp!(unsafe { esp_https_ota(&ota_config) })
    }

    fn restart(&mut self) {
        unsafe {
            esp_restart();
        }
    }
}

/// EspOta-driven helper: downloads over HTTPS, writes the partition, restarts.
pub struct EspOtaHelper {
    timeout: Duration,
    // NUL-terminated PEM; the HTTP client keeps a 'static reference to it
    ca_pem: &'static [u8],
}

impl EspOtaHelper {
    /// Downloads are pinned to `trust_anchor`, the same root the check-in used.
    /// Built once at boot; the PEM copy lives for the rest of the program.
    pub fn new(timeout: Duration, trust_anchor: &str) -> Self {
        let mut pem = Vec::with_capacity(trust_anchor.len() + 1);
        pem.extend_from_slice(trust_anchor.as_bytes());
        pem.push(0);
        Self {
            timeout,
            ca_pem: Box::leak(pem.into_boxed_slice()),
        }
    }

    fn download_and_write(&self, url: &str) -> Result<()> {
        let mut ota = EspOta::new()?;
        let mut ota_update = ota.initiate_update()?;

        let config = HttpConfig {
            buffer_size: Some(4096),
            timeout: Some(self.timeout),
            server_certificate: Some(X509::pem_until_nul(self.ca_pem)),
            ..Default::default()
        };

        let mut client = Client::wrap(EspHttpConnection::new(&config)?);
        let request = client.request(Method::Get, url, &[])?;
        let mut response = request.submit()?;

        if response.status() != 200 {
            bail!("Failed to download firmware: HTTP {}", response.status());
        }

        let mut total_bytes = 0;
        let mut buf = [0u8; 4096];
        loop {
            let bytes_read = response.read(&mut buf)?;
            if bytes_read == 0 {
                break;
            }
            ota_update.write(&buf[..bytes_read])?;
            total_bytes += bytes_read;
            if total_bytes % (64 * 1024) < bytes_read {
                log::info!("OTA progress: {} bytes", total_bytes);
            }
        }

        // Dropping an incomplete update aborts it and keeps the running image
        ota_update.complete()?;
        log::info!("OTA image written ({} bytes)", total_bytes);
        Ok(())
    }
}

impl ManagedUpdatePrimitive for EspOtaHelper {
    #[allow(unreachable_code)]
    fn update(&mut self, url: &str) -> std::result::Result<(), ManagedUpdateFailure> {
        self.download_and_write(url).map_err(|e| ManagedUpdateFailure {
            code: e
                .downcast_ref::<EspError>()
                .map(|esp| esp.code())
                .unwrap_or(-1),
            message: format!("{:#}", e),
        })?;

        std::thread::sleep(Duration::from_secs(2));
        unsafe {
            esp_restart();
        }
        Ok(())
    }
}
