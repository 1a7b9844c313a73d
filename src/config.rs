use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ROOT_CA_PEM: &str = include_str!(concat!(env!("OUT_DIR"), "/root_ca.pem"));

/// Where and how to reach the update service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub check_path: String,
    pub protocol_version: String,

    // PEM root certificate for the service; empty means "not provisioned"
    pub trust_anchor: String,

    // Timeouts
    pub response_timeout_secs: u32,
    pub ota_timeout_secs: u32,
    pub wifi_connect_timeout_secs: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "www.pleasedontcode.com".to_string(),
            port: 443,
            check_path: "/api/v1/check_update/".to_string(),
            protocol_version: crate::version::PROTOCOL_VERSION.to_string(),
            trust_anchor: ROOT_CA_PEM.to_string(),
            response_timeout_secs: 10,
            ota_timeout_secs: 10,
            wifi_connect_timeout_secs: 30,
        }
    }
}

impl ServiceConfig {
    /// Loads an override document; absent keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ServiceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            bail!("Service host cannot be empty");
        }
        if self.port == 0 {
            bail!("Service port cannot be 0");
        }
        if !self.check_path.starts_with('/') {
            bail!("Check path must start with '/': {}", self.check_path);
        }
        if self.protocol_version.is_empty() {
            bail!("Protocol version cannot be empty");
        }
        Ok(())
    }

    /// Trusted origin for update downloads, e.g. `https://www.pleasedontcode.com`.
    pub fn origin(&self) -> String {
        if self.port == 443 {
            format!("https://{}", self.host)
        } else {
            format!("https://{}:{}", self.host, self.port)
        }
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs as u64)
    }

    pub fn ota_timeout(&self) -> Duration {
        Duration::from_secs(self.ota_timeout_secs as u64)
    }

    pub fn wifi_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.wifi_connect_timeout_secs as u64)
    }
}

/// Credentials and metadata compiled in from pota_config.h by build.rs.
/// pota_config.h should NOT be committed to git.
#[derive(Clone, Copy)]
pub struct BuildConfig {
    pub wifi_ssid: &'static str,
    pub wifi_password: &'static str,
    pub device_type: &'static str,
    pub firmware_version: &'static str,
    pub auth_token: &'static str,
    pub server_secret: &'static str,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let config = Self {
            wifi_ssid: env!("WIFI_SSID"),
            wifi_password: env!("WIFI_PASSWORD"),
            device_type: env!("POTA_DEVICE_TYPE"),
            firmware_version: env!("POTA_FIRMWARE_VERSION"),
            auth_token: env!("POTA_AUTH_TOKEN"),
            server_secret: env!("POTA_SERVER_SECRET"),
        };

        log::info!(
            "Build config: SSID='{}', device type='{}', firmware={}, token={}, secret={}",
            config.wifi_ssid,
            config.device_type,
            config.firmware_version,
            if config.auth_token.is_empty() { "<empty>" } else { "<set>" },
            if config.server_secret.is_empty() { "<empty>" } else { "<set>" }
        );

        config
    }
}

impl BuildConfig {
    pub fn metadata(&self) -> crate::identity::DeviceMetadata<'static> {
        crate::identity::DeviceMetadata {
            device_type: self.device_type,
            firmware_version: self.firmware_version,
        }
    }

    pub fn credentials(&self) -> crate::credentials::AuthCredentials<'static> {
        crate::credentials::AuthCredentials {
            auth_token: self.auth_token,
            server_secret: self.server_secret,
        }
    }
}
