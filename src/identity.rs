// Device identity: stable hardware address and the validated device metadata

use std::fmt::Write;

use crate::bounded::BoundedStr;
use crate::error::PotaError;

/// "AA:BB:CC:DD:EE:FF"
pub const DEVICE_ID_LEN: usize = 17;

pub const DEVICE_TYPE_CAPACITY: usize = 31;
pub const FIRMWARE_VERSION_CAPACITY: usize = 31;

pub type DeviceId = heapless::String<DEVICE_ID_LEN>;

/// Source of the hardware address reported as `device_id`.
pub trait DeviceIdProvider {
    fn mac_address(&self) -> [u8; 6];

    fn device_id(&self) -> DeviceId {
        format_mac(&self.mac_address())
    }
}

/// Fixed address, for boards without eFuse MAC access and for host runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedMac(pub [u8; 6]);

impl DeviceIdProvider for FixedMac {
    fn mac_address(&self) -> [u8; 6] {
        self.0
    }
}

pub fn format_mac(mac: &[u8; 6]) -> DeviceId {
    let mut id = DeviceId::new();
    for (i, byte) in mac.iter().enumerate() {
        if i > 0 {
            let _ = id.push(':');
        }
        // 17 bytes always fit
        let _ = write!(id, "{:02X}", byte);
    }
    id
}

/// Raw device metadata as supplied by the caller.
#[derive(Debug, Clone, Copy)]
pub struct DeviceMetadata<'a> {
    pub device_type: &'a str,
    pub firmware_version: &'a str,
}

/// Validated, immutable device metadata for one client lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    device_type: BoundedStr<DEVICE_TYPE_CAPACITY>,
    firmware_version: BoundedStr<FIRMWARE_VERSION_CAPACITY>,
}

impl DeviceIdentity {
    /// Checks device type first, then firmware version.
    pub fn new(metadata: DeviceMetadata<'_>) -> Result<Self, PotaError> {
        let device_type =
            BoundedStr::new(metadata.device_type).ok_or(PotaError::InvalidDeviceType)?;
        let firmware_version =
            BoundedStr::new(metadata.firmware_version).ok_or(PotaError::InvalidFirmwareVersion)?;
        Ok(Self {
            device_type,
            firmware_version,
        })
    }

    pub fn device_type(&self) -> &str {
        self.device_type.as_str()
    }

    pub fn firmware_version(&self) -> &str {
        self.firmware_version.as_str()
    }
}
