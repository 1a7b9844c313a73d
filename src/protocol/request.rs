use serde::Serialize;

use crate::bounded::BoundedWriter;
use crate::error::PotaError;

/// Largest request body that will be sent.
pub const REQUEST_CAPACITY: usize = 1024;

pub type RequestBody = heapless::Vec<u8, REQUEST_CAPACITY>;

/// Check-in document. Field order is the wire order.
#[derive(Debug, Serialize)]
pub struct CheckUpdateRequest<'a> {
    pub device_id: &'a str,
    pub device_type: &'a str,
    pub firmware_version: &'a str,
    pub protocol_version: &'a str,
    pub auth_token: &'a str,
}

impl CheckUpdateRequest<'_> {
    /// Renders the compact JSON body, failing rather than truncating when it
    /// does not fit [`REQUEST_CAPACITY`].
    pub fn render(&self) -> Result<RequestBody, PotaError> {
        let mut writer = BoundedWriter::<REQUEST_CAPACITY>::new();
        serde_json::to_writer(&mut writer, self).map_err(|e| {
            log::error!("BUFFER_OVERFLOW_REQUEST while building JSON request: {}", e);
            PotaError::BufferOverflowRequest
        })?;
        Ok(writer.into_inner())
    }
}

pub fn build_request(
    device_id: &str,
    device_type: &str,
    firmware_version: &str,
    protocol_version: &str,
    auth_token: &str,
) -> Result<RequestBody, PotaError> {
    CheckUpdateRequest {
        device_id,
        device_type,
        firmware_version,
        protocol_version,
        auth_token,
    }
    .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_body_in_wire_order() {
        let body = build_request("AA:BB:CC:DD:EE:FF", "ESP32_DEVKIT_V1", "01.00.00", "01.00", "tok").unwrap();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            r#"{"device_id":"AA:BB:CC:DD:EE:FF","device_type":"ESP32_DEVKIT_V1","firmware_version":"01.00.00","protocol_version":"01.00","auth_token":"tok"}"#
        );
    }

    #[test]
    fn test_values_are_escaped() {
        let body = build_request("id", "board\"x", "1", "01.00", "t").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["device_type"], "board\"x");
    }

    #[test]
    fn test_oversized_body_overflows() {
        let token = "x".repeat(REQUEST_CAPACITY);
        assert_eq!(
            build_request("id", "type", "1", "01.00", &token),
            Err(PotaError::BufferOverflowRequest)
        );
    }
}
