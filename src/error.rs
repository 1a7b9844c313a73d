// Outcome codes for every POTA operation

use std::fmt;

/// Every way a POTA operation can fail.
///
/// Each variant maps to one fixed, human-readable description so callers can
/// log or display it without inspecting anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PotaError {
    // Parameter validation
    InvalidSsid,
    InvalidPassword,
    InvalidDeviceType,
    InvalidFirmwareVersion,
    InvalidAuthToken,
    InvalidSecret,
    InvalidOutput,
    InvalidOtaUrl,

    // Connectivity
    WifiConnectFailed,
    ClientNotInitialized,
    ConnectionFailed,
    CertificateMissing,
    ResponseTimeout,

    // Protocol
    BufferOverflowRequest,
    BufferOverflowResponse,
    JsonParseFailed,

    // Authentication
    TokenGenerationFailed,
    TokenMismatch,

    // Apply
    OtaFailed,
    OtaNotCapable,
    OtaBeginFailed,
    OtaDownloadFailed,
    OtaWifiFirmwareMissing,
    OtaDecompressionFailed,
    OtaApplyFailed,

    // Server rejected the check-in
    ServerError4xx,
}

impl PotaError {
    pub fn description(&self) -> &'static str {
        match self {
            PotaError::InvalidSsid => "Invalid SSID parameter",
            PotaError::InvalidPassword => "Invalid Wi-Fi password parameter",
            PotaError::InvalidDeviceType => "Invalid device type parameter",
            PotaError::InvalidFirmwareVersion => "Invalid firmware version parameter",
            PotaError::InvalidAuthToken => "Invalid authentication token parameter",
            PotaError::InvalidSecret => "Invalid secret key parameter",
            PotaError::InvalidOutput => "Output buffer is too small",
            PotaError::InvalidOtaUrl => "Invalid OTA URL parameter",
            PotaError::WifiConnectFailed => "Failed to connect to Wi-Fi",
            PotaError::ClientNotInitialized => "Secure client not initialized",
            PotaError::ConnectionFailed => "Could not connect to server",
            PotaError::CertificateMissing => "Root CA certificate not configured",
            PotaError::ResponseTimeout => "Server did not respond in time",
            PotaError::BufferOverflowRequest => "Buffer overflow while building JSON request",
            PotaError::BufferOverflowResponse => "Buffer overflow while reading server response",
            PotaError::JsonParseFailed => "Failed to parse JSON response",
            PotaError::TokenGenerationFailed => "Failed to generate server token",
            PotaError::TokenMismatch => "Server token did not match expected",
            PotaError::OtaFailed => "OTA process failed (generic)",
            PotaError::OtaNotCapable => "Bootloader too old or not OTA capable",
            PotaError::OtaBeginFailed => "OTA initialization failed",
            PotaError::OtaDownloadFailed => "OTA firmware download failed",
            PotaError::OtaWifiFirmwareMissing => {
                "Wi-Fi firmware not installed. Flash the Wi-Fi firmware and format the QSPI storage at least once before performing OTA."
            }
            PotaError::OtaDecompressionFailed => "OTA firmware decompression failed",
            PotaError::OtaApplyFailed => "OTA firmware application failed",
            PotaError::ServerError4xx => "Server returned a 4xx error",
        }
    }
}

impl fmt::Display for PotaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl std::error::Error for PotaError {}

/// Non-error terminal states of a check-and-apply pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Firmware was written; the device restarts (or already has).
    Applied,
    /// The server answered and nothing needs to be installed.
    NoUpdateAvailable,
}

impl UpdateStatus {
    pub fn description(&self) -> &'static str {
        match self {
            UpdateStatus::Applied => "SUCCESS",
            UpdateStatus::NoUpdateAvailable => "No OTA update available",
        }
    }
}

/// Exactly one success state or exactly one error kind.
pub type OperationOutcome = Result<UpdateStatus, PotaError>;

/// Stable human-readable text for any outcome.
pub fn describe(outcome: &OperationOutcome) -> &'static str {
    match outcome {
        Ok(status) => status.description(),
        Err(err) => err.description(),
    }
}
