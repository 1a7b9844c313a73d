// Centralized version information

// Check-in protocol revision sent as protocol_version
pub const PROTOCOL_VERSION: &str = "01.00";

// Cargo package version from Cargo.toml
pub const CARGO_VERSION: &str = env!("CARGO_PKG_VERSION");

// Version info string for logging
pub fn version_info() -> String {
    format!("POTA client {} (protocol {})", CARGO_VERSION, PROTOCOL_VERSION)
}
