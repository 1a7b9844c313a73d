//! Host tests for the full check-and-apply pipeline
//! These run on the development machine against a scripted transport

use std::collections::VecDeque;

use pota::apply::{ApplyCapability, OtaApplier};
use pota::session::CheckRequest;
use pota::token;
use pota::{
    describe, AuthCredentials, CheckOutcome, Credentials, DeviceIdentity, DeviceMetadata, FixedMac,
    PotaError, Readiness, SecureTransport, ServiceConfig, SessionState, UpdateCheckSession,
    UpdateManager, UpdateStatus, WifiLink,
};

const HOST: &str = "www.pleasedontcode.com";
const SECRET: &str = "0123456789abcdef0123456789abcdef";
const MAC: [u8; 6] = [0x24, 0x0A, 0xC4, 0x12, 0x34, 0x56];

/// Plays back one queued HTTP response per connection and records requests.
#[derive(Default)]
struct ScriptedTransport {
    responses: VecDeque<Vec<u8>>,
    current: VecDeque<u8>,
    requests: Vec<Vec<u8>>,
    trust_anchor: Option<String>,
    connects: usize,
    closes: usize,
    open: bool,
}

impl ScriptedTransport {
    fn serving(bodies: &[String]) -> Self {
        Self {
            responses: bodies.iter().map(|b| http_response(b)).collect(),
            ..Default::default()
        }
    }
}

impl SecureTransport for ScriptedTransport {
    type Error = String;

    fn set_trust_anchor(&mut self, pem: &str) -> Result<(), String> {
        self.trust_anchor = Some(pem.to_string());
        Ok(())
    }

    fn connect(&mut self, host: &str, port: u16) -> Result<(), String> {
        assert!(!self.open, "transport reused while a session is open");
        if host != HOST || port != 443 {
            return Err(format!("unexpected peer {}:{}", host, port));
        }
        let response = self.responses.pop_front().ok_or("no scripted response")?;
        self.current = response.into();
        self.requests.push(Vec::new());
        self.connects += 1;
        self.open = true;
        Ok(())
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), String> {
        assert!(self.open);
        if let Some(request) = self.requests.last_mut() {
            request.extend_from_slice(data);
        }
        Ok(())
    }

    fn poll_readable(&mut self) -> Result<Readiness, String> {
        Ok(if self.current.is_empty() { Readiness::Closed } else { Readiness::Ready })
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Result<Option<usize>, String> {
        if self.current.is_empty() {
            return Ok(None);
        }
        let mut n = 0;
        while n < buf.len() {
            match self.current.pop_front() {
                Some(b'\n') | None => break,
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
            }
        }
        Ok(Some(n))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, String> {
        // Deliver in small chunks like a real socket would
        let n = buf.len().min(self.current.len()).min(97);
        for slot in buf.iter_mut().take(n) {
            *slot = self.current.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    fn close(&mut self) {
        self.open = false;
        self.closes += 1;
    }
}

/// Records apply requests instead of flashing.
#[derive(Default)]
struct RecordingApplier {
    applied: Vec<String>,
    fail_with: Option<PotaError>,
}

impl OtaApplier for RecordingApplier {
    fn capability(&self) -> ApplyCapability {
        ApplyCapability::Streaming
    }

    fn apply(&mut self, url: &str) -> Result<(), PotaError> {
        self.applied.push(url.to_string());
        match self.fail_with {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct AlwaysUp;

impl WifiLink for AlwaysUp {
    type Error = ();

    fn begin(&mut self, _ssid: &str, _password: &str) -> Result<(), ()> {
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        true
    }

    fn local_ip(&self) -> Option<String> {
        Some("10.0.0.7".to_string())
    }
}

struct Offer<'a> {
    update: bool,
    version: &'a str,
    url: &'a str,
    checksum: &'a str,
    protocol_version: &'a str,
    notes: &'a str,
    timestamp: i64,
}

impl Default for Offer<'_> {
    fn default() -> Self {
        Self {
            update: true,
            version: "02.00.00",
            url: "https://www.pleasedontcode.com/fw/v2.bin",
            checksum: "9f86d081884c7d659a2feaa0c55ad015",
            protocol_version: "01.00",
            notes: "Bug fixes",
            timestamp: 1_717_171_717,
        }
    }
}

impl Offer<'_> {
    // Built independently of the library so the field order is checked too
    fn canonical(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}",
            if self.update { "true" } else { "false" },
            self.version,
            self.url,
            self.checksum,
            self.protocol_version,
            self.notes,
            self.timestamp
        )
    }

    fn signed(&self) -> String {
        let server_token = token::generate(self.canonical().as_bytes(), SECRET.as_bytes()).unwrap();
        self.with_token(server_token.as_str())
    }

    fn with_token(&self, server_token: &str) -> String {
        serde_json::json!({
            "update": self.update,
            "url": self.url,
            "version": self.version,
            "checksum": self.checksum,
            "protocol_version": self.protocol_version,
            "notes": self.notes,
            "server_token": server_token,
            "timestamp": self.timestamp,
        })
        .to_string()
    }
}

fn http_response(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nServer: nginx\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

fn service_config() -> ServiceConfig {
    ServiceConfig {
        trust_anchor: "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n".to_string(),
        ..ServiceConfig::default()
    }
}

fn metadata() -> DeviceMetadata<'static> {
    DeviceMetadata {
        device_type: "ESP32_DEVKIT_V1",
        firmware_version: "01.00.00",
    }
}

fn credentials() -> AuthCredentials<'static> {
    AuthCredentials {
        auth_token: "device-bearer-token",
        server_secret: SECRET,
    }
}

type Manager = UpdateManager<ScriptedTransport, RecordingApplier, FixedMac>;

fn manager_serving(bodies: &[String]) -> Manager {
    let mut manager = UpdateManager::new(service_config(), RecordingApplier::default(), FixedMac(MAC));
    manager
        .initialize(metadata(), credentials(), ScriptedTransport::serving(bodies))
        .unwrap();
    manager
}

#[test]
fn scenario_a_valid_update_is_offered() {
    let offer = Offer::default();
    let mut manager = manager_serving(&[offer.signed()]);

    let outcome = manager.check_for_update();
    assert_eq!(
        outcome.map(|o| match o {
            CheckOutcome::UpdateAvailable(url) => url.to_string(),
            CheckOutcome::NoUpdateAvailable => String::new(),
        }),
        Ok("https://www.pleasedontcode.com/fw/v2.bin".to_string())
    );
    assert_eq!(manager.last_session_state(), SessionState::Decided);
}

#[test]
fn scenario_a_check_and_apply_hands_url_to_applier() {
    let offer = Offer::default();
    let mut manager = manager_serving(&[offer.signed()]);

    let outcome = manager.check_and_apply();
    assert_eq!(outcome, Ok(UpdateStatus::Applied));
    assert_eq!(describe(&outcome), "SUCCESS");
    assert_eq!(manager.applier().applied, vec![offer.url.to_string()]);
}

#[test]
fn scenario_b_tampered_token_is_rejected() {
    let offer = Offer::default();
    let good = token::generate(offer.canonical().as_bytes(), SECRET.as_bytes()).unwrap();
    let mut tampered = good.to_string();
    let flipped = if tampered.starts_with('a') { "b" } else { "a" };
    tampered.replace_range(..1, flipped);

    let mut manager = manager_serving(&[offer.with_token(&tampered)]);
    let outcome = manager.check_and_apply();
    assert_eq!(outcome, Err(PotaError::TokenMismatch));
    assert!(manager.applier().applied.is_empty());
}

#[test]
fn tampered_field_is_rejected() {
    let offer = Offer::default();
    let signed = offer.signed();
    // Same token, different URL on the trusted host
    let forged = signed.replace("/fw/v2.bin", "/fw/evil.bin");
    let mut manager = manager_serving(&[forged]);
    assert_eq!(manager.check_and_apply(), Err(PotaError::TokenMismatch));
}

#[test]
fn scenario_c_server_error_skips_authentication() {
    let body = r#"{"error":"device not registered"}"#.to_string();
    let mut manager = manager_serving(&[body]);
    let outcome = manager.check_and_apply();
    assert_eq!(outcome, Err(PotaError::ServerError4xx));
    assert_eq!(describe(&outcome), "Server returned a 4xx error");
    assert_eq!(manager.last_session_state(), SessionState::Failed(PotaError::ServerError4xx));
}

#[test]
fn scenario_d_malformed_json() {
    let body = r#"{"update": tru, "url": "https://www.pleasedontcode.com/fw.bin"}"#.to_string();
    let mut manager = manager_serving(&[body]);
    assert_eq!(manager.check_and_apply(), Err(PotaError::JsonParseFailed));
}

#[test]
fn foreign_origin_is_never_offered() {
    for url in [
        "https://evil.example/fw/v2.bin",
        "https://www.pleasedontcode.com.evil.example/fw/v2.bin",
        "http://www.pleasedontcode.com/fw/v2.bin",
        "https://www.pleasedontcode.com\\.evil.example/fw/v2.bin",
    ] {
        let offer = Offer { url, ..Offer::default() };
        let mut manager = manager_serving(&[offer.signed()]);
        assert_eq!(manager.check_and_apply(), Ok(UpdateStatus::NoUpdateAvailable), "{}", url);
        assert!(manager.applier().applied.is_empty());
    }
}

#[test]
fn no_update_is_idempotent() {
    let offer = Offer {
        update: false,
        url: "",
        version: "",
        checksum: "",
        notes: "",
        ..Offer::default()
    };
    let mut manager = manager_serving(&[offer.signed(), offer.signed()]);

    let first = manager.check_and_apply();
    let second = manager.check_and_apply();
    assert_eq!(first, Ok(UpdateStatus::NoUpdateAvailable));
    assert_eq!(second, first);
    assert_eq!(describe(&second), "No OTA update available");
    assert!(manager.is_initialized());
}

#[test]
fn response_filling_buffer_is_overflow() {
    let offer = Offer::default();
    let signed = offer.signed();
    let padded = format!("{}{}", signed, " ".repeat(pota::session::RESPONSE_CAPACITY - signed.len()));
    assert_eq!(padded.len(), pota::session::RESPONSE_CAPACITY);

    let mut manager = manager_serving(&[padded]);
    assert_eq!(manager.check_and_apply(), Err(PotaError::BufferOverflowResponse));
}

#[test]
fn apply_failure_propagates() {
    let offer = Offer::default();
    let mut manager = UpdateManager::new(
        service_config(),
        RecordingApplier {
            fail_with: Some(PotaError::OtaFailed),
            ..Default::default()
        },
        FixedMac(MAC),
    );
    manager
        .initialize(metadata(), credentials(), ScriptedTransport::serving(&[offer.signed()]))
        .unwrap();

    let outcome = manager.check_and_apply();
    assert_eq!(outcome, Err(PotaError::OtaFailed));
    assert_eq!(describe(&outcome), "OTA process failed (generic)");
}

#[test]
fn check_requires_initialize() {
    let mut manager: Manager = UpdateManager::new(service_config(), RecordingApplier::default(), FixedMac(MAC));
    assert_eq!(manager.check_and_apply(), Err(PotaError::ClientNotInitialized));
    assert_eq!(manager.check_for_update(), Err(PotaError::ClientNotInitialized));
}

#[test]
fn initialize_reports_first_invalid_field() {
    let mut manager: Manager = UpdateManager::new(service_config(), RecordingApplier::default(), FixedMac(MAC));
    let long = "x".repeat(100);

    let cases = [
        (DeviceMetadata { device_type: "", firmware_version: "" }, credentials(), PotaError::InvalidDeviceType),
        (DeviceMetadata { device_type: &long, ..metadata() }, credentials(), PotaError::InvalidDeviceType),
        (DeviceMetadata { firmware_version: "", ..metadata() }, credentials(), PotaError::InvalidFirmwareVersion),
        (metadata(), AuthCredentials { auth_token: "", server_secret: "" }, PotaError::InvalidAuthToken),
        (metadata(), AuthCredentials { auth_token: &long, ..credentials() }, PotaError::InvalidAuthToken),
        (metadata(), AuthCredentials { server_secret: "", ..credentials() }, PotaError::InvalidSecret),
        (metadata(), AuthCredentials { server_secret: &long, ..credentials() }, PotaError::InvalidSecret),
    ];

    for (meta, creds, expected) in cases {
        assert_eq!(
            manager.initialize(meta, creds, ScriptedTransport::default()),
            Err(expected)
        );
        assert!(!manager.is_initialized());
    }
}

#[test]
fn begin_brings_up_wifi_then_initializes() {
    let offer = Offer::default();
    let mut manager: Manager = UpdateManager::new(service_config(), RecordingApplier::default(), FixedMac(MAC));

    assert_eq!(
        manager.begin(&mut AlwaysUp, "", "pw", metadata(), credentials(), ScriptedTransport::default()),
        Err(PotaError::InvalidSsid)
    );
    assert_eq!(
        manager.begin(&mut AlwaysUp, "lab", "", metadata(), credentials(), ScriptedTransport::default()),
        Err(PotaError::InvalidPassword)
    );
    assert!(!manager.is_initialized());

    manager
        .begin(
            &mut AlwaysUp,
            "lab",
            "pw",
            metadata(),
            credentials(),
            ScriptedTransport::serving(&[offer.signed()]),
        )
        .unwrap();
    assert_eq!(manager.check_and_apply(), Ok(UpdateStatus::Applied));
}

#[test]
fn device_identity_is_formatted_mac() {
    let manager: Manager = UpdateManager::new(service_config(), RecordingApplier::default(), FixedMac(MAC));
    assert_eq!(manager.device_identity().as_str(), "24:0A:C4:12:34:56");
}

#[test]
fn request_carries_device_fields() {
    let config = service_config();
    let mut transport = ScriptedTransport::serving(&[Offer::default().signed()]);
    let identity = DeviceIdentity::new(metadata()).unwrap();
    let credentials = Credentials::new(credentials()).unwrap();
    let request = CheckRequest {
        device_id: "24:0A:C4:12:34:56",
        identity: &identity,
        credentials: &credentials,
    };

    let outcome = UpdateCheckSession::new(&config, &mut transport).run(&request);
    assert!(matches!(outcome, Ok(CheckOutcome::UpdateAvailable(_))));
    assert_eq!(transport.connects, 1);
    assert_eq!(transport.closes, 1);
    assert!(!transport.open);
    assert!(transport.trust_anchor.as_deref().unwrap_or_default().contains("BEGIN CERTIFICATE"));

    let sent = String::from_utf8(transport.requests[0].clone()).unwrap();
    let (head, body) = sent.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("POST /api/v1/check_update/ HTTP/1.1\r\n"));
    assert!(head.contains("Host: www.pleasedontcode.com"));
    assert!(head.contains("Content-Type: application/json"));
    assert!(head.contains(&format!("Content-Length: {}", body.len())));
    assert!(head.contains("Connection: close"));

    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["device_id"], "24:0A:C4:12:34:56");
    assert_eq!(json["device_type"], "ESP32_DEVKIT_V1");
    assert_eq!(json["firmware_version"], "01.00.00");
    assert_eq!(json["protocol_version"], "01.00");
    assert_eq!(json["auth_token"], "device-bearer-token");
}

#[test]
fn every_check_opens_and_closes_one_connection() {
    let config = service_config();
    let offer = Offer { update: false, ..Offer::default() };
    let mut transport = ScriptedTransport::serving(&[offer.signed(), offer.with_token("00")]);
    let identity = DeviceIdentity::new(metadata()).unwrap();
    let credentials = Credentials::new(credentials()).unwrap();
    let request = CheckRequest {
        device_id: "24:0A:C4:12:34:56",
        identity: &identity,
        credentials: &credentials,
    };

    let first = UpdateCheckSession::new(&config, &mut transport).run(&request);
    let second = UpdateCheckSession::new(&config, &mut transport).run(&request);
    assert_eq!(first, Ok(CheckOutcome::NoUpdateAvailable));
    assert_eq!(second, Err(PotaError::TokenMismatch));
    assert_eq!((transport.connects, transport.closes), (2, 2));
}
