// One authenticated check-in round trip over a borrowed transport

use std::fmt::{Debug, Write};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ServiceConfig;
use crate::credentials::Credentials;
use crate::error::PotaError;
use crate::identity::DeviceIdentity;
use crate::origin;
use crate::protocol::{self, CheckUpdateRequest};
use crate::transport::{ConnectionGuard, Readiness, SecureTransport};

/// Response body buffer. A body that fills it completely is rejected.
pub const RESPONSE_CAPACITY: usize = 1024;

/// Header lines longer than this are scanned in fragments.
pub const HEADER_LINE_CAPACITY: usize = 128;

/// Longest update URL handed to the applier.
pub const URL_CAPACITY: usize = 255;

const REQUEST_HEAD_CAPACITY: usize = 256;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub type OtaUrl = heapless::String<URL_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Sending,
    AwaitingHeaders,
    ReadingBody,
    Parsing,
    Authenticating,
    Decided,
    Failed(PotaError),
}

/// Terminal decision of a successful check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    UpdateAvailable(OtaUrl),
    NoUpdateAvailable,
}

/// Everything the request needs to identify and authenticate the device.
#[derive(Debug, Clone, Copy)]
pub struct CheckRequest<'a> {
    pub device_id: &'a str,
    pub identity: &'a DeviceIdentity,
    pub credentials: &'a Credentials,
}

struct Deadline {
    start: Instant,
    limit: Duration,
}

impl Deadline {
    fn new(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    fn check(&self) -> Result<(), PotaError> {
        if self.start.elapsed() > self.limit {
            log::error!("No complete response within {:?}", self.limit);
            return Err(PotaError::ResponseTimeout);
        }
        Ok(())
    }
}

fn link_error<E: Debug>(phase: &'static str) -> impl FnOnce(E) -> PotaError {
    move |e| {
        log::error!("Transport error while {}: {:?}", phase, e);
        PotaError::ConnectionFailed
    }
}

pub struct UpdateCheckSession<'a, T: SecureTransport> {
    config: &'a ServiceConfig,
    transport: &'a mut T,
    state: SessionState,
}

impl<'a, T: SecureTransport> UpdateCheckSession<'a, T> {
    pub fn new(config: &'a ServiceConfig, transport: &'a mut T) -> Self {
        Self {
            config,
            transport,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Connects, sends the check-in, reads and authenticates the decision.
    /// The transport is closed before this returns, whatever the outcome.
    pub fn run(&mut self, request: &CheckRequest<'_>) -> Result<CheckOutcome, PotaError> {
        let mut body = [0u8; RESPONSE_CAPACITY];
        let outcome = self
            .exchange(request, &mut body)
            .and_then(|len| self.decide(&body[..len], request.credentials));

        self.state = match &outcome {
            Ok(_) => SessionState::Decided,
            Err(e) => SessionState::Failed(*e),
        };
        outcome
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!("Update check: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn exchange(&mut self, request: &CheckRequest<'_>, body: &mut [u8]) -> Result<usize, PotaError> {
        let config = self.config;
        if config.trust_anchor.trim().is_empty() {
            log::error!("No root CA configured for {}", config.host);
            return Err(PotaError::CertificateMissing);
        }

        self.transition(SessionState::Connecting);
        if let Err(e) = self.transport.set_trust_anchor(&config.trust_anchor) {
            log::error!("Installing trust anchor failed: {:?}", e);
            self.transport.close();
            return Err(PotaError::ConnectionFailed);
        }
        if let Err(e) = self.transport.connect(&config.host, config.port) {
            log::error!("Connection to {}:{} failed: {:?}", config.host, config.port, e);
            self.transport.close();
            return Err(PotaError::ConnectionFailed);
        }
        log::info!("Connected to server {}:{}", config.host, config.port);

        self.transition(SessionState::Sending);
        let mut conn = ConnectionGuard::new(&mut *self.transport);

        let payload = CheckUpdateRequest {
            device_id: request.device_id,
            device_type: request.identity.device_type(),
            firmware_version: request.identity.firmware_version(),
            protocol_version: &config.protocol_version,
            auth_token: request.credentials.auth_token(),
        }
        .render()?;

        let mut head = heapless::String::<REQUEST_HEAD_CAPACITY>::new();
        write!(
            head,
            "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            config.check_path,
            config.host,
            payload.len()
        )
        .map_err(|_| {
            log::error!("BUFFER_OVERFLOW_REQUEST while building request head");
            PotaError::BufferOverflowRequest
        })?;

        conn.write_all(head.as_bytes()).map_err(link_error("sending request head"))?;
        conn.write_all(&payload).map_err(link_error("sending request body"))?;

        let deadline = Deadline::new(config.response_timeout());
        self.state = SessionState::AwaitingHeaders;
        wait_for_response(&mut *conn, &deadline)?;
        skip_headers(&mut *conn, &deadline)?;

        self.state = SessionState::ReadingBody;
        let len = read_body(&mut *conn, body, &deadline)?;
        drop(conn);
        Ok(len)
    }

    fn decide(&mut self, body: &[u8], credentials: &Credentials) -> Result<CheckOutcome, PotaError> {
        self.transition(SessionState::Parsing);
        let decision = protocol::parse(body)?;

        self.transition(SessionState::Authenticating);
        decision.authenticate(credentials.server_secret())?;

        if !decision.update {
            log::info!("No OTA update available");
            return Ok(CheckOutcome::NoUpdateAvailable);
        }

        let Some(trusted) = origin::trusted_url(&decision.url, &self.config.host, self.config.port) else {
            log::warn!(
                "Ignoring update URL outside {}: {:?}",
                self.config.origin(),
                decision.url
            );
            return Ok(CheckOutcome::NoUpdateAvailable);
        };

        // Forward what was checked, not the raw string
        let url = OtaUrl::try_from(trusted.as_str()).map_err(|_| {
            log::error!("Update URL exceeds {} bytes", URL_CAPACITY);
            PotaError::InvalidOtaUrl
        })?;

        log::info!("New firmware version available: {}", decision.version);
        log::info!("Notes: {}", decision.notes);
        Ok(CheckOutcome::UpdateAvailable(url))
    }
}

fn wait_for_response<T: SecureTransport>(conn: &mut T, deadline: &Deadline) -> Result<(), PotaError> {
    loop {
        match conn.poll_readable().map_err(link_error("waiting for response"))? {
            // A drop before any byte leaves an empty body, which fails to parse
            Readiness::Ready | Readiness::Closed => return Ok(()),
            Readiness::Pending => {
                deadline.check()?;
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

fn skip_headers<T: SecureTransport>(conn: &mut T, deadline: &Deadline) -> Result<(), PotaError> {
    let mut line = [0u8; HEADER_LINE_CAPACITY];
    let mut continuation = false;

    loop {
        deadline.check()?;
        let Some(len) = conn.read_line(&mut line).map_err(link_error("reading headers"))? else {
            return Ok(());
        };

        if len == line.len() {
            // Oversized line: keep scanning its remainder, it cannot be the terminator
            if !continuation {
                log::warn!("Header line longer than {} bytes, truncated", HEADER_LINE_CAPACITY);
            }
            continuation = true;
            continue;
        }

        let fragment = &line[..len];
        if !continuation && (fragment.is_empty() || fragment == b"\r") {
            return Ok(());
        }
        continuation = false;
    }
}

fn read_body<T: SecureTransport>(
    conn: &mut T,
    body: &mut [u8],
    deadline: &Deadline,
) -> Result<usize, PotaError> {
    let mut filled = 0;
    loop {
        if filled == body.len() {
            log::error!("BUFFER_OVERFLOW_RESPONSE while reading server response");
            return Err(PotaError::BufferOverflowResponse);
        }
        let n = conn.read(&mut body[filled..]).map_err(link_error("reading body"))?;
        if n == 0 {
            return Ok(filled);
        }
        filled += n;
        deadline.check()?;
    }
}
