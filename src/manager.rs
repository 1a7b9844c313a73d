// Public entry point: check in with the update service and apply what it offers

use crate::apply::OtaApplier;
use crate::config::ServiceConfig;
use crate::credentials::{AuthCredentials, Credentials};
use crate::error::{OperationOutcome, PotaError, UpdateStatus};
use crate::identity::{DeviceId, DeviceIdProvider, DeviceIdentity, DeviceMetadata};
use crate::session::{CheckOutcome, CheckRequest, SessionState, UpdateCheckSession};
use crate::transport::SecureTransport;
use crate::wifi::{self, WifiLink};

// State bound by a successful initialize()
struct BoundClient<T> {
    transport: T,
    identity: DeviceIdentity,
    credentials: Credentials,
}

/// Owns configuration, credentials and the transport handle.
///
/// Not re-entrant: one check runs at a time on the caller's thread, and the
/// transport is used by nothing else while it runs.
pub struct UpdateManager<T, A, P> {
    config: ServiceConfig,
    applier: A,
    device_ids: P,
    client: Option<BoundClient<T>>,
    last_session_state: SessionState,
}

impl<T, A, P> UpdateManager<T, A, P>
where
    T: SecureTransport,
    A: OtaApplier,
    P: DeviceIdProvider,
{
    pub fn new(config: ServiceConfig, applier: A, device_ids: P) -> Self {
        Self {
            config,
            applier,
            device_ids,
            client: None,
            last_session_state: SessionState::Idle,
        }
    }

    /// Brings Wi-Fi up (bounded by the configured connect timeout), then
    /// runs [`initialize`](Self::initialize).
    pub fn begin<W: WifiLink>(
        &mut self,
        wifi: &mut W,
        ssid: &str,
        password: &str,
        metadata: DeviceMetadata<'_>,
        credentials: AuthCredentials<'_>,
        transport: T,
    ) -> Result<(), PotaError> {
        wifi::connect(wifi, ssid, password, self.config.wifi_connect_timeout())?;
        self.initialize(metadata, credentials, transport)
    }

    /// Validates device type, firmware version, auth token and secret in
    /// that order and binds the transport. Nothing is stored on failure.
    pub fn initialize(
        &mut self,
        metadata: DeviceMetadata<'_>,
        credentials: AuthCredentials<'_>,
        transport: T,
    ) -> Result<(), PotaError> {
        let identity = DeviceIdentity::new(metadata)?;
        let credentials = Credentials::new(credentials)?;

        log::info!(
            "POTA initialized: device type '{}', firmware {}",
            identity.device_type(),
            identity.firmware_version()
        );

        self.client = Some(BoundClient {
            transport,
            identity,
            credentials,
        });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.client.is_some()
    }

    /// Runs one authenticated check-in without applying anything.
    pub fn check_for_update(&mut self) -> Result<CheckOutcome, PotaError> {
        let client = self.client.as_mut().ok_or(PotaError::ClientNotInitialized)?;
        let device_id = self.device_ids.device_id();

        let request = CheckRequest {
            device_id: &device_id,
            identity: &client.identity,
            credentials: &client.credentials,
        };
        let mut session = UpdateCheckSession::new(&self.config, &mut client.transport);
        let outcome = session.run(&request);
        self.last_session_state = session.state();
        outcome
    }

    /// Checks in and, when an authenticated same-origin update is offered,
    /// applies it straight away.
    pub fn check_and_apply(&mut self) -> OperationOutcome {
        match self.check_for_update()? {
            CheckOutcome::UpdateAvailable(url) => {
                self.applier.apply(&url)?;
                Ok(UpdateStatus::Applied)
            }
            CheckOutcome::NoUpdateAvailable => Ok(UpdateStatus::NoUpdateAvailable),
        }
    }

    /// Hardware address reported as `device_id`.
    pub fn device_identity(&self) -> DeviceId {
        self.device_ids.device_id()
    }

    pub fn describe(outcome: &OperationOutcome) -> &'static str {
        crate::error::describe(outcome)
    }

    pub fn last_session_state(&self) -> SessionState {
        self.last_session_state
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn applier(&self) -> &A {
        &self.applier
    }
}
