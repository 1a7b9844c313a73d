use std::borrow::Cow;
use std::fmt::Write;

use serde::Deserialize;

use crate::error::PotaError;
use crate::token::{self, Token};

/// Room for the signed `update:version:...:timestamp` string.
pub const CANONICAL_CAPACITY: usize = 512;

pub type CanonicalMessage = heapless::String<CANONICAL_CAPACITY>;

// Every field is optional on the wire; null and absent both mean "default".
#[derive(Deserialize)]
struct RawResponse<'a> {
    update: Option<bool>,
    #[serde(borrow)]
    url: Option<Cow<'a, str>>,
    #[serde(borrow)]
    version: Option<Cow<'a, str>>,
    #[serde(borrow)]
    checksum: Option<Cow<'a, str>>,
    #[serde(borrow)]
    protocol_version: Option<Cow<'a, str>>,
    #[serde(borrow)]
    notes: Option<Cow<'a, str>>,
    #[serde(borrow)]
    server_token: Option<Cow<'a, str>>,
    timestamp: Option<i64>,
    #[serde(borrow)]
    error: Option<Cow<'a, str>>,
}

/// The server's decision for one check-in, borrowed from the response body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDecision<'a> {
    pub update: bool,
    pub version: Cow<'a, str>,
    pub url: Cow<'a, str>,
    pub checksum: Cow<'a, str>,
    pub protocol_version: Cow<'a, str>,
    pub notes: Cow<'a, str>,
    pub timestamp: i64,
    pub server_token: Cow<'a, str>,
    pub error_message: Option<Cow<'a, str>>,
}

impl<'a> From<RawResponse<'a>> for UpdateDecision<'a> {
    fn from(raw: RawResponse<'a>) -> Self {
        Self {
            update: raw.update.unwrap_or(false),
            version: raw.version.unwrap_or_default(),
            url: raw.url.unwrap_or_default(),
            checksum: raw.checksum.unwrap_or_default(),
            protocol_version: raw.protocol_version.unwrap_or_default(),
            notes: raw.notes.unwrap_or_default(),
            timestamp: raw.timestamp.unwrap_or(0),
            server_token: raw.server_token.unwrap_or_default(),
            error_message: raw.error.filter(|e| !e.is_empty()),
        }
    }
}

impl UpdateDecision<'_> {
    /// The exact byte sequence the server signs.
    pub fn canonical_message(&self) -> Result<CanonicalMessage, PotaError> {
        let mut message = CanonicalMessage::new();
        write!(
            message,
            "{}:{}:{}:{}:{}:{}:{}",
            self.update,
            self.version,
            self.url,
            self.checksum,
            self.protocol_version,
            self.notes,
            self.timestamp
        )
        .map_err(|_| {
            log::error!("Canonical message exceeds {} bytes", CANONICAL_CAPACITY);
            PotaError::TokenGenerationFailed
        })?;
        Ok(message)
    }

    /// Token this decision must carry when signed with `secret`.
    pub fn expected_token(&self, secret: &str) -> Result<Token, PotaError> {
        let message = self.canonical_message()?;
        token::generate(message.as_bytes(), secret.as_bytes())
    }

    /// Checks `server_token` against the token recomputed with `secret`.
    pub fn authenticate(&self, secret: &str) -> Result<(), PotaError> {
        let expected = self.expected_token(secret)?;
        if token::verify(&self.server_token, &expected) {
            Ok(())
        } else {
            log::error!("Server token mismatch, discarding decision");
            Err(PotaError::TokenMismatch)
        }
    }
}

/// Decodes a response body.
///
/// A non-empty `error` field ends the exchange with `ServerError4xx` here,
/// so an error reply never reaches token verification.
pub fn parse(raw: &[u8]) -> Result<UpdateDecision<'_>, PotaError> {
    let decoded: RawResponse<'_> = serde_json::from_slice(raw).map_err(|e| {
        log::error!("JSON parse failed: {}", e);
        PotaError::JsonParseFailed
    })?;
    let decision = UpdateDecision::from(decoded);

    if let Some(message) = &decision.error_message {
        log::error!("Server error message: {}", message);
        return Err(PotaError::ServerError4xx);
    }

    Ok(decision)
}
