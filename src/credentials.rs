// Authentication material. Never logged: Debug output is redacted.

use std::fmt;

use crate::bounded::BoundedStr;
use crate::error::PotaError;

pub const AUTH_TOKEN_CAPACITY: usize = 63;
pub const SERVER_SECRET_CAPACITY: usize = 64;

/// Raw credentials as supplied by the caller.
#[derive(Clone, Copy)]
pub struct AuthCredentials<'a> {
    pub auth_token: &'a str,
    pub server_secret: &'a str,
}

impl fmt::Debug for AuthCredentials<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthCredentials { .. }")
    }
}

/// Bearer token sent with each check-in plus the HMAC key that signs replies.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    auth_token: BoundedStr<AUTH_TOKEN_CAPACITY>,
    server_secret: BoundedStr<SERVER_SECRET_CAPACITY>,
}

impl Credentials {
    /// Checks the auth token first, then the secret.
    pub fn new(raw: AuthCredentials<'_>) -> Result<Self, PotaError> {
        let auth_token = BoundedStr::new(raw.auth_token).ok_or(PotaError::InvalidAuthToken)?;
        let server_secret = BoundedStr::new(raw.server_secret).ok_or(PotaError::InvalidSecret)?;
        Ok(Self {
            auth_token,
            server_secret,
        })
    }

    pub fn auth_token(&self) -> &str {
        self.auth_token.as_str()
    }

    pub fn server_secret(&self) -> &str {
        self.server_secret.as_str()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_token", &"<redacted>")
            .field("server_secret", &"<redacted>")
            .finish()
    }
}
