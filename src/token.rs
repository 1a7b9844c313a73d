// Server token: hex(HMAC-SHA256(secret, canonical message))

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use std::fmt;

use crate::error::PotaError;

type HmacSha256 = Hmac<Sha256>;

/// Hex characters in an encoded token (32-byte digest).
pub const TOKEN_LEN: usize = 64;

/// A 64-character lowercase hex HMAC-SHA256 digest.
#[derive(Clone, PartialEq, Eq)]
pub struct Token([u8; TOKEN_LEN]);

impl Token {
    pub fn as_str(&self) -> &str {
        // Only ever filled by the hex encoder
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True when `candidate` has the exact shape of a token.
    pub fn is_well_formed(candidate: &str) -> bool {
        candidate.len() == TOKEN_LEN
            && candidate
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.as_str())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes the hex token for `message` into `out`, returning the number of
/// bytes written. `out` must hold at least [`TOKEN_LEN`] bytes.
pub fn generate_into(message: &[u8], secret: &[u8], out: &mut [u8]) -> Result<usize, PotaError> {
    if secret.is_empty() {
        return Err(PotaError::InvalidSecret);
    }
    if out.len() < TOKEN_LEN {
        return Err(PotaError::InvalidOutput);
    }

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| PotaError::InvalidSecret)?;
    mac.update(message);
    let digest = mac.finalize().into_bytes();

    hex::encode_to_slice(digest, &mut out[..TOKEN_LEN]).map_err(|_| PotaError::InvalidOutput)?;
    Ok(TOKEN_LEN)
}

/// Computes the token for `message` keyed by `secret`.
pub fn generate(message: &[u8], secret: &[u8]) -> Result<Token, PotaError> {
    let mut buf = [0u8; TOKEN_LEN];
    generate_into(message, secret, &mut buf)?;
    Ok(Token(buf))
}

/// Exact comparison of a received token against the locally computed one.
/// Any byte difference, including a length difference, is a mismatch.
pub fn verify(candidate: &str, expected: &Token) -> bool {
    candidate.as_bytes().ct_eq(expected.as_bytes()).into()
}
