//! EAP user-data packing
//!
//! The remote-access service's EAP extension consumes a fixed 256-byte blob:
//! username bytes at offset 0, a NUL separator, the secret bytes, then zero
//! padding. Inputs that do not fit are rejected, never truncated.

use std::fmt;
use zeroize::Zeroizing;

use crate::error::{RasctlError, RasctlResult};

/// Size of the packed EAP user-data buffer
pub const EAP_USER_DATA_LEN: usize = 256;

/// Username and secret pair
#[derive(Clone)]
pub struct Credential {
    username: String,
    secret: Zeroizing<String>,
}

impl Credential {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Pack into the EAP user-data layout
    pub fn encode(&self) -> RasctlResult<EapUserData> {
        EapUserData::encode(&self.username, &self.secret)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Packed EAP user data, wiped on drop
#[derive(Clone)]
pub struct EapUserData(Zeroizing<[u8; EAP_USER_DATA_LEN]>);

impl EapUserData {
    pub fn encode(username: &str, secret: &str) -> RasctlResult<Self> {
        if username.contains('\0') || secret.contains('\0') {
            return Err(RasctlError::InvalidParameter(
                "Username and secret cannot contain NUL bytes".to_string(),
            ));
        }

        let required = username.len() + 1 + secret.len();
        if required > EAP_USER_DATA_LEN {
            return Err(RasctlError::InvalidParameter(format!(
                "Credential needs {} bytes, which exceeds the {} byte EAP user-data budget",
                required, EAP_USER_DATA_LEN
            )));
        }

        let mut buffer = Zeroizing::new([0u8; EAP_USER_DATA_LEN]);
        let user_len = username.len();
        buffer[..user_len].copy_from_slice(username.as_bytes());
        // buffer[user_len] stays 0 as the separator
        buffer[user_len + 1..required].copy_from_slice(secret.as_bytes());

        Ok(Self(buffer))
    }

    /// Recover the username and secret.
    ///
    /// The secret runs from the separator to the next NUL or the end of the
    /// buffer.
    pub fn decode(&self) -> RasctlResult<Credential> {
        let bytes = &self.0[..];
        let separator = bytes.iter().position(|&b| b == 0).ok_or_else(|| {
            RasctlError::InvalidParameter("EAP user data has no username terminator".to_string())
        })?;

        let rest = &bytes[separator + 1..];
        let secret_len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());

        let username = std::str::from_utf8(&bytes[..separator]).map_err(|_| {
            RasctlError::InvalidParameter("EAP username is not valid UTF-8".to_string())
        })?;
        let secret = std::str::from_utf8(&rest[..secret_len]).map_err(|_| {
            RasctlError::InvalidParameter("EAP secret is not valid UTF-8".to_string())
        })?;

        Ok(Credential::new(username, secret))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl fmt::Debug for EapUserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EapUserData({} bytes)", EAP_USER_DATA_LEN)
    }
}
