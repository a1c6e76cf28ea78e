//! Error types for rasctl

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasctlError {
    /// The remote-access service rejected a request
    #[error("{context} failed with RAS error {code}: {message}")]
    Platform {
        context: String,
        code: u32,
        message: String,
    },
    /// No live connection matches the profile name
    #[error("No active connection for profile '{0}'")]
    NotFound(String),
    /// Connection enumeration returned an unexpected result
    #[error("Connection query failed with code {code}")]
    QueryFailed { code: u32 },
    /// Malformed caller input (names, addresses, credentials)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Configuration file or policy error
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Dial request accepted without producing a connection
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },
    /// Not supported on this platform
    #[error("Not supported: {0}")]
    NotSupported(String),
    /// Timeout
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl RasctlError {
    /// Build a platform error, falling back to a generic message when the
    /// service has no translation for `code`.
    pub fn platform(context: impl Into<String>, code: u32, message: Option<String>) -> Self {
        RasctlError::Platform {
            context: context.into(),
            code,
            message: message.unwrap_or_else(|| "unknown error".to_string()),
        }
    }

    /// Native service code carried by this error, if any
    pub fn code(&self) -> Option<u32> {
        match self {
            RasctlError::Platform { code, .. } | RasctlError::QueryFailed { code } => Some(*code),
            _ => None,
        }
    }
}

pub type RasctlResult<T> = Result<T, RasctlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_error_message() {
        let err = RasctlError::platform("Dial", 691, Some("Access was denied".to_string()));
        assert_eq!(err.to_string(), "Dial failed with RAS error 691: Access was denied");
        assert_eq!(err.code(), Some(691));

        let err = RasctlError::platform("Hang up", 6, None);
        assert!(err.to_string().contains("unknown error"));
    }

    #[test]
    fn test_codes_only_on_service_errors() {
        assert_eq!(RasctlError::QueryFailed { code: 87 }.code(), Some(87));
        assert_eq!(RasctlError::NotFound("corp".to_string()).code(), None);
    }
}
