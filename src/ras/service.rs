use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::error::RasctlResult;
use super::credential::EapUserData;
use super::profile::VpnProfile;

/// Opaque connection handle owned by the remote-access service.
///
/// A handle is only meaningful while the connection it names is alive; the
/// service may invalidate it at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionHandle(usize);

impl ConnectionHandle {
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Live state of a connection as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionState {
    /// Port open, authentication or projection still in progress
    Dialing,
    Connected,
    Disconnecting,
    Disconnected,
    /// Paused or otherwise unclassified service state
    Other(u32),
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Dialing => f.write_str("dialing"),
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Disconnecting => f.write_str("disconnecting"),
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Other(raw) => write!(f, "other ({:#x})", raw),
        }
    }
}

/// One entry of an enumeration snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveConnection {
    pub handle: ConnectionHandle,
    pub entry_name: String,
    pub device_name: String,
    pub phonebook: Option<PathBuf>,
}

/// Stored dial parameters for an entry
#[derive(Clone)]
pub struct DialParams {
    pub entry_name: String,
    pub user_name: String,
    pub domain: String,
    pub password: Zeroizing<String>,
    /// The service holds a saved password for this entry
    pub password_saved: bool,
}

impl DialParams {
    /// Parameters naming only the entry; the service fills in the rest
    pub fn for_entry(entry_name: &str) -> Self {
        Self {
            entry_name: entry_name.to_string(),
            user_name: String::new(),
            domain: String::new(),
            password: Zeroizing::new(String::new()),
            password_saved: false,
        }
    }
}

impl fmt::Debug for DialParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialParams")
            .field("entry_name", &self.entry_name)
            .field("user_name", &self.user_name)
            .field("domain", &self.domain)
            .field("password_saved", &self.password_saved)
            .finish()
    }
}

/// Operations the host's remote-access service provides.
///
/// Implementations wrap blocking platform calls; every method returns once
/// the service has produced its initial result. Work the service continues
/// afterwards (negotiation, teardown) is observed through `query_status`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteAccessService: Send + Sync {
    /// Write `profile` into the phone book, replacing any entry of the same name
    async fn create_or_update_entry(&self, phonebook: &Path, profile: &VpnProfile) -> RasctlResult<()>;

    /// Read an entry back from the phone book
    async fn get_entry(&self, phonebook: &Path, name: &str) -> RasctlResult<VpnProfile>;

    /// Attach EAP user data to an existing entry
    async fn store_credential(&self, phonebook: &Path, name: &str, data: &EapUserData) -> RasctlResult<()>;

    /// Fetch the dial parameters the service has stored for an entry
    async fn get_dial_params(&self, phonebook: &Path, name: &str) -> RasctlResult<DialParams>;

    /// Start dialing. `Ok(None)` means the service accepted the request but
    /// produced no handle.
    async fn dial(&self, phonebook: &Path, params: &DialParams) -> RasctlResult<Option<ConnectionHandle>>;

    /// Snapshot of every connection the service currently knows about
    async fn enumerate_connections(&self) -> RasctlResult<Vec<ActiveConnection>>;

    async fn hang_up(&self, handle: ConnectionHandle) -> RasctlResult<()>;

    async fn query_status(&self, handle: ConnectionHandle) -> RasctlResult<ConnectionState>;

    /// Human-readable text for a native error code
    fn describe_error(&self, code: u32) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connected_is_connected() {
        assert!(ConnectionState::Connected.is_connected());
        for state in [
            ConnectionState::Dialing,
            ConnectionState::Disconnecting,
            ConnectionState::Disconnected,
            ConnectionState::Other(0x1000),
        ] {
            assert!(!state.is_connected(), "{} must not count as connected", state);
        }
    }

    #[test]
    fn test_dial_params_debug_hides_password() {
        let mut params = DialParams::for_entry("corp-vpn");
        params.password = Zeroizing::new("hunter2".to_string());
        let rendered = format!("{:?}", params);
        assert!(rendered.contains("corp-vpn"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(ConnectionHandle::from_raw(255).to_string(), "0xff");
    }
}
