//! In-process remote-access service
//!
//! Keeps phone books and connections in memory so the lifecycle logic can be
//! exercised without a Windows host. Dials start in the dialing state and
//! only come up when `settle` is called, mirroring a service that keeps
//! negotiating after the dial request returns. Hung-up connections stay in
//! the enumeration as disconnected until `purge_disconnected`.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use zeroize::Zeroizing;

use crate::error::{RasctlError, RasctlResult};
use super::credential::{Credential, EapUserData};
use super::profile::VpnProfile;
use super::service::{
    ActiveConnection, ConnectionHandle, ConnectionState, DialParams, RemoteAccessService,
};

/// The handle is invalid
pub const ERROR_INVALID_HANDLE: u32 = 6;
/// The phone book entry does not exist
pub const ERROR_CANNOT_FIND_PHONEBOOK_ENTRY: u32 = 623;
/// Remote server rejected the credentials
pub const ERROR_AUTHENTICATION_FAILURE: u32 = 691;

/// Failures to inject into the next calls
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub entry_write: Option<u32>,
    pub credential_store: Option<u32>,
    pub enumeration: Option<u32>,
    pub dial: Option<u32>,
    /// Accept dials without returning a handle
    pub dial_without_handle: bool,
}

struct StoredEntry {
    profile: VpnProfile,
    eap_data: Option<EapUserData>,
}

struct LiveConnection {
    handle: ConnectionHandle,
    entry_name: String,
    device_name: String,
    phonebook: PathBuf,
    state: ConnectionState,
}

#[derive(Default)]
struct State {
    phonebooks: HashMap<PathBuf, BTreeMap<String, StoredEntry>>,
    connections: Vec<LiveConnection>,
    next_handle: usize,
    faults: Faults,
}

impl State {
    fn entry(&self, phonebook: &Path, name: &str) -> RasctlResult<&StoredEntry> {
        self.phonebooks
            .get(phonebook)
            .and_then(|entries| entries.get(name))
            .ok_or_else(|| missing_entry(name))
    }

    fn connection_mut(&mut self, handle: ConnectionHandle) -> RasctlResult<&mut LiveConnection> {
        self.connections
            .iter_mut()
            .find(|connection| connection.handle == handle)
            .ok_or_else(|| RasctlError::platform("Connection handle", ERROR_INVALID_HANDLE, describe(ERROR_INVALID_HANDLE)))
    }

    fn add_connection(&mut self, phonebook: &Path, name: &str, device_name: &str, state: ConnectionState) -> ConnectionHandle {
        self.next_handle += 1;
        let handle = ConnectionHandle::from_raw(0x1000 + self.next_handle);
        self.connections.push(LiveConnection {
            handle,
            entry_name: name.to_string(),
            device_name: device_name.to_string(),
            phonebook: phonebook.to_path_buf(),
            state,
        });
        handle
    }
}

fn describe(code: u32) -> Option<String> {
    let text = match code {
        ERROR_INVALID_HANDLE => "The handle is invalid.",
        ERROR_CANNOT_FIND_PHONEBOOK_ENTRY => "The system could not find the phone book entry for this connection.",
        ERROR_AUTHENTICATION_FAILURE => "The remote connection was denied because the user name and password combination you provided is not recognized.",
        _ => return None,
    };
    Some(text.to_string())
}

fn missing_entry(name: &str) -> RasctlError {
    RasctlError::platform(
        format!("Phone book entry '{}'", name),
        ERROR_CANNOT_FIND_PHONEBOOK_ENTRY,
        describe(ERROR_CANNOT_FIND_PHONEBOOK_ENTRY),
    )
}

fn injected(context: &str, code: u32) -> RasctlError {
    RasctlError::platform(context, code, describe(code))
}

#[derive(Default)]
pub struct InMemoryRemoteAccess {
    state: Mutex<State>,
}

impl InMemoryRemoteAccess {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_faults(&self, faults: Faults) {
        self.lock().faults = faults;
    }

    /// Finish negotiation for every dialing connection
    pub fn settle(&self) {
        for connection in self.lock().connections.iter_mut() {
            if connection.state == ConnectionState::Dialing {
                connection.state = ConnectionState::Connected;
            }
        }
    }

    /// Force the state of every connection for `name`, as the service does
    /// when the underlying network path drops
    pub fn set_state(&self, name: &str, state: ConnectionState) {
        for connection in self.lock().connections.iter_mut() {
            if connection.entry_name == name {
                connection.state = state;
            }
        }
    }

    /// Forget connections that finished tearing down
    pub fn purge_disconnected(&self) {
        self.lock()
            .connections
            .retain(|connection| connection.state != ConnectionState::Disconnected);
    }

    /// Add a connection the way another process dialing the same service would
    pub fn inject_connection(&self, name: &str, state: ConnectionState) -> ConnectionHandle {
        self.lock().add_connection(Path::new(""), name, "", state)
    }

    pub fn entry_names(&self, phonebook: &Path) -> Vec<String> {
        self.lock()
            .phonebooks
            .get(phonebook)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Credential stored for an entry, decoded
    pub fn stored_credential(&self, phonebook: &Path, name: &str) -> Option<Credential> {
        let state = self.lock();
        let entry = state.entry(phonebook, name).ok()?;
        entry.eap_data.as_ref().and_then(|data| data.decode().ok())
    }
}

#[async_trait]
impl RemoteAccessService for InMemoryRemoteAccess {
    async fn create_or_update_entry(&self, phonebook: &Path, profile: &VpnProfile) -> RasctlResult<()> {
        let mut state = self.lock();
        if let Some(code) = state.faults.entry_write {
            return Err(injected("Set entry properties", code));
        }

        // Overwrite replaces the whole entry, stored credentials included
        state
            .phonebooks
            .entry(phonebook.to_path_buf())
            .or_default()
            .insert(
                profile.name.clone(),
                StoredEntry {
                    profile: profile.clone(),
                    eap_data: None,
                },
            );
        Ok(())
    }

    async fn get_entry(&self, phonebook: &Path, name: &str) -> RasctlResult<VpnProfile> {
        let state = self.lock();
        Ok(state.entry(phonebook, name)?.profile.clone())
    }

    async fn store_credential(&self, phonebook: &Path, name: &str, data: &EapUserData) -> RasctlResult<()> {
        let mut state = self.lock();
        if let Some(code) = state.faults.credential_store {
            return Err(injected("Set EAP user data", code));
        }

        let entry = state
            .phonebooks
            .get_mut(phonebook)
            .and_then(|entries| entries.get_mut(name))
            .ok_or_else(|| missing_entry(name))?;
        entry.eap_data = Some(data.clone());
        Ok(())
    }

    async fn get_dial_params(&self, phonebook: &Path, name: &str) -> RasctlResult<DialParams> {
        let state = self.lock();
        let entry = state.entry(phonebook, name)?;

        let mut params = DialParams::for_entry(name);
        if let Some(credential) = entry.eap_data.as_ref().and_then(|data| data.decode().ok()) {
            params.user_name = credential.username().to_string();
            params.password = Zeroizing::new(credential.secret().to_string());
            params.password_saved = true;
        }
        Ok(params)
    }

    async fn dial(&self, phonebook: &Path, params: &DialParams) -> RasctlResult<Option<ConnectionHandle>> {
        let mut state = self.lock();
        if let Some(code) = state.faults.dial {
            return Err(injected("Dial", code));
        }

        let device_name = state.entry(phonebook, &params.entry_name)?.profile.device_name.clone();
        if state.faults.dial_without_handle {
            return Ok(None);
        }

        let handle = state.add_connection(phonebook, &params.entry_name, &device_name, ConnectionState::Dialing);
        Ok(Some(handle))
    }

    async fn enumerate_connections(&self) -> RasctlResult<Vec<ActiveConnection>> {
        let state = self.lock();
        if let Some(code) = state.faults.enumeration {
            return Err(RasctlError::QueryFailed { code });
        }

        Ok(state
            .connections
            .iter()
            .map(|connection| ActiveConnection {
                handle: connection.handle,
                entry_name: connection.entry_name.clone(),
                device_name: connection.device_name.clone(),
                phonebook: Some(connection.phonebook.clone()).filter(|path| !path.as_os_str().is_empty()),
            })
            .collect())
    }

    async fn hang_up(&self, handle: ConnectionHandle) -> RasctlResult<()> {
        let mut state = self.lock();
        state.connection_mut(handle)?.state = ConnectionState::Disconnected;
        Ok(())
    }

    async fn query_status(&self, handle: ConnectionHandle) -> RasctlResult<ConnectionState> {
        let mut state = self.lock();
        Ok(state.connection_mut(handle)?.state)
    }

    fn describe_error(&self, code: u32) -> Option<String> {
        describe(code)
    }
}
