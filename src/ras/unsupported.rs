use async_trait::async_trait;
use std::path::Path;

use crate::error::{RasctlError, RasctlResult};
use super::credential::EapUserData;
use super::profile::VpnProfile;
use super::service::{
    ActiveConnection, ConnectionHandle, ConnectionState, DialParams, RemoteAccessService,
};

/// Stand-in for hosts without a remote-access service
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedRemoteAccess;

fn unsupported<T>(operation: &str) -> RasctlResult<T> {
    Err(RasctlError::NotSupported(format!(
        "{} requires the Windows remote access service",
        operation
    )))
}

#[async_trait]
impl RemoteAccessService for UnsupportedRemoteAccess {
    async fn create_or_update_entry(&self, _phonebook: &Path, _profile: &VpnProfile) -> RasctlResult<()> {
        unsupported("Creating a phone book entry")
    }

    async fn get_entry(&self, _phonebook: &Path, _name: &str) -> RasctlResult<VpnProfile> {
        unsupported("Reading a phone book entry")
    }

    async fn store_credential(&self, _phonebook: &Path, _name: &str, _data: &EapUserData) -> RasctlResult<()> {
        unsupported("Storing EAP user data")
    }

    async fn get_dial_params(&self, _phonebook: &Path, _name: &str) -> RasctlResult<DialParams> {
        unsupported("Reading dial parameters")
    }

    async fn dial(&self, _phonebook: &Path, _params: &DialParams) -> RasctlResult<Option<ConnectionHandle>> {
        unsupported("Dialing")
    }

    async fn enumerate_connections(&self) -> RasctlResult<Vec<ActiveConnection>> {
        unsupported("Enumerating connections")
    }

    async fn hang_up(&self, _handle: ConnectionHandle) -> RasctlResult<()> {
        unsupported("Hanging up")
    }

    async fn query_status(&self, _handle: ConnectionHandle) -> RasctlResult<ConnectionState> {
        unsupported("Querying connection status")
    }

    fn describe_error(&self, _code: u32) -> Option<String> {
        None
    }
}
