use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::error::RasctlResult;
use super::credential::Credential;
use super::dialer::Dialer;
use super::monitor::{LinkStatus, StatusMonitor};
use super::profile::{ProfilePolicy, VpnProfile};
use super::registry::ConnectionRegistry;
use super::service::{ActiveConnection, ConnectionHandle, ConnectionState, RemoteAccessService};
use super::store::{ProfileCreated, ProfileStore};

/// RAS Manager - one entry point for the profile, dial and status
/// operations, all sharing a single remote-access service
pub struct RasManager {
    service: Arc<dyn RemoteAccessService>,
    store: ProfileStore,
    registry: ConnectionRegistry,
    dialer: Dialer,
    monitor: StatusMonitor,
}

impl RasManager {
    pub fn new(service: Arc<dyn RemoteAccessService>, policy: ProfilePolicy) -> Self {
        Self {
            store: ProfileStore::new(service.clone(), policy),
            registry: ConnectionRegistry::new(service.clone()),
            dialer: Dialer::new(service.clone()),
            monitor: StatusMonitor::new(service.clone()),
            service,
        }
    }

    pub fn policy(&self) -> &ProfilePolicy {
        self.store.policy()
    }

    pub async fn create_profile(
        &self,
        name: &str,
        server_address: &str,
        username: &str,
        secret: &str,
        phonebook: &Path,
    ) -> RasctlResult<ProfileCreated> {
        let credential = Credential::new(username, secret);
        self.store.create_profile(name, server_address, &credential, phonebook).await
    }

    pub async fn read_profile(&self, name: &str, phonebook: &Path) -> RasctlResult<VpnProfile> {
        self.store.read_profile(name, phonebook).await
    }

    pub fn delete_profile(&self) -> RasctlResult<()> {
        self.store.delete_profile()
    }

    pub async fn connect(&self, profile_name: &str, phonebook: &Path) -> RasctlResult<ConnectionHandle> {
        self.dialer.connect(profile_name, phonebook).await
    }

    pub async fn disconnect(&self, profile_name: &str) -> RasctlResult<()> {
        self.monitor.disconnect(profile_name).await
    }

    pub async fn status(&self, profile_name: &str) -> RasctlResult<LinkStatus> {
        self.monitor.status(profile_name).await
    }

    pub async fn connection_state(&self, profile_name: &str) -> RasctlResult<ConnectionState> {
        self.monitor.connection_state(profile_name).await
    }

    pub async fn wait_for_connected(
        &self,
        profile_name: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> RasctlResult<()> {
        info!("Waiting up to {:?} for '{}' to connect", timeout, profile_name);
        self.monitor.wait_for_connected(profile_name, timeout, poll_interval).await
    }

    pub async fn lookup(&self, profile_name: &str) -> RasctlResult<ConnectionHandle> {
        self.registry.lookup(profile_name).await
    }

    pub async fn active_connections(&self) -> RasctlResult<Vec<ActiveConnection>> {
        self.registry.snapshot().await
    }

    pub fn describe_error(&self, code: u32) -> Option<String> {
        self.service.describe_error(code)
    }
}
