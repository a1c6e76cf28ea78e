use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{RasctlError, RasctlResult};
use super::service::{ActiveConnection, ConnectionHandle, RemoteAccessService};

/// Resolves profile names to live connection handles
pub struct ConnectionRegistry {
    service: Arc<dyn RemoteAccessService>,
}

impl ConnectionRegistry {
    pub fn new(service: Arc<dyn RemoteAccessService>) -> Self {
        Self { service }
    }

    /// Point-in-time list of every connection the service knows about
    pub async fn snapshot(&self) -> RasctlResult<Vec<ActiveConnection>> {
        let connections = self.service.enumerate_connections().await.map_err(|e| {
            error!("Failed to enumerate connections: {}", e);
            e
        })?;
        debug!("Enumerated {} active connection(s)", connections.len());
        Ok(connections)
    }

    /// Handle of the first connection whose entry name equals `name`.
    ///
    /// The handle is borrowed from the service and stays valid only while
    /// that connection lives.
    pub async fn lookup(&self, name: &str) -> RasctlResult<ConnectionHandle> {
        let connections = self.snapshot().await?;
        find_connection(&connections, name)
            .map(|connection| connection.handle)
            .ok_or_else(|| RasctlError::NotFound(name.to_string()))
    }
}

/// Exact, case-sensitive match in enumeration order
pub fn find_connection<'a>(connections: &'a [ActiveConnection], name: &str) -> Option<&'a ActiveConnection> {
    connections.iter().find(|connection| connection.entry_name == name)
}
