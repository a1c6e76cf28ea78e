use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info};

use crate::error::{RasctlError, RasctlResult};
use super::registry::ConnectionRegistry;
use super::service::{ConnectionState, RemoteAccessService};

/// Coarse connection status reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStatus {
    Connected,
    NotConnected,
}

impl From<ConnectionState> for LinkStatus {
    fn from(state: ConnectionState) -> Self {
        if state.is_connected() {
            LinkStatus::Connected
        } else {
            LinkStatus::NotConnected
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Connected => f.write_str("connected"),
            LinkStatus::NotConnected => f.write_str("not connected"),
        }
    }
}

/// Observes and tears down live connections
pub struct StatusMonitor {
    service: Arc<dyn RemoteAccessService>,
    registry: ConnectionRegistry,
}

impl StatusMonitor {
    pub fn new(service: Arc<dyn RemoteAccessService>) -> Self {
        Self {
            registry: ConnectionRegistry::new(service.clone()),
            service,
        }
    }

    /// Detailed service state of the connection for `profile_name`
    pub async fn connection_state(&self, profile_name: &str) -> RasctlResult<ConnectionState> {
        let handle = self.registry.lookup(profile_name).await?;
        self.service.query_status(handle).await.map_err(|e| {
            error!("Failed to get connection status for '{}': {}", profile_name, e);
            e
        })
    }

    /// Only the service's connected state counts as `Connected`
    pub async fn status(&self, profile_name: &str) -> RasctlResult<LinkStatus> {
        let state = self.connection_state(profile_name).await?;
        debug!("Connection '{}' is {}", profile_name, state);
        Ok(state.into())
    }

    /// Hang up the connection for `profile_name`. Teardown may still be in
    /// progress when this returns.
    pub async fn disconnect(&self, profile_name: &str) -> RasctlResult<()> {
        let handle = self.registry.lookup(profile_name).await?;
        self.service.hang_up(handle).await.map_err(|e| {
            error!("Failed to disconnect '{}': {}", profile_name, e);
            e
        })?;
        info!("Hang-up requested for '{}'", profile_name);
        Ok(())
    }

    /// Poll until `profile_name` is connected or `timeout` elapses.
    ///
    /// A connection that has not shown up in the enumeration yet counts as
    /// not connected; any other error ends the wait.
    pub async fn wait_for_connected(
        &self,
        profile_name: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> RasctlResult<()> {
        // A timeout past the clock's range means waiting without a deadline
        let deadline = Instant::now().checked_add(timeout);

        loop {
            match self.status(profile_name).await {
                Ok(LinkStatus::Connected) => return Ok(()),
                Ok(LinkStatus::NotConnected) | Err(RasctlError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }

            let next_poll = Instant::now().checked_add(poll_interval);
            if matches!((next_poll, deadline), (Some(next), Some(deadline)) if next > deadline) {
                return Err(RasctlError::Timeout(format!(
                    "'{}' did not connect within {:?}",
                    profile_name, timeout
                )));
            }
            sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ras::service::{ActiveConnection, ConnectionHandle, MockRemoteAccessService};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn corp_connection() -> Vec<ActiveConnection> {
        vec![ActiveConnection {
            handle: ConnectionHandle::from_raw(5),
            entry_name: "corp-vpn".to_string(),
            device_name: "WAN Miniport (IKEv2)".to_string(),
            phonebook: None,
        }]
    }

    fn monitor_in_state(state: ConnectionState) -> StatusMonitor {
        let mut service = MockRemoteAccessService::new();
        service.expect_enumerate_connections().returning(|| Ok(corp_connection()));
        service
            .expect_query_status()
            .returning(move |_| Ok(state));
        StatusMonitor::new(Arc::new(service))
    }

    #[tokio::test]
    async fn test_status_classification() {
        let cases = [
            (ConnectionState::Connected, LinkStatus::Connected),
            (ConnectionState::Dialing, LinkStatus::NotConnected),
            (ConnectionState::Disconnecting, LinkStatus::NotConnected),
            (ConnectionState::Disconnected, LinkStatus::NotConnected),
            (ConnectionState::Other(0x1001), LinkStatus::NotConnected),
        ];

        for (state, expected) in cases {
            let monitor = monitor_in_state(state);
            assert_eq!(monitor.status("corp-vpn").await.unwrap(), expected, "state {}", state);
        }
    }

    #[tokio::test]
    async fn test_status_unknown_profile() {
        let monitor = monitor_in_state(ConnectionState::Connected);
        assert!(matches!(
            monitor.status("home").await,
            Err(RasctlError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_status_query_error() {
        let mut service = MockRemoteAccessService::new();
        service.expect_enumerate_connections().returning(|| Ok(corp_connection()));
        service
            .expect_query_status()
            .returning(|_| Err(RasctlError::platform("Get connect status", 6, None)));

        let monitor = StatusMonitor::new(Arc::new(service));
        assert_eq!(monitor.status("corp-vpn").await.unwrap_err().code(), Some(6));
    }

    #[tokio::test]
    async fn test_disconnect_hangs_up_resolved_handle() {
        let mut service = MockRemoteAccessService::new();
        service.expect_enumerate_connections().returning(|| Ok(corp_connection()));
        service
            .expect_hang_up()
            .withf(|handle| *handle == ConnectionHandle::from_raw(5))
            .times(1)
            .returning(|_| Ok(()));

        let monitor = StatusMonitor::new(Arc::new(service));
        assert!(monitor.disconnect("corp-vpn").await.is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_without_connection() {
        let mut service = MockRemoteAccessService::new();
        service.expect_enumerate_connections().returning(|| Ok(Vec::new()));
        service.expect_hang_up().never();

        let monitor = StatusMonitor::new(Arc::new(service));
        assert!(matches!(
            monitor.disconnect("corp-vpn").await,
            Err(RasctlError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_wait_for_connected() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();

        let mut service = MockRemoteAccessService::new();
        service.expect_enumerate_connections().returning(|| Ok(corp_connection()));
        service.expect_query_status().returning(move |_| {
            // Third poll sees the tunnel up
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(ConnectionState::Dialing)
            } else {
                Ok(ConnectionState::Connected)
            }
        });

        let monitor = StatusMonitor::new(Arc::new(service));
        monitor
            .wait_for_connected("corp-vpn", Duration::from_secs(5), Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_wait_until_connection_appears() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();

        let mut service = MockRemoteAccessService::new();
        service.expect_enumerate_connections().returning(move || {
            // Not enumerated until the third poll
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(Vec::new())
            } else {
                Ok(corp_connection())
            }
        });
        service
            .expect_query_status()
            .returning(|_| Ok(ConnectionState::Connected));

        let monitor = StatusMonitor::new(Arc::new(service));
        monitor
            .wait_for_connected("corp-vpn", Duration::from_secs(5), Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_wait_with_unbounded_timeout() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();

        let mut service = MockRemoteAccessService::new();
        service.expect_enumerate_connections().returning(|| Ok(corp_connection()));
        service.expect_query_status().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(ConnectionState::Dialing)
            } else {
                Ok(ConnectionState::Connected)
            }
        });

        let monitor = StatusMonitor::new(Arc::new(service));
        monitor
            .wait_for_connected("corp-vpn", Duration::from_secs(u64::MAX), Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let monitor = monitor_in_state(ConnectionState::Dialing);
        let err = monitor
            .wait_for_connected("corp-vpn", Duration::from_millis(20), Duration::from_millis(5))
            .await
            .unwrap_err();
        assert!(matches!(err, RasctlError::Timeout(_)));
    }
}
