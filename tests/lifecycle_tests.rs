//! Profile lifecycle against the in-memory remote access service

use librasctl::ffi::{self, STATUS_CONNECTED, STATUS_NOT_CONNECTED, STATUS_QUERY_ERROR};
use librasctl::ras::memory::{Faults, InMemoryRemoteAccess, ERROR_AUTHENTICATION_FAILURE};
use librasctl::ras::profile::{DEVICE_NAME_IKEV2, DEVICE_TYPE_VPN};
use librasctl::ras::{ConnectionState, NetworkProtocol, ProfilePolicy, RasManager, VpnStrategy};
use librasctl::{LinkStatus, RasctlError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (Arc<InMemoryRemoteAccess>, RasManager) {
    let service = Arc::new(InMemoryRemoteAccess::new());
    let manager = RasManager::new(service.clone(), ProfilePolicy::default());
    (service, manager)
}

fn phonebook() -> PathBuf {
    PathBuf::from(r"C:\Users\alice\AppData\Roaming\corp.pbk")
}

#[tokio::test]
async fn test_create_connect_disconnect() {
    let (service, manager) = setup();
    let pbk = phonebook();

    let created = manager
        .create_profile("corp-vpn", "203.0.113.5", "alice", "s3cr3t", &pbk)
        .await
        .unwrap();
    assert!(created.credentials_stored());

    manager.connect("corp-vpn", &pbk).await.unwrap();
    assert_eq!(manager.status("corp-vpn").await.unwrap(), LinkStatus::NotConnected);

    service.settle();
    manager
        .wait_for_connected("corp-vpn", Duration::from_secs(1), Duration::from_millis(5))
        .await
        .unwrap();
    assert_eq!(ffi::status_code(&manager, "corp-vpn").await, STATUS_CONNECTED);

    manager.disconnect("corp-vpn").await.unwrap();
    assert_eq!(ffi::status_code(&manager, "corp-vpn").await, STATUS_NOT_CONNECTED);
}

#[tokio::test]
async fn test_status_of_unknown_profile() {
    let (service, manager) = setup();
    service.inject_connection("home", ConnectionState::Connected);

    assert!(matches!(manager.status("corp-vpn").await, Err(RasctlError::NotFound(_))));
    assert_eq!(ffi::status_code(&manager, "corp-vpn").await, STATUS_QUERY_ERROR);
}

#[tokio::test]
async fn test_oversized_credential_writes_nothing() {
    let (service, manager) = setup();
    let pbk = phonebook();

    let err = manager
        .create_profile("corp-vpn", "203.0.113.5", &"u".repeat(200), &"p".repeat(100), &pbk)
        .await
        .unwrap_err();
    assert!(matches!(err, RasctlError::InvalidParameter(_)));
    assert!(service.entry_names(&pbk).is_empty());
}

#[tokio::test]
async fn test_create_overwrites_existing_entry() {
    let (service, manager) = setup();
    let pbk = phonebook();

    manager
        .create_profile("corp-vpn", "203.0.113.5", "alice", "s3cr3t", &pbk)
        .await
        .unwrap();
    manager
        .create_profile("corp-vpn", "vpn2.example.com", "bob", "hunter2", &pbk)
        .await
        .unwrap();

    assert_eq!(service.entry_names(&pbk), vec!["corp-vpn".to_string()]);
    let profile = manager.read_profile("corp-vpn", &pbk).await.unwrap();
    assert_eq!(profile.server_address, "vpn2.example.com");

    let credential = service.stored_credential(&pbk, "corp-vpn").unwrap();
    assert_eq!(credential.username(), "bob");
    assert_eq!(credential.secret(), "hunter2");
}

#[tokio::test]
async fn test_profile_round_trip() {
    let (_service, manager) = setup();
    let pbk = phonebook();

    manager
        .create_profile("corp-vpn", "vpn.example.com", "alice", "s3cr3t", &pbk)
        .await
        .unwrap();

    let profile = manager.read_profile("corp-vpn", &pbk).await.unwrap();
    assert_eq!(profile.server_address, "vpn.example.com");
    assert_eq!(profile.device_type, DEVICE_TYPE_VPN);
    assert_eq!(profile.device_name, DEVICE_NAME_IKEV2);
    assert!(profile.network_protocols.contains(&NetworkProtocol::Ip));
    assert_eq!(profile.strategy, VpnStrategy::Ikev2Only);
}

#[tokio::test]
async fn test_lookup_uses_first_of_duplicate_names() {
    let (service, manager) = setup();
    let first = service.inject_connection("corp-vpn", ConnectionState::Connected);
    let _second = service.inject_connection("corp-vpn", ConnectionState::Dialing);

    assert_eq!(manager.lookup("corp-vpn").await.unwrap(), first);
    assert_eq!(manager.status("corp-vpn").await.unwrap(), LinkStatus::Connected);
}

#[tokio::test]
async fn test_credential_store_failure_keeps_entry() {
    let (service, manager) = setup();
    let pbk = phonebook();
    service.set_faults(Faults {
        credential_store: Some(ERROR_AUTHENTICATION_FAILURE),
        ..Faults::default()
    });

    let created = manager
        .create_profile("corp-vpn", "203.0.113.5", "alice", "s3cr3t", &pbk)
        .await
        .unwrap();
    assert!(!created.credentials_stored());
    assert_eq!(
        created.credential_error.and_then(|e| e.code()),
        Some(ERROR_AUTHENTICATION_FAILURE)
    );
    assert_eq!(service.entry_names(&pbk), vec!["corp-vpn".to_string()]);
}

#[tokio::test]
async fn test_dial_without_handle_fails() {
    let (service, manager) = setup();
    let pbk = phonebook();
    manager
        .create_profile("corp-vpn", "203.0.113.5", "alice", "s3cr3t", &pbk)
        .await
        .unwrap();
    service.set_faults(Faults {
        dial_without_handle: true,
        ..Faults::default()
    });

    assert!(matches!(
        manager.connect("corp-vpn", &pbk).await,
        Err(RasctlError::ConnectionFailed { .. })
    ));
    assert!(manager.active_connections().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_enumeration_failure_surfaces() {
    let (service, manager) = setup();
    service.set_faults(Faults {
        enumeration: Some(632),
        ..Faults::default()
    });

    assert!(matches!(
        manager.disconnect("corp-vpn").await,
        Err(RasctlError::QueryFailed { code: 632 })
    ));
    assert_eq!(ffi::status_code(&manager, "corp-vpn").await, STATUS_QUERY_ERROR);
}

#[tokio::test]
async fn test_dropped_link_reports_not_connected() {
    let (service, manager) = setup();
    let pbk = phonebook();
    manager
        .create_profile("corp-vpn", "203.0.113.5", "alice", "s3cr3t", &pbk)
        .await
        .unwrap();
    manager.connect("corp-vpn", &pbk).await.unwrap();
    service.settle();
    assert_eq!(manager.status("corp-vpn").await.unwrap(), LinkStatus::Connected);

    service.set_state("corp-vpn", ConnectionState::Disconnecting);
    assert_eq!(manager.status("corp-vpn").await.unwrap(), LinkStatus::NotConnected);

    service.set_state("corp-vpn", ConnectionState::Disconnected);
    service.purge_disconnected();
    assert!(matches!(manager.status("corp-vpn").await, Err(RasctlError::NotFound(_))));
}
