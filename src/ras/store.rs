use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{RasctlError, RasctlResult};
use crate::validation;
use super::credential::Credential;
use super::profile::{ProfilePolicy, VpnProfile};
use super::service::RemoteAccessService;

/// Result of a successful `create_profile`.
///
/// The entry write and the credential write are separate service calls with
/// no transaction between them. When the second one fails the entry still
/// exists but cannot authenticate.
#[derive(Debug)]
pub struct ProfileCreated {
    pub profile: VpnProfile,
    pub credential_error: Option<RasctlError>,
}

impl ProfileCreated {
    pub fn credentials_stored(&self) -> bool {
        self.credential_error.is_none()
    }
}

/// Creates and reads dial entries in a phone book
pub struct ProfileStore {
    service: Arc<dyn RemoteAccessService>,
    policy: ProfilePolicy,
}

impl ProfileStore {
    pub fn new(service: Arc<dyn RemoteAccessService>, policy: ProfilePolicy) -> Self {
        Self { service, policy }
    }

    pub fn policy(&self) -> &ProfilePolicy {
        &self.policy
    }

    /// Create or overwrite the entry `name` in `phonebook`.
    ///
    /// Creation is idempotent-overwrite: an existing entry with the same name
    /// is replaced, never reported as a conflict.
    pub async fn create_profile(
        &self,
        name: &str,
        server_address: &str,
        credential: &Credential,
        phonebook: &Path,
    ) -> RasctlResult<ProfileCreated> {
        validation::validate_profile_name(name)?;
        validation::validate_server_address(server_address)?;
        validation::validate_phonebook_path(phonebook)?;
        self.policy.validate()?;

        // Packing happens before any write so a bad credential leaves the
        // phone book untouched
        let eap_data = credential.encode()?;

        let profile = VpnProfile::from_policy(name, server_address, &self.policy);
        debug!("Writing VPN entry '{}' ({}) to {:?}", name, profile.strategy, phonebook);

        if let Err(e) = self.service.create_or_update_entry(phonebook, &profile).await {
            error!("Error creating VPN entry '{}': {}", name, e);
            return Err(e);
        }
        info!("Created VPN entry '{}' -> {}", name, server_address);

        let credential_error = match self.service.store_credential(phonebook, name, &eap_data).await {
            Ok(()) => {
                debug!("Stored EAP credentials for '{}'", name);
                None
            }
            Err(e) => {
                warn!("VPN entry '{}' was created but its EAP credentials were not stored: {}", name, e);
                Some(e)
            }
        };

        Ok(ProfileCreated {
            profile,
            credential_error,
        })
    }

    pub async fn read_profile(&self, name: &str, phonebook: &Path) -> RasctlResult<VpnProfile> {
        validation::validate_profile_name(name)?;
        validation::validate_phonebook_path(phonebook)?;
        self.service.get_entry(phonebook, name).await
    }

    /// Profiles live in caller-managed phone book files, so removing one is
    /// left to whoever owns the file.
    pub fn delete_profile(&self) -> RasctlResult<()> {
        debug!("delete_profile is a no-op; remove the entry from its phone book file instead");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ras::service::MockRemoteAccessService;
    use std::path::PathBuf;

    fn phonebook() -> PathBuf {
        PathBuf::from("C:\\pb.pbk")
    }

    #[tokio::test]
    async fn test_credential_failure_keeps_profile() {
        let mut service = MockRemoteAccessService::new();
        service
            .expect_create_or_update_entry()
            .times(1)
            .returning(|_, _| Ok(()));
        service
            .expect_store_credential()
            .times(1)
            .returning(|_, _, _| Err(RasctlError::platform("Set EAP user data", 623, None)));

        let store = ProfileStore::new(Arc::new(service), ProfilePolicy::default());
        let created = store
            .create_profile("corp-vpn", "203.0.113.5", &Credential::new("alice", "s3cr3t"), &phonebook())
            .await
            .unwrap();

        assert!(!created.credentials_stored());
        assert_eq!(created.credential_error.and_then(|e| e.code()), Some(623));
        assert_eq!(created.profile.name, "corp-vpn");
    }

    #[tokio::test]
    async fn test_entry_failure_skips_credentials() {
        let mut service = MockRemoteAccessService::new();
        service
            .expect_create_or_update_entry()
            .times(1)
            .returning(|_, _| Err(RasctlError::platform("Set entry properties", 621, None)));
        service.expect_store_credential().never();

        let store = ProfileStore::new(Arc::new(service), ProfilePolicy::default());
        let err = store
            .create_profile("corp-vpn", "203.0.113.5", &Credential::new("alice", "s3cr3t"), &phonebook())
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some(621));
    }

    #[tokio::test]
    async fn test_oversized_credential_writes_nothing() {
        let mut service = MockRemoteAccessService::new();
        service.expect_create_or_update_entry().never();
        service.expect_store_credential().never();

        let store = ProfileStore::new(Arc::new(service), ProfilePolicy::default());
        let credential = Credential::new("a".repeat(200), "b".repeat(100));
        let err = store
            .create_profile("corp-vpn", "203.0.113.5", &credential, &phonebook())
            .await
            .unwrap_err();

        assert!(matches!(err, RasctlError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_entry_carries_policy() {
        let mut policy = ProfilePolicy::default();
        policy.redial.count = 7;

        let mut service = MockRemoteAccessService::new();
        service
            .expect_create_or_update_entry()
            .withf(|_, profile| profile.redial.count == 7 && profile.server_address == "vpn.example.com")
            .times(1)
            .returning(|_, _| Ok(()));
        service.expect_store_credential().returning(|_, _, _| Ok(()));

        let store = ProfileStore::new(Arc::new(service), policy);
        let created = store
            .create_profile("corp-vpn", "vpn.example.com", &Credential::new("alice", "s3cr3t"), &phonebook())
            .await
            .unwrap();
        assert!(created.credentials_stored());
    }

    #[tokio::test]
    async fn test_rejects_empty_name_and_bad_address() {
        let store = ProfileStore::new(Arc::new(MockRemoteAccessService::new()), ProfilePolicy::default());
        let credential = Credential::new("alice", "s3cr3t");

        assert!(store.create_profile("", "203.0.113.5", &credential, &phonebook()).await.is_err());
        assert!(store.create_profile("corp-vpn", "", &credential, &phonebook()).await.is_err());
        assert!(store.create_profile("corp-vpn", "203.0.113.5", &credential, Path::new("")).await.is_err());
    }

    #[test]
    fn test_delete_is_noop() {
        let store = ProfileStore::new(Arc::new(MockRemoteAccessService::new()), ProfilePolicy::default());
        assert!(store.delete_profile().is_ok());
    }
}
