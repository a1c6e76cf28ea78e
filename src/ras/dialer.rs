use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{RasctlError, RasctlResult};
use crate::validation;
use super::service::{ConnectionHandle, DialParams, RemoteAccessService};

/// Starts connections for stored entries
pub struct Dialer {
    service: Arc<dyn RemoteAccessService>,
}

impl Dialer {
    pub fn new(service: Arc<dyn RemoteAccessService>) -> Self {
        Self { service }
    }

    /// Ask the service to dial `profile_name`.
    ///
    /// Returns once the service has accepted the request. The tunnel may
    /// still be negotiating; poll the connection state to see it come up.
    pub async fn connect(&self, profile_name: &str, phonebook: &Path) -> RasctlResult<ConnectionHandle> {
        validation::validate_profile_name(profile_name)?;
        validation::validate_phonebook_path(phonebook)?;

        let params = match self.service.get_dial_params(phonebook, profile_name).await {
            Ok(params) => params,
            Err(e) => {
                warn!("No stored dial parameters for '{}', dialing by entry name only: {}", profile_name, e);
                DialParams::for_entry(profile_name)
            }
        };
        debug!(
            "Dialing '{}' (user: '{}', saved password: {})",
            profile_name, params.user_name, params.password_saved
        );

        match self.service.dial(phonebook, &params).await {
            Ok(Some(handle)) => {
                info!("Dial request accepted for '{}' (handle {})", profile_name, handle);
                Ok(handle)
            }
            Ok(None) => {
                error!("Dial for '{}' returned no connection handle", profile_name);
                Err(RasctlError::ConnectionFailed {
                    reason: format!("no connection handle returned for '{}'", profile_name),
                })
            }
            Err(e) => {
                error!("Error connecting to VPN '{}': {}", profile_name, e);
                Err(e)
            }
        }
    }
}
