//! C ABI for embedding hosts
//!
//! Each exported function runs one operation to completion on a private
//! current-thread runtime and maps the outcome to an integer code. Failures
//! are reported on stderr through `tracing`.
//!
//! These functions must not be called from a thread that is already driving
//! a tokio runtime; such calls return the failure code without doing any
//! work. Rust callers should use `RasManager` instead.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::sync::Once;
use std::future::Future;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crate::error::RasctlError;
use crate::ras::{default_service, LinkStatus, ProfilePolicy, RasManager};

pub const SUCCESS: c_int = 0;
pub const FAILURE: c_int = 1;

pub const STATUS_CONNECTED: c_int = 0;
pub const STATUS_NOT_CONNECTED: c_int = 1;
pub const STATUS_QUERY_ERROR: c_int = -1;

static LOGGING: Once = Once::new();

/// Route diagnostics to stderr unless the host already installed a subscriber
fn init_diagnostics() {
    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("librasctl=info"));

        // A host-installed global subscriber wins
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(false)
            .try_init();
    });
}

/// Borrow a caller string, treating null and invalid UTF-8 as absent
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the returned lifetime.
unsafe fn borrow_str<'a>(ptr: *const c_char, arg: &str) -> Option<&'a str> {
    if ptr.is_null() {
        error!("Argument '{}' is null", arg);
        return None;
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(value) => Some(value),
        Err(_) => {
            error!("Argument '{}' is not valid UTF-8", arg);
            None
        }
    }
}

fn run<F: Future<Output = c_int>>(on_error: c_int, future: F) -> c_int {
    // Blocking inside a caller's runtime would panic across the C boundary
    if tokio::runtime::Handle::try_current().is_ok() {
        error!("Called from inside an async runtime; use RasManager directly instead");
        return on_error;
    }

    match tokio::runtime::Builder::new_current_thread().enable_time().build() {
        Ok(runtime) => runtime.block_on(future),
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            on_error
        }
    }
}

fn manager() -> RasManager {
    RasManager::new(default_service(), ProfilePolicy::default())
}

pub async fn create_profile_code(
    manager: &RasManager,
    name: &str,
    server_address: &str,
    username: &str,
    secret: &str,
    phonebook: &Path,
) -> c_int {
    match manager.create_profile(name, server_address, username, secret, phonebook).await {
        Ok(created) => {
            if let Some(e) = created.credential_error {
                warn!("Failed to set EAP credentials for '{}': {}", name, e);
            }
            SUCCESS
        }
        Err(e) => {
            error!("Error creating VPN profile '{}': {}", name, e);
            FAILURE
        }
    }
}

pub async fn connect_code(manager: &RasManager, name: &str, phonebook: &Path) -> c_int {
    match manager.connect(name, phonebook).await {
        Ok(_) => SUCCESS,
        Err(e) => {
            error!("Error connecting to VPN '{}': {}", name, e);
            FAILURE
        }
    }
}

pub async fn disconnect_code(manager: &RasManager, name: &str) -> c_int {
    match manager.disconnect(name).await {
        Ok(()) => SUCCESS,
        Err(RasctlError::NotFound(_)) => {
            error!("Failed to find an active connection for '{}'", name);
            FAILURE
        }
        Err(e) => {
            error!("Failed to disconnect '{}': {}", name, e);
            FAILURE
        }
    }
}

pub async fn status_code(manager: &RasManager, name: &str) -> c_int {
    match manager.status(name).await {
        Ok(LinkStatus::Connected) => STATUS_CONNECTED,
        Ok(LinkStatus::NotConnected) => STATUS_NOT_CONNECTED,
        Err(e) => {
            error!("Failed to get status for '{}': {}", name, e);
            STATUS_QUERY_ERROR
        }
    }
}

/// Create or overwrite a VPN profile and store its EAP credentials.
///
/// Returns 0 once the entry is written, even if storing the credentials
/// failed; 1 otherwise.
///
/// # Safety
/// Every argument must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn create_profile(
    name: *const c_char,
    server_address: *const c_char,
    username: *const c_char,
    secret: *const c_char,
    phonebook: *const c_char,
) -> c_int {
    init_diagnostics();
    let (Some(name), Some(server_address), Some(username), Some(secret), Some(phonebook)) = (
        borrow_str(name, "name"),
        borrow_str(server_address, "server_address"),
        borrow_str(username, "username"),
        borrow_str(secret, "secret"),
        borrow_str(phonebook, "phonebook"),
    ) else {
        return FAILURE;
    };

    run(
        FAILURE,
        create_profile_code(&manager(), name, server_address, username, secret, Path::new(phonebook)),
    )
}

/// Always succeeds; entries are removed by deleting them from their phone book.
#[no_mangle]
pub extern "C" fn delete_profile() -> c_int {
    init_diagnostics();
    match manager().delete_profile() {
        Ok(()) => SUCCESS,
        Err(e) => {
            error!("Failed to delete profile: {}", e);
            FAILURE
        }
    }
}

/// Start dialing a profile. Returns 0 once the dial request is accepted.
///
/// # Safety
/// Both arguments must be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn connect_vpn(name: *const c_char, phonebook: *const c_char) -> c_int {
    init_diagnostics();
    let (Some(name), Some(phonebook)) = (borrow_str(name, "name"), borrow_str(phonebook, "phonebook")) else {
        return FAILURE;
    };

    run(FAILURE, connect_code(&manager(), name, Path::new(phonebook)))
}

/// Hang up the active connection for a profile.
///
/// # Safety
/// `name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn disconnect_vpn(name: *const c_char) -> c_int {
    init_diagnostics();
    let Some(name) = borrow_str(name, "name") else {
        return FAILURE;
    };

    run(FAILURE, disconnect_code(&manager(), name))
}

/// 0 connected, 1 not connected, -1 if the connection could not be found
/// or queried.
///
/// # Safety
/// `name` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn status(name: *const c_char) -> c_int {
    init_diagnostics();
    let Some(name) = borrow_str(name, "name") else {
        return STATUS_QUERY_ERROR;
    };

    run(STATUS_QUERY_ERROR, status_code(&manager(), name))
}
