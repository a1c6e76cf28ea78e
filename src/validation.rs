//! Input validation
//!
//! Names and paths end up in fixed-size ANSI fields of the remote-access
//! service's structures, so lengths are checked against those fields here.

use crate::error::{RasctlError, RasctlResult};
use std::path::Path;

/// Maximum entry name length (RAS_MaxEntryName)
pub const MAX_ENTRY_NAME_LEN: usize = 256;

/// Maximum server address length (RAS_MaxPhoneNumber)
pub const MAX_SERVER_ADDRESS_LEN: usize = 128;

/// Maximum phone book path length (MAX_PATH without terminator)
pub const MAX_PHONEBOOK_PATH_LEN: usize = 259;

/// Maximum length for error messages shown to users
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Validate a phone book entry name
pub fn validate_profile_name(name: &str) -> RasctlResult<()> {
    if name.trim().is_empty() {
        return Err(RasctlError::InvalidParameter(
            "Profile name cannot be empty".to_string()
        ));
    }

    if name.len() > MAX_ENTRY_NAME_LEN {
        return Err(RasctlError::InvalidParameter(
            format!("Profile name too long (max {} bytes)", MAX_ENTRY_NAME_LEN)
        ));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(RasctlError::InvalidParameter(
            "Profile name contains invalid control characters".to_string()
        ));
    }

    // The service refuses entry names with a leading dot
    if name.starts_with('.') {
        return Err(RasctlError::InvalidParameter(
            "Profile name cannot start with '.'".to_string()
        ));
    }

    Ok(())
}

/// Validate the VPN server address stored as the entry's phone number.
///
/// Only checks what the entry field can hold; whether the address resolves
/// or is well formed is for the service to decide when it dials.
pub fn validate_server_address(addr: &str) -> RasctlResult<()> {
    if addr.trim().is_empty() {
        return Err(RasctlError::InvalidParameter(
            "Server address cannot be empty".to_string()
        ));
    }

    if addr.len() > MAX_SERVER_ADDRESS_LEN {
        return Err(RasctlError::InvalidParameter(
            format!("Server address too long (max {} bytes)", MAX_SERVER_ADDRESS_LEN)
        ));
    }

    if addr.chars().any(|c| c.is_control()) {
        return Err(RasctlError::InvalidParameter(
            format!("Server address '{}' contains control characters", addr.escape_debug())
        ));
    }

    Ok(())
}

/// Validate a phone book path. The file itself belongs to the service and
/// is neither opened nor required to exist here.
pub fn validate_phonebook_path(path: &Path) -> RasctlResult<()> {
    let path_str = path.to_str().ok_or_else(|| RasctlError::InvalidParameter(
        "Phone book path must be valid UTF-8".to_string()
    ))?;

    if path_str.trim().is_empty() {
        return Err(RasctlError::InvalidParameter(
            "Phone book path cannot be empty".to_string()
        ));
    }

    if path_str.contains('\0') {
        return Err(RasctlError::InvalidParameter(
            "Phone book path contains null byte".to_string()
        ));
    }

    if path_str.len() > MAX_PHONEBOOK_PATH_LEN {
        return Err(RasctlError::InvalidParameter(
            format!("Phone book path too long (max {} bytes)", MAX_PHONEBOOK_PATH_LEN)
        ));
    }

    Ok(())
}

/// Sanitize service-provided text before showing it to users
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized: String = message
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string();

    if sanitized.len() > MAX_ERROR_MESSAGE_LEN {
        let mut cut = MAX_ERROR_MESSAGE_LEN;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("... (truncated)");
    }

    sanitized
}
