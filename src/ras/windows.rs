//! Remote access service backed by rasapi32
//!
//! This module contains all unsafe RAS API code. Every call is synchronous
//! on the platform side; the async methods delegate to `*_sync` helpers.

use async_trait::async_trait;
use std::ffi::CString;
use std::mem::{size_of, zeroed};
use std::path::Path;
use std::ptr;
use tracing::{debug, warn};
use windows_sys::Win32::NetworkManagement::Rras::{
    RasDialA, RasEnumConnectionsA, RasGetConnectStatusA, RasGetEntryDialParamsA,
    RasGetEntryPropertiesA, RasGetErrorStringA, RasHangUpA, RasSetEapUserDataA,
    RasSetEntryPropertiesA, HRASCONN, RASCONNA, RASCONNSTATUSA, RASDIALPARAMSA, RASENTRYA,
};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{RasctlError, RasctlResult};
use crate::validation::sanitize_error_message;
use super::credential::{EapUserData, EAP_USER_DATA_LEN};
use super::profile::{EntryOption, NetworkProtocol, SecurityOption, VpnProfile, VpnStrategy, RedialPolicy};
use super::service::{
    ActiveConnection, ConnectionHandle, ConnectionState, DialParams, RemoteAccessService,
};

const ERROR_SUCCESS: u32 = 0;
const ERROR_BUFFER_TOO_SMALL: u32 = 603;

// RASEO_*
const RASEO_REMOTE_DEFAULT_GATEWAY: u32 = 0x0000_0010;
const RASEO_REQUIRE_DATA_ENCRYPTION: u32 = 0x0000_1000;
const RASEO_REQUIRE_EAP: u32 = 0x0002_0000;
const RASEO_PREVIEW_USER_PW: u32 = 0x0100_0000;
const RASEO_PREVIEW_DOMAIN: u32 = 0x0200_0000;
const RASEO_SHOW_DIALING_PROGRESS: u32 = 0x0400_0000;

// RASEO2_*
const RASEO2_DONT_NEGOTIATE_MULTILINK: u32 = 0x0000_0004;
const RASEO2_RECONNECT_IF_DROPPED: u32 = 0x0000_0100;
const RASEO2_IPV6_REMOTE_DEFAULT_GATEWAY: u32 = 0x0000_2000;
const RASEO2_CACHE_CREDENTIALS: u32 = 0x0200_0000;

const RASNP_IP: u32 = 0x0000_0004;
const RASNP_IPV6: u32 = 0x0000_0008;
const RASET_VPN: u32 = 2;

const RASCS_PAUSED: u32 = 0x1000;
const RASCS_CONNECTED: u32 = 0x2000;
const RASCS_DISCONNECTED: u32 = 0x2001;

const ERROR_TEXT_LEN: usize = 512;

const SECURITY_FLAGS: [(SecurityOption, u32); 6] = [
    (SecurityOption::RemoteDefaultGateway, RASEO_REMOTE_DEFAULT_GATEWAY),
    (SecurityOption::RequireEncryption, RASEO_REQUIRE_DATA_ENCRYPTION),
    (SecurityOption::RequireEap, RASEO_REQUIRE_EAP),
    (SecurityOption::ShowDialingProgress, RASEO_SHOW_DIALING_PROGRESS),
    (SecurityOption::PreviewDomain, RASEO_PREVIEW_DOMAIN),
    (SecurityOption::PreviewUserPassword, RASEO_PREVIEW_USER_PW),
];

const ENTRY_FLAGS: [(EntryOption, u32); 4] = [
    (EntryOption::DisableMultilink, RASEO2_DONT_NEGOTIATE_MULTILINK),
    (EntryOption::ReconnectIfDropped, RASEO2_RECONNECT_IF_DROPPED),
    (EntryOption::Ipv6RemoteDefaultGateway, RASEO2_IPV6_REMOTE_DEFAULT_GATEWAY),
    (EntryOption::CacheCredentials, RASEO2_CACHE_CREDENTIALS),
];

const PROTOCOL_FLAGS: [(NetworkProtocol, u32); 2] = [
    (NetworkProtocol::Ip, RASNP_IP),
    (NetworkProtocol::Ipv6, RASNP_IPV6),
];

/// Fixed-size ANSI character buffers in the RAS structures
trait AnsiChar: Copy {
    fn from_byte(byte: u8) -> Self;
    fn to_byte(self) -> u8;
}

impl AnsiChar for u8 {
    fn from_byte(byte: u8) -> Self {
        byte
    }

    fn to_byte(self) -> u8 {
        self
    }
}

impl AnsiChar for i8 {
    fn from_byte(byte: u8) -> Self {
        byte as i8
    }

    fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Copy `value` into a NUL-terminated buffer, rejecting values that do not fit
fn write_ansi<C: AnsiChar>(field: &str, dst: &mut [C], value: &str) -> RasctlResult<()> {
    let bytes = value.as_bytes();
    if bytes.len() >= dst.len() || bytes.contains(&0) {
        return Err(RasctlError::InvalidParameter(format!(
            "{} does not fit in {} bytes",
            field,
            dst.len() - 1
        )));
    }
    for (slot, byte) in dst.iter_mut().zip(bytes) {
        *slot = C::from_byte(*byte);
    }
    dst[bytes.len()] = C::from_byte(0);
    Ok(())
}

fn read_ansi<C: AnsiChar>(src: &[C]) -> String {
    let bytes: Vec<u8> = src
        .iter()
        .map(|c| c.to_byte())
        .take_while(|byte| *byte != 0)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn c_string(field: &str, value: &str) -> RasctlResult<CString> {
    CString::new(value)
        .map_err(|_| RasctlError::InvalidParameter(format!("{} contains a NUL byte", field)))
}

fn phonebook_c_string(phonebook: &Path) -> RasctlResult<CString> {
    let path = phonebook.to_str().ok_or_else(|| {
        RasctlError::InvalidParameter("Phone book path must be valid UTF-8".to_string())
    })?;
    c_string("Phone book path", path)
}

fn flags_from<T: Copy + Ord>(set: &std::collections::BTreeSet<T>, table: &[(T, u32)]) -> u32 {
    table
        .iter()
        .filter(|(option, _)| set.contains(option))
        .fold(0, |acc, (_, flag)| acc | flag)
}

fn set_from<T: Copy + Ord>(flags: u32, table: &[(T, u32)]) -> std::collections::BTreeSet<T> {
    table
        .iter()
        .filter(|(_, flag)| flags & flag != 0)
        .map(|(option, _)| *option)
        .collect()
}

fn state_from_raw(raw: u32) -> ConnectionState {
    match raw {
        RASCS_CONNECTED => ConnectionState::Connected,
        RASCS_DISCONNECTED => ConnectionState::Disconnected,
        raw if raw < RASCS_PAUSED => ConnectionState::Dialing,
        raw => ConnectionState::Other(raw),
    }
}

/// RAS API implementation for Windows hosts
pub struct WindowsRemoteAccess;

impl WindowsRemoteAccess {
    pub fn new() -> Self {
        WindowsRemoteAccess
    }

    fn fail(&self, context: &str, code: u32) -> RasctlError {
        RasctlError::platform(context, code, self.describe_error(code))
    }

    fn create_or_update_entry_sync(&self, phonebook: &Path, profile: &VpnProfile) -> RasctlResult<()> {
        let pbk = phonebook_c_string(phonebook)?;
        let entry_name = c_string("Profile name", &profile.name)?;

        // SAFETY: RASENTRYA is plain data; all-zero is a valid empty entry
        let mut entry: RASENTRYA = unsafe { zeroed() };
        entry.dwSize = size_of::<RASENTRYA>() as _;
        entry.dwfOptions = flags_from(&profile.security_options, &SECURITY_FLAGS) as _;
        entry.dwfOptions2 = flags_from(&profile.entry_options, &ENTRY_FLAGS) as _;
        entry.dwfNetProtocols = flags_from(&profile.network_protocols, &PROTOCOL_FLAGS) as _;
        entry.dwType = RASET_VPN as _;
        entry.dwVpnStrategy = profile.strategy.as_raw() as _;
        entry.dwRedialCount = profile.redial.count as _;
        entry.dwRedialPause = profile.redial.pause_seconds as _;
        write_ansi("Server address", &mut entry.szLocalPhoneNumber, &profile.server_address)?;
        write_ansi("Device type", &mut entry.szDeviceType, &profile.device_type)?;
        write_ansi("Device name", &mut entry.szDeviceName, &profile.device_name)?;

        // SAFETY: strings are NUL-terminated and outlive the call; the entry
        // is fully initialised with dwSize set
        let result = unsafe {
            RasSetEntryPropertiesA(
                pbk.as_ptr().cast(),
                entry_name.as_ptr().cast(),
                &entry,
                size_of::<RASENTRYA>() as u32,
                ptr::null(),
                0,
            )
        };
        if result != ERROR_SUCCESS {
            return Err(self.fail("Set entry properties", result));
        }
        Ok(())
    }

    fn get_entry_sync(&self, phonebook: &Path, name: &str) -> RasctlResult<VpnProfile> {
        let pbk = phonebook_c_string(phonebook)?;
        let entry_name = c_string("Profile name", name)?;

        // SAFETY: zeroed plain data with dwSize set
        let mut entry: RASENTRYA = unsafe { zeroed() };
        entry.dwSize = size_of::<RASENTRYA>() as _;
        let mut entry_size = size_of::<RASENTRYA>() as u32;
        let mut device_info_size = 0u32;

        // SAFETY: entry_size describes the buffer behind `entry`
        let result = unsafe {
            RasGetEntryPropertiesA(
                pbk.as_ptr().cast(),
                entry_name.as_ptr().cast(),
                &mut entry,
                &mut entry_size,
                ptr::null_mut(),
                &mut device_info_size,
            )
        };
        if result != ERROR_SUCCESS {
            return Err(self.fail("Get entry properties", result));
        }

        let raw_strategy = entry.dwVpnStrategy as u32;
        let strategy = VpnStrategy::from_raw(raw_strategy).unwrap_or_else(|| {
            warn!("Entry '{}' has unknown VPN strategy {}", name, raw_strategy);
            VpnStrategy::Default
        });
        if entry.dwType as u32 != RASET_VPN {
            debug!("Entry '{}' is not a VPN entry (type {})", name, entry.dwType as u32);
        }

        Ok(VpnProfile {
            name: name.to_string(),
            server_address: read_ansi(&entry.szLocalPhoneNumber),
            device_type: read_ansi(&entry.szDeviceType),
            device_name: read_ansi(&entry.szDeviceName),
            network_protocols: set_from(entry.dwfNetProtocols as u32, &PROTOCOL_FLAGS),
            security_options: set_from(entry.dwfOptions as u32, &SECURITY_FLAGS),
            entry_options: set_from(entry.dwfOptions2 as u32, &ENTRY_FLAGS),
            strategy,
            redial: RedialPolicy {
                count: entry.dwRedialCount as u32,
                pause_seconds: entry.dwRedialPause as u32,
            },
        })
    }

    fn store_credential_sync(&self, phonebook: &Path, name: &str, data: &EapUserData) -> RasctlResult<()> {
        let pbk = phonebook_c_string(phonebook)?;
        let entry_name = c_string("Profile name", name)?;
        let bytes = data.as_bytes();

        // SAFETY: the blob is EAP_USER_DATA_LEN bytes and lives across the call
        let result = unsafe {
            RasSetEapUserDataA(
                ptr::null_mut(),
                pbk.as_ptr().cast(),
                entry_name.as_ptr().cast(),
                bytes.as_ptr(),
                EAP_USER_DATA_LEN as u32,
            )
        };
        if result != ERROR_SUCCESS {
            return Err(self.fail("Set EAP user data", result));
        }
        Ok(())
    }

    fn get_dial_params_sync(&self, phonebook: &Path, name: &str) -> RasctlResult<DialParams> {
        let pbk = phonebook_c_string(phonebook)?;

        // SAFETY: zeroed plain data with dwSize set
        let mut raw: RASDIALPARAMSA = unsafe { zeroed() };
        raw.dwSize = size_of::<RASDIALPARAMSA>() as _;
        write_ansi("Profile name", &mut raw.szEntryName, name)?;
        let mut password_saved = 0;

        // SAFETY: the params block is initialised and owned for the call
        let result = unsafe { RasGetEntryDialParamsA(pbk.as_ptr().cast(), &mut raw, &mut password_saved) };
        if result != ERROR_SUCCESS {
            return Err(self.fail("Get entry dial params", result));
        }

        let params = DialParams {
            entry_name: read_ansi(&raw.szEntryName),
            user_name: read_ansi(&raw.szUserName),
            domain: read_ansi(&raw.szDomain),
            password: Zeroizing::new(read_ansi(&raw.szPassword)),
            password_saved: password_saved != 0,
        };
        raw.szPassword.zeroize();
        Ok(params)
    }

    fn dial_sync(&self, phonebook: &Path, params: &DialParams) -> RasctlResult<Option<ConnectionHandle>> {
        let pbk = phonebook_c_string(phonebook)?;

        // SAFETY: zeroed plain data with dwSize set
        let mut raw: RASDIALPARAMSA = unsafe { zeroed() };
        raw.dwSize = size_of::<RASDIALPARAMSA>() as _;
        write_ansi("Profile name", &mut raw.szEntryName, &params.entry_name)?;
        write_ansi("User name", &mut raw.szUserName, &params.user_name)?;
        write_ansi("Domain", &mut raw.szDomain, &params.domain)?;
        let copied = write_ansi("Password", &mut raw.szPassword, &params.password);
        if let Err(e) = copied {
            raw.szPassword.zeroize();
            return Err(e);
        }

        let mut hconn: HRASCONN = 0 as HRASCONN;

        // SAFETY: no dial extensions and no notifier, so the call is
        // synchronous and only writes `hconn`
        let result = unsafe {
            RasDialA(
                ptr::null(),
                pbk.as_ptr().cast(),
                &raw,
                0,
                ptr::null(),
                &mut hconn,
            )
        };
        raw.szPassword.zeroize();
        let handle = hconn as usize;

        if result != ERROR_SUCCESS {
            // A failed dial can still leave a port open
            if handle != 0 {
                // SAFETY: handle came from RasDialA
                let hang_up = unsafe { RasHangUpA(hconn) };
                if hang_up != ERROR_SUCCESS {
                    warn!("Failed to release handle after dial error: RAS error {}", hang_up);
                }
            }
            return Err(self.fail("Dial", result));
        }

        Ok((handle != 0).then(|| ConnectionHandle::from_raw(handle)))
    }

    fn enumerate_connections_sync(&self) -> RasctlResult<Vec<ActiveConnection>> {
        // SAFETY: zeroed plain data with dwSize set
        let mut slot: RASCONNA = unsafe { zeroed() };
        slot.dwSize = size_of::<RASCONNA>() as _;
        let mut size = size_of::<RASCONNA>() as u32;
        let mut count = 0u32;

        // SAFETY: `size` covers the single slot
        let result = unsafe { RasEnumConnectionsA(&mut slot, &mut size, &mut count) };
        match result {
            ERROR_SUCCESS => return Ok(collect_connections(std::slice::from_ref(&slot), count)),
            ERROR_BUFFER_TOO_SMALL => {}
            code => return Err(RasctlError::QueryFailed { code }),
        }

        let slots = (size as usize).div_ceil(size_of::<RASCONNA>());
        let mut connections: Vec<RASCONNA> = (0..slots)
            .map(|_| {
                // SAFETY: zeroed plain data
                let mut conn: RASCONNA = unsafe { zeroed() };
                conn.dwSize = size_of::<RASCONNA>() as _;
                conn
            })
            .collect();
        let mut size = (slots * size_of::<RASCONNA>()) as u32;

        // SAFETY: `size` describes the allocated slots
        let result = unsafe { RasEnumConnectionsA(connections.as_mut_ptr(), &mut size, &mut count) };
        if result != ERROR_SUCCESS {
            return Err(RasctlError::QueryFailed { code: result });
        }

        Ok(collect_connections(&connections, count))
    }

    fn hang_up_sync(&self, handle: ConnectionHandle) -> RasctlResult<()> {
        // SAFETY: an invalid handle is reported as an error code
        let result = unsafe { RasHangUpA(handle.as_raw() as HRASCONN) };
        if result != ERROR_SUCCESS {
            return Err(self.fail("Hang up", result));
        }
        Ok(())
    }

    fn query_status_sync(&self, handle: ConnectionHandle) -> RasctlResult<ConnectionState> {
        // SAFETY: zeroed plain data with dwSize set
        let mut status: RASCONNSTATUSA = unsafe { zeroed() };
        status.dwSize = size_of::<RASCONNSTATUSA>() as _;

        // SAFETY: status is initialised; an invalid handle is reported as an error code
        let result = unsafe { RasGetConnectStatusA(handle.as_raw() as HRASCONN, &mut status) };
        if result != ERROR_SUCCESS {
            return Err(self.fail("Get connect status", result));
        }
        Ok(state_from_raw(status.rasconnstate as u32))
    }
}

impl Default for WindowsRemoteAccess {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_connections(raw: &[RASCONNA], count: u32) -> Vec<ActiveConnection> {
    raw.iter()
        .take(count as usize)
        .map(|conn| {
            let phonebook = read_ansi(&conn.szPhonebook);
            ActiveConnection {
                handle: ConnectionHandle::from_raw(conn.hrasconn as usize),
                entry_name: read_ansi(&conn.szEntryName),
                device_name: read_ansi(&conn.szDeviceName),
                phonebook: (!phonebook.is_empty()).then(|| phonebook.into()),
            }
        })
        .collect()
}

#[async_trait]
impl RemoteAccessService for WindowsRemoteAccess {
    async fn create_or_update_entry(&self, phonebook: &Path, profile: &VpnProfile) -> RasctlResult<()> {
        self.create_or_update_entry_sync(phonebook, profile)
    }

    async fn get_entry(&self, phonebook: &Path, name: &str) -> RasctlResult<VpnProfile> {
        self.get_entry_sync(phonebook, name)
    }

    async fn store_credential(&self, phonebook: &Path, name: &str, data: &EapUserData) -> RasctlResult<()> {
        self.store_credential_sync(phonebook, name, data)
    }

    async fn get_dial_params(&self, phonebook: &Path, name: &str) -> RasctlResult<DialParams> {
        self.get_dial_params_sync(phonebook, name)
    }

    async fn dial(&self, phonebook: &Path, params: &DialParams) -> RasctlResult<Option<ConnectionHandle>> {
        self.dial_sync(phonebook, params)
    }

    async fn enumerate_connections(&self) -> RasctlResult<Vec<ActiveConnection>> {
        self.enumerate_connections_sync()
    }

    async fn hang_up(&self, handle: ConnectionHandle) -> RasctlResult<()> {
        self.hang_up_sync(handle)
    }

    async fn query_status(&self, handle: ConnectionHandle) -> RasctlResult<ConnectionState> {
        self.query_status_sync(handle)
    }

    fn describe_error(&self, code: u32) -> Option<String> {
        let mut buffer = [0u8; ERROR_TEXT_LEN];

        // SAFETY: buffer length is passed alongside the pointer
        let result = unsafe { RasGetErrorStringA(code, buffer.as_mut_ptr().cast(), ERROR_TEXT_LEN as u32) };
        if result != ERROR_SUCCESS {
            return None;
        }

        let text = sanitize_error_message(read_ansi(&buffer).trim());
        (!text.is_empty()).then_some(text)
    }
}
