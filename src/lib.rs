//! rasctl - Windows Remote Access VPN control library
//!
//! Async library for managing IKEv2/EAP VPN profiles through the host's
//! remote-access service:
//! - Profile creation with packed EAP credentials
//! - Dialing stored profiles
//! - Resolving profile names to live connections
//! - Connection status and hang-up
//!
//! A C ABI (`ffi`) exposes the lifecycle to non-Rust hosts with integer
//! status codes.

pub mod error;
pub mod validation;
pub mod config;
pub mod ras;
pub mod ffi;

// Re-export commonly used types
pub use error::{RasctlError, RasctlResult};
pub use config::{RasctlConfig, WaitSettings};
pub use ras::{
    default_service, ActiveConnection, ConnectionHandle, ConnectionState, Credential,
    EapUserData, InMemoryRemoteAccess, LinkStatus, ProfileCreated, ProfilePolicy, RasManager,
    RemoteAccessService, VpnProfile, VpnStrategy,
};
