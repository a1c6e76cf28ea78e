//! Remote Access (RAS) VPN profiles
//!
//! Creates IKEv2/EAP dial entries in a phone book, dials them, and watches
//! or tears down the resulting connections.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            RasManager (Unified API)         │
//! └──────┬──────────┬───────────┬───────────────┘
//!        │          │           │
//!        ▼          ▼           ▼
//!  ProfileStore   Dialer   StatusMonitor ──▶ ConnectionRegistry
//!        │          │           │                   │
//!        └──────────┴─────┬─────┴───────────────────┘
//!                         ▼
//!              RemoteAccessService            <- Service backends
//!        (rasapi32 │ in-memory │ unsupported)
//! ```
//!
//! Every component holds the same `Arc<dyn RemoteAccessService>`. The
//! Windows backend talks to rasapi32; other hosts get a backend that
//! reports every call as unsupported.
//!
//! # Usage
//!
//! ```rust,no_run
//! use librasctl::ras::{default_service, ProfilePolicy, RasManager};
//! use std::path::Path;
//!
//! # async fn run() -> librasctl::RasctlResult<()> {
//! let manager = RasManager::new(default_service(), ProfilePolicy::default());
//! let phonebook = Path::new(r"C:\ProgramData\Microsoft\Network\Connections\Pbk\rasphone.pbk");
//!
//! manager.create_profile("corp-vpn", "vpn.example.com", "alice", "s3cr3t", phonebook).await?;
//! manager.connect("corp-vpn", phonebook).await?;
//! # Ok(())
//! # }
//! ```

pub mod credential;
pub mod profile;
pub mod service;
pub mod store;
pub mod registry;
pub mod dialer;
pub mod monitor;
pub mod manager;
pub mod memory;

#[cfg(windows)]
pub mod windows;

#[cfg(not(windows))]
pub mod unsupported;

use std::sync::Arc;

pub use credential::{Credential, EapUserData, EAP_USER_DATA_LEN};
pub use profile::{
    EntryOption, NetworkProtocol, ProfilePolicy, RedialPolicy, SecurityOption, VpnProfile,
    VpnStrategy,
};
pub use service::{ActiveConnection, ConnectionHandle, ConnectionState, DialParams, RemoteAccessService};
pub use store::{ProfileCreated, ProfileStore};
pub use registry::ConnectionRegistry;
pub use dialer::Dialer;
pub use monitor::{LinkStatus, StatusMonitor};
pub use manager::RasManager;
pub use memory::InMemoryRemoteAccess;

/// Remote-access service for the current host
#[cfg(windows)]
pub fn default_service() -> Arc<dyn RemoteAccessService> {
    Arc::new(windows::WindowsRemoteAccess::new())
}

/// Remote-access service for the current host
#[cfg(not(windows))]
pub fn default_service() -> Arc<dyn RemoteAccessService> {
    Arc::new(unsupported::UnsupportedRemoteAccess)
}
