//! VPN profile model and the policy that shapes new profiles

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{RasctlError, RasctlResult};

/// Device type tag for VPN entries (RASDT_Vpn)
pub const DEVICE_TYPE_VPN: &str = "vpn";

/// Miniport used for IKEv2 tunnels
pub const DEVICE_NAME_IKEV2: &str = "WAN Miniport (IKEv2)";

/// Name of the built-in policy
pub const POLICY_IKEV2_EAP: &str = "ikev2-eap";

/// Network protocols negotiated over the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkProtocol {
    Ip,
    Ipv6,
}

/// Connection security and presentation options (RASEO_*)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityOption {
    /// Route all IPv4 traffic through the tunnel
    RemoteDefaultGateway,
    RequireEncryption,
    /// Require extensible authentication
    RequireEap,
    ShowDialingProgress,
    PreviewDomain,
    PreviewUserPassword,
}

/// Secondary entry options (RASEO2_*)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryOption {
    DisableMultilink,
    /// Redial automatically when the underlying path is lost
    ReconnectIfDropped,
    Ipv6RemoteDefaultGateway,
    CacheCredentials,
}

/// Tunneling protocol preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VpnStrategy {
    Default,
    PptpOnly,
    PptpFirst,
    L2tpOnly,
    L2tpFirst,
    SstpOnly,
    SstpFirst,
    Ikev2Only,
    Ikev2First,
}

impl VpnStrategy {
    /// Numeric value used by the remote-access service
    pub fn as_raw(self) -> u32 {
        match self {
            VpnStrategy::Default => 0,
            VpnStrategy::PptpOnly => 1,
            VpnStrategy::PptpFirst => 2,
            VpnStrategy::L2tpOnly => 3,
            VpnStrategy::L2tpFirst => 4,
            VpnStrategy::SstpOnly => 5,
            VpnStrategy::SstpFirst => 6,
            VpnStrategy::Ikev2Only => 7,
            VpnStrategy::Ikev2First => 8,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => VpnStrategy::Default,
            1 => VpnStrategy::PptpOnly,
            2 => VpnStrategy::PptpFirst,
            3 => VpnStrategy::L2tpOnly,
            4 => VpnStrategy::L2tpFirst,
            5 => VpnStrategy::SstpOnly,
            6 => VpnStrategy::SstpFirst,
            7 => VpnStrategy::Ikev2Only,
            8 => VpnStrategy::Ikev2First,
            _ => return None,
        })
    }
}

impl fmt::Display for VpnStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VpnStrategy::Default => "default",
            VpnStrategy::PptpOnly => "pptp-only",
            VpnStrategy::PptpFirst => "pptp-first",
            VpnStrategy::L2tpOnly => "l2tp-only",
            VpnStrategy::L2tpFirst => "l2tp-first",
            VpnStrategy::SstpOnly => "sstp-only",
            VpnStrategy::SstpFirst => "sstp-first",
            VpnStrategy::Ikev2Only => "ikev2-only",
            VpnStrategy::Ikev2First => "ikev2-first",
        };
        f.write_str(name)
    }
}

/// Automatic redial behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedialPolicy {
    pub count: u32,
    pub pause_seconds: u32,
}

impl Default for RedialPolicy {
    fn default() -> Self {
        Self {
            count: 3,
            pause_seconds: 30,
        }
    }
}

/// Settings applied to every profile created through a `ProfileStore`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilePolicy {
    pub network_protocols: BTreeSet<NetworkProtocol>,
    pub security_options: BTreeSet<SecurityOption>,
    pub entry_options: BTreeSet<EntryOption>,
    pub strategy: VpnStrategy,
    pub device_type: String,
    pub device_name: String,
    pub redial: RedialPolicy,
}

impl ProfilePolicy {
    /// IKEv2 only, EAP authentication, encrypted, auto-reconnecting with
    /// cached credentials; redials 3 times with 30 second pauses.
    pub fn ikev2_eap() -> Self {
        Self {
            network_protocols: BTreeSet::from([NetworkProtocol::Ip]),
            security_options: BTreeSet::from([
                SecurityOption::RemoteDefaultGateway,
                SecurityOption::RequireEncryption,
                SecurityOption::RequireEap,
                SecurityOption::ShowDialingProgress,
                SecurityOption::PreviewDomain,
                SecurityOption::PreviewUserPassword,
            ]),
            entry_options: BTreeSet::from([
                EntryOption::DisableMultilink,
                EntryOption::ReconnectIfDropped,
                EntryOption::Ipv6RemoteDefaultGateway,
                EntryOption::CacheCredentials,
            ]),
            strategy: VpnStrategy::Ikev2Only,
            device_type: DEVICE_TYPE_VPN.to_string(),
            device_name: DEVICE_NAME_IKEV2.to_string(),
            redial: RedialPolicy::default(),
        }
    }

    /// Resolve a built-in policy by name
    pub fn named(name: &str) -> RasctlResult<Self> {
        match name {
            POLICY_IKEV2_EAP => Ok(Self::ikev2_eap()),
            other => Err(RasctlError::ConfigError(format!("Unknown profile policy '{}'", other))),
        }
    }

    pub fn validate(&self) -> RasctlResult<()> {
        if !self.network_protocols.contains(&NetworkProtocol::Ip) {
            return Err(RasctlError::ConfigError(
                "Profile policy must include the ip network protocol".to_string(),
            ));
        }
        if self.device_type.trim().is_empty() || self.device_name.trim().is_empty() {
            return Err(RasctlError::ConfigError(
                "Profile policy requires a device type and device name".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ProfilePolicy {
    fn default() -> Self {
        Self::ikev2_eap()
    }
}

/// A dial entry as stored in a phone book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnProfile {
    pub name: String,
    pub server_address: String,
    pub device_type: String,
    pub device_name: String,
    pub network_protocols: BTreeSet<NetworkProtocol>,
    pub security_options: BTreeSet<SecurityOption>,
    pub entry_options: BTreeSet<EntryOption>,
    pub strategy: VpnStrategy,
    pub redial: RedialPolicy,
}

impl VpnProfile {
    pub fn from_policy(name: &str, server_address: &str, policy: &ProfilePolicy) -> Self {
        Self {
            name: name.to_string(),
            server_address: server_address.to_string(),
            device_type: policy.device_type.clone(),
            device_name: policy.device_name.clone(),
            network_protocols: policy.network_protocols.clone(),
            security_options: policy.security_options.clone(),
            entry_options: policy.entry_options.clone(),
            strategy: policy.strategy,
            redial: policy.redial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_ikev2_eap() {
        let policy = ProfilePolicy::default();
        assert_eq!(policy, ProfilePolicy::named(POLICY_IKEV2_EAP).unwrap());
        assert_eq!(policy.strategy, VpnStrategy::Ikev2Only);
        assert_eq!(policy.redial, RedialPolicy { count: 3, pause_seconds: 30 });
        assert!(policy.security_options.contains(&SecurityOption::RequireEap));
        assert!(policy.entry_options.contains(&EntryOption::CacheCredentials));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_unknown_policy_name() {
        assert!(ProfilePolicy::named("pptp-legacy").is_err());
    }

    #[test]
    fn test_policy_requires_ip() {
        let mut policy = ProfilePolicy::ikev2_eap();
        policy.network_protocols = BTreeSet::from([NetworkProtocol::Ipv6]);
        assert!(policy.validate().is_err());

        let mut policy = ProfilePolicy::ikev2_eap();
        policy.device_name = " ".to_string();
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_strategy_raw_values() {
        assert_eq!(VpnStrategy::Ikev2Only.as_raw(), 7);
        assert_eq!(VpnStrategy::from_raw(7), Some(VpnStrategy::Ikev2Only));
        assert_eq!(VpnStrategy::from_raw(0), Some(VpnStrategy::Default));
        assert_eq!(VpnStrategy::from_raw(42), None);
        assert_eq!(VpnStrategy::SstpFirst.to_string(), "sstp-first");
    }

    #[test]
    fn test_policy_from_partial_toml() {
        let policy: ProfilePolicy = toml::from_str(
            r#"
            strategy = "ikev2-first"

            [redial]
            count = 5
            pause_seconds = 10
            "#,
        )
        .unwrap();

        assert_eq!(policy.strategy, VpnStrategy::Ikev2First);
        assert_eq!(policy.redial.count, 5);
        // Unset fields keep the built-in policy values
        assert_eq!(policy.device_name, DEVICE_NAME_IKEV2);
        assert!(policy.network_protocols.contains(&NetworkProtocol::Ip));
    }

    #[test]
    fn test_profile_from_policy() {
        let policy = ProfilePolicy::ikev2_eap();
        let profile = VpnProfile::from_policy("corp-vpn", "203.0.113.5", &policy);
        assert_eq!(profile.name, "corp-vpn");
        assert_eq!(profile.server_address, "203.0.113.5");
        assert_eq!(profile.device_type, DEVICE_TYPE_VPN);
        assert_eq!(profile.strategy, policy.strategy);
        assert_eq!(profile.security_options, policy.security_options);
    }
}
