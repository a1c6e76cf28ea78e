//! Configuration management for rasctl

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{RasctlError, RasctlResult};
use crate::ras::ProfilePolicy;

/// Main rasctl configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasctlConfig {
    /// Phone book used when none is given on the command line
    #[serde(default = "default_phonebook")]
    pub phonebook: PathBuf,
    /// Settings applied to newly created profiles
    #[serde(default)]
    pub policy: ProfilePolicy,
    /// Connect-and-wait settings
    #[serde(default)]
    pub wait: WaitSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSettings {
    /// How long to wait for a dialed connection to come up (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Delay between status polls (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_phonebook() -> PathBuf {
    PathBuf::from(r"C:\ProgramData\Microsoft\Network\Connections\Pbk\rasphone.pbk")
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WaitSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for RasctlConfig {
    fn default() -> Self {
        Self {
            phonebook: default_phonebook(),
            policy: ProfilePolicy::default(),
            wait: WaitSettings::default(),
        }
    }
}

impl RasctlConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> RasctlResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RasctlError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| RasctlError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> RasctlResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RasctlError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| RasctlError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> RasctlResult<()> {
        self.policy.validate()?;
        if self.wait.poll_interval_ms == 0 {
            return Err(RasctlError::ConfigError(
                "wait.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
