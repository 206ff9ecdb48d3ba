use crate::constants::{
    API_TIMEOUT, BINARY_SYNC_COOLDOWN, DEFAULT_API_URL, DOWNLOAD_TIMEOUT, MAX_CONFIGURED_DURATION,
    NETWORK_COOLDOWN,
};
use anyhow::{Result, bail};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// `[upgrade]` section of `config.toml`.
///
/// Every field is optional in the file:
///
/// ```toml
/// [upgrade]
/// repository = "git@github.com:ylallemant/go-picam-streamer.git"
/// api_url = "https://api.github.com"
/// binary_name = "picam-streamer"
/// api_timeout_secs = 5
/// download_timeout_secs = 300
/// network_cooldown_secs = 120
/// binary_sync_cooldown_secs = 1800
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpgradeConfig {
    /// Repository releases are published from, overriding the build-time source.
    #[serde(default)]
    pub repository: Option<String>,

    /// Base URL of the release API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Name of the binary inside release archives, defaults to the repository name.
    #[serde(default)]
    pub binary_name: Option<String>,

    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,

    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Back-off after a failed release listing.
    #[serde(default = "default_network_cooldown_secs")]
    pub network_cooldown_secs: u64,

    /// Minimum interval between anonymous release listings.
    #[serde(default = "default_binary_sync_cooldown_secs")]
    pub binary_sync_cooldown_secs: u64,

    /// Git credential store, defaults to `~/.git-credentials`.
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            repository: None,
            api_url: default_api_url(),
            binary_name: None,
            api_timeout_secs: default_api_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            network_cooldown_secs: default_network_cooldown_secs(),
            binary_sync_cooldown_secs: default_binary_sync_cooldown_secs(),
            credentials_path: None,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_api_timeout_secs() -> u64 {
    API_TIMEOUT.as_secs()
}

fn default_download_timeout_secs() -> u64 {
    DOWNLOAD_TIMEOUT.as_secs()
}

fn default_network_cooldown_secs() -> u64 {
    NETWORK_COOLDOWN.as_secs()
}

fn default_binary_sync_cooldown_secs() -> u64 {
    BINARY_SYNC_COOLDOWN.as_secs()
}

impl UpgradeConfig {
    /// Reject timeouts of zero and durations beyond [`MAX_CONFIGURED_DURATION`].
    pub fn validate(&self) -> Result<()> {
        let max = MAX_CONFIGURED_DURATION.as_secs();
        let durations = [
            ("api_timeout_secs", self.api_timeout_secs, 1),
            ("download_timeout_secs", self.download_timeout_secs, 1),
            ("network_cooldown_secs", self.network_cooldown_secs, 0),
            ("binary_sync_cooldown_secs", self.binary_sync_cooldown_secs, 0),
        ];

        for (field, value, min) in durations {
            if !(min..=max).contains(&value) {
                bail!("upgrade.{field} must be between {min} and {max} seconds, got {value}");
            }
        }
        Ok(())
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn network_cooldown(&self) -> Duration {
        Duration::from_secs(self.network_cooldown_secs)
    }

    pub fn binary_sync_cooldown(&self) -> Duration {
        Duration::from_secs(self.binary_sync_cooldown_secs)
    }
}
