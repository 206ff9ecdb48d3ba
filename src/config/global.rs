//! Optional settings file stored in the configuration directory.
//!
//! `<config-dir>/config.toml` is read once at startup. A missing file means
//! defaults everywhere.
//!
//! ```toml
//! [upgrade]
//! repository = "git@github.com:ylallemant/go-picam-streamer.git"
//! network_cooldown_secs = 300
//! ```

use crate::constants::SETTINGS_FILE_NAME;
use crate::upgrade::config::UpgradeConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GlobalConfig {
    /// Self-update behaviour.
    #[serde(default)]
    pub upgrade: UpgradeConfig,
}

impl GlobalConfig {
    /// Location of the settings file inside `config_dir`.
    pub fn path_in(config_dir: &Path) -> PathBuf {
        config_dir.join(SETTINGS_FILE_NAME)
    }

    /// Load the settings file of `config_dir`, or defaults when absent.
    pub async fn load(config_dir: &Path) -> Result<Self> {
        let path = Self::path_in(config_dir);
        if path.exists() {
            Self::load_from(&path).await
        } else {
            debug!("No settings file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;
        settings
            .upgrade
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        Ok(settings)
    }
}
