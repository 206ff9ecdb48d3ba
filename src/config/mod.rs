//! Runtime configuration.
//!
//! [`Config`] is built once at startup by [`Config::resolve`] and handed by
//! reference to every component. Nothing below the CLI reads the environment
//! on its own.
//!
//! # Configuration directory
//!
//! Lock files and the optional `config.toml` live in `<home>/.<executable>`,
//! e.g. `~/.picam-streamer`. The directory can be moved with `--config-dir`
//! or `PICAM_CONFIG_DIR`. Failing to resolve or create it aborts startup with
//! [`PicamError::Config`].

mod global;

pub use global::GlobalConfig;

use crate::constants::CREDENTIALS_FILE_NAME;
use crate::core::PicamError;
use crate::git::uri;
use crate::upgrade::config::UpgradeConfig;
use crate::utils::platform::{Platform, ensure_dir, get_home_dir};
use crate::version::VersionInfo;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything an upgrade attempt needs to know about its environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-binary configuration directory holding lock files
    pub config_dir: PathBuf,
    /// Version of the running binary
    pub version: VersionInfo,
    /// Normalized URI of the repository releases are published from
    pub repository: String,
    /// Platform used to select release assets
    pub platform: Platform,
    /// Git credential store
    pub credentials_path: PathBuf,
    /// SSH agent socket, captured from `SSH_AUTH_SOCK` at startup
    pub ssh_auth_sock: Option<PathBuf>,
    /// Upgrade settings from `config.toml`
    pub upgrade: UpgradeConfig,
    /// Whether download progress bars are drawn
    pub show_progress: bool,
}

impl Config {
    /// Assemble a configuration from already resolved parts.
    ///
    /// The repository comes from `upgrade.repository` when set, otherwise
    /// from the build-time source of `version`.
    pub fn new(
        config_dir: PathBuf,
        home_dir: &Path,
        version: VersionInfo,
        upgrade: UpgradeConfig,
    ) -> Self {
        let source = upgrade.repository.clone().unwrap_or_else(|| version.source().to_string());
        let credentials_path = upgrade
            .credentials_path
            .clone()
            .unwrap_or_else(|| home_dir.join(CREDENTIALS_FILE_NAME));

        Self {
            config_dir,
            repository: uri::normalize(&source),
            version: version.with_source(source),
            platform: Platform::current(),
            credentials_path,
            ssh_auth_sock: None,
            upgrade,
            show_progress: false,
        }
    }

    /// Resolve the configuration of this process.
    ///
    /// `config_dir` overrides `<home>/.<executable>`.
    pub async fn resolve(config_dir: Option<PathBuf>) -> Result<Self> {
        let home_dir = get_home_dir().map_err(config_error)?;

        let config_dir = match config_dir {
            Some(dir) => dir,
            None => {
                let executable = std::env::current_exe().map_err(|e| PicamError::Config {
                    message: format!("cannot locate the running executable: {e}"),
                })?;
                config_dir_for(&home_dir, &executable)?
            }
        };

        ensure_dir(&config_dir).map_err(config_error)?;
        debug!("Configuration directory: {}", config_dir.display());

        let settings = GlobalConfig::load(&config_dir).await.map_err(config_error)?;

        let mut config = Self::new(config_dir, &home_dir, VersionInfo::from_build(), settings.upgrade);
        config.ssh_auth_sock = std::env::var_os("SSH_AUTH_SOCK").map(PathBuf::from);
        Ok(config)
    }

    /// Path of the lock file `name` inside the configuration directory.
    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.config_dir.join(name)
    }

    /// Name of the executable inside release archives.
    pub fn binary_name(&self) -> Result<String> {
        match &self.upgrade.binary_name {
            Some(name) => Ok(name.clone()),
            None => uri::repository_name(&self.repository),
        }
    }
}

/// `<home>/.<executable stem>`
pub fn config_dir_for(home_dir: &Path, executable: &Path) -> Result<PathBuf> {
    let stem = executable.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
        PicamError::Config {
            message: format!("cannot derive a name from executable {}", executable.display()),
        }
    })?;

    Ok(home_dir.join(format!(".{stem}")))
}

fn config_error(error: anyhow::Error) -> anyhow::Error {
    PicamError::Config {
        message: format!("{error:#}"),
    }
    .into()
}
