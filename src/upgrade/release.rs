//! Published releases and the catalog listing them.
//!
//! The catalog talks to the GitHub releases API
//! (`GET {api_url}/repos/{owner}/{repo}/releases`) and protects it with two
//! independent leases in the configuration directory:
//!
//! - `network-problems` is set for a short cooldown whenever a listing fails,
//!   and while it holds no listing is attempted.
//! - `binary-sync` throttles anonymous listings. It is set *before* the
//!   request goes out, so a crash mid-request still counts against the quota.
//!
//! A lease that holds makes [`ReleaseCatalog::list_releases`] return an empty
//! list. Callers read an empty list as "nothing to do".

use crate::config::Config;
use crate::constants::{
    BINARY_SYNC_LOCK_DESCRIPTION, BINARY_SYNC_LOCK_NAME, NETWORK_LOCK_DESCRIPTION,
    NETWORK_LOCK_NAME, USER_AGENT,
};
use crate::core::PicamError;
use crate::git::CredentialResolver;
use crate::git::uri;
use crate::lock::LockStore;
use crate::upgrade::verification::ChecksumAlgorithm;
use crate::utils::platform::Platform;
use crate::version::VersionInfo;
use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A tagged release with its downloadable assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

impl Release {
    /// The archive published for `platform`, checksum files excluded.
    pub fn binary_asset(&self, platform: &Platform) -> Option<&Asset> {
        self.assets.iter().find(|asset| {
            platform.matches_asset(&asset.name)
                && ChecksumAlgorithm::from_asset_name(&asset.name).is_none()
        })
    }

    /// The checksum file published for `platform`.
    pub fn checksum_asset(&self, platform: &Platform) -> Option<&Asset> {
        self.assets.iter().find(|asset| {
            platform.matches_asset(&asset.name)
                && ChecksumAlgorithm::from_asset_name(&asset.name).is_some()
        })
    }
}

/// First release of `releases` allowed by the stability policy.
///
/// Releases are expected newest first, as the provider returns them. A
/// prerelease is only returned when prereleases are allowed, and stable
/// releases are returned regardless of their position.
pub fn latest(releases: &[Release], allow_prerelease: bool) -> Option<&Release> {
    releases.iter().find(|release| !release.prerelease || allow_prerelease)
}

/// Lists releases of the configured repository.
pub struct ReleaseCatalog {
    repository: String,
    api_url: String,
    network_lock: PathBuf,
    network_cooldown: Duration,
    sync_lock: PathBuf,
    sync_cooldown: Duration,
    credentials: CredentialResolver,
    client: reqwest::Client,
}

impl ReleaseCatalog {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.upgrade.api_timeout())
            .build()
            .context("Failed to build release API client")?;

        Ok(Self {
            repository: config.repository.clone(),
            api_url: config.upgrade.api_url.trim_end_matches('/').to_string(),
            network_lock: config.lock_path(NETWORK_LOCK_NAME),
            network_cooldown: config.upgrade.network_cooldown(),
            sync_lock: config.lock_path(BINARY_SYNC_LOCK_NAME),
            sync_cooldown: config.upgrade.binary_sync_cooldown(),
            credentials: CredentialResolver::from_config(config),
            client,
        })
    }

    /// Normalized URI of the repository being listed.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Releases of the repository, newest first.
    ///
    /// Returns an empty list without any request while a lease holds. A
    /// failed request sets the network lease and returns
    /// [`PicamError::Network`]. A broken credential store returns
    /// [`PicamError::AuthResolution`].
    pub async fn list_releases(&self) -> Result<Vec<Release>> {
        if lease_holds(&self.network_lock).await {
            info!("Skipping release check, network lock active at {}", self.network_lock.display());
            return Ok(Vec::new());
        }

        debug!("Binary repository uri {}", self.repository);
        let auth = self.credentials.auth_method_for(&self.repository).await?;
        let token = auth.bearer_token();

        if token.is_none() {
            if lease_holds(&self.sync_lock).await {
                info!(
                    "Skipping anonymous release check, rate limit lock active at {}",
                    self.sync_lock.display()
                );
                return Ok(Vec::new());
            }
            if let Err(e) =
                set_lease(&self.sync_lock, BINARY_SYNC_LOCK_DESCRIPTION, self.sync_cooldown).await
            {
                warn!("Failed to set rate limit lock: {e:#}");
            }
        }

        let (owner, repo) = uri::owner_and_repository(&self.repository)?;
        let url = format!("{}/repos/{owner}/{repo}/releases", self.api_url);
        debug!("List releases for {owner}/{repo} ({auth:?})");

        match self.fetch(&url, token).await {
            Ok(releases) => {
                debug!("Found {} release(s)", releases.len());
                Ok(releases)
            }
            Err(e) => {
                if let Err(lock_error) =
                    set_lease(&self.network_lock, NETWORK_LOCK_DESCRIPTION, self.network_cooldown)
                        .await
                {
                    warn!("Failed to set network lock: {lock_error:#}");
                }
                Err(e)
            }
        }
    }

    async fn fetch(&self, url: &str, token: Option<&str>) -> Result<Vec<Release>> {
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| PicamError::Network {
            url: url.to_string(),
            reason: e.to_string(),
            status: None,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PicamError::Network {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
                status: Some(status.as_u16()),
            }
            .into());
        }

        response.json::<Vec<Release>>().await.map_err(|e| {
            PicamError::Network {
                url: url.to_string(),
                reason: format!("invalid release list: {e}"),
                status: Some(status.as_u16()),
            }
            .into()
        })
    }

    /// Whether the running binary needs no upgrade.
    ///
    /// Development builds, an unreachable catalog and a repository without
    /// stable releases all count as in sync.
    pub async fn in_sync(&self, version: &VersionInfo) -> Result<bool> {
        if version.is_dev_build() {
            debug!("Development build, skipping release check");
            return Ok(true);
        }

        let releases = match self.list_releases().await {
            Ok(releases) => releases,
            Err(e) if PicamError::find(&e).is_some_and(PicamError::is_transient) => {
                warn!("Failed to list binary releases: {e:#}");
                return Ok(true);
            }
            Err(e) => return Err(e),
        };

        match latest(&releases, false) {
            Some(release) => Ok(version.matches_tag(&release.tag)),
            None => {
                warn!("No release was found for repository {}", self.repository);
                Ok(true)
            }
        }
    }
}

async fn lease_holds(path: &Path) -> bool {
    on_lock_store(path, LockStore::is_active).await.unwrap_or_else(|e| {
        warn!("Ignoring unreadable lock: {e:#}");
        false
    })
}

async fn set_lease(path: &Path, description: &'static str, duration: Duration) -> Result<()> {
    on_lock_store(path, move |path| LockStore::set_temporary(path, description, duration)).await
}

/// Run a blocking [`LockStore`] operation on the blocking thread pool.
async fn on_lock_store<T, F>(path: &Path, operation: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> Result<T> + Send + 'static,
{
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || operation(&path))
        .await
        .context("Lock task failed")?
}
