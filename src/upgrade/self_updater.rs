use crate::config::Config;
use crate::core::{PicamError, SwapStep};
use crate::upgrade::archive::ArchiveExtractor;
use crate::upgrade::download::ArtifactFetcher;
use crate::upgrade::release::{Asset, Release, ReleaseCatalog, latest};
use crate::upgrade::swap::{BinarySwapper, Swap};
use crate::upgrade::verification::{ChecksumAlgorithm, IntegrityVerifier};
use crate::utils::platform::Platform;
use crate::version::VersionInfo;
use anyhow::{Context, Result, bail};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Stage of an upgrade attempt.
///
/// ```text
/// Idle -> Throttled
///      -> CatalogFetched -> UpToDate
///                        -> DryRun
///                        -> Downloading -> Verifying -> Extracting -> Swapping -> Done
/// ```
///
/// Any stage may end in `Failed`. `Throttled`, `UpToDate` and `DryRun` end
/// the attempt without touching the filesystem beyond lock files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeState {
    Idle,
    Throttled,
    CatalogFetched,
    UpToDate,
    DryRun,
    Downloading,
    Verifying,
    Extracting,
    Swapping,
    Done,
    Failed,
}

/// How an upgrade attempt is allowed to proceed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpgradeOptions {
    /// Report what would be installed without downloading anything
    pub dry_run: bool,
    /// Install the latest release even when it is already running
    pub force: bool,
    /// Consider prereleases when picking the latest release
    pub allow_prerelease: bool,
}

/// Successful end of an upgrade attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// No release information could be obtained, nothing was attempted
    Throttled { reason: String },
    /// The running binary is the latest release
    UpToDate { version: String },
    /// Dry run: the release that would be installed
    DryRun {
        from: String,
        to: String,
        target: PathBuf,
        asset: Option<String>,
    },
    /// The installed binary was replaced
    Upgraded {
        from: String,
        to: String,
        target: PathBuf,
    },
}

impl fmt::Display for UpgradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Throttled { reason } => write!(f, "upgrade skipped: {reason}"),
            Self::UpToDate { version } => write!(f, "already running the latest version {version}"),
            Self::DryRun { from, to, target, .. } => {
                write!(f, "would replace {} ({from}) with {to}", target.display())
            }
            Self::Upgraded { from, to, target } => {
                write!(f, "upgraded {} from {from} to {to}", target.display())
            }
        }
    }
}

/// Release and assets selected for installation.
#[derive(Debug)]
pub struct UpgradePlan {
    pub current: VersionInfo,
    pub release: Release,
    pub binary_asset: Asset,
    pub checksum_asset: Option<Asset>,
    /// Installed executable to replace
    pub target: PathBuf,
    /// Holds the downloaded archive and its extracted content, removed
    /// when the plan is dropped
    pub scratch: TempDir,
}

/// Drives a single upgrade attempt of the installed executable.
///
/// # Examples
///
/// ```rust,no_run
/// use picam_streamer::config::Config;
/// use picam_streamer::upgrade::{SelfUpdater, UpgradeOptions};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::resolve(None).await?;
/// let mut updater = SelfUpdater::new(&config)?.with_options(UpgradeOptions {
///     dry_run: true,
///     ..UpgradeOptions::default()
/// });
/// println!("{}", updater.run().await?);
/// # Ok(())
/// # }
/// ```
pub struct SelfUpdater {
    catalog: ReleaseCatalog,
    fetcher: ArtifactFetcher,
    version: VersionInfo,
    platform: Platform,
    binary_name: String,
    target: Option<PathBuf>,
    swapper: Arc<dyn Swap>,
    options: UpgradeOptions,
    state: UpgradeState,
}

impl SelfUpdater {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            catalog: ReleaseCatalog::new(config)?,
            fetcher: ArtifactFetcher::new(config)?,
            version: config.version.clone(),
            platform: config.platform.clone(),
            binary_name: config.binary_name()?,
            target: None,
            swapper: Arc::new(BinarySwapper),
            options: UpgradeOptions::default(),
            state: UpgradeState::Idle,
        })
    }

    #[must_use]
    pub fn with_options(mut self, options: UpgradeOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace `target` instead of the running executable.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Override the platform used to select assets.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Install through `swapper` instead of [`BinarySwapper`].
    #[must_use]
    pub fn with_swapper(mut self, swapper: impl Swap + 'static) -> Self {
        self.swapper = Arc::new(swapper);
        self
    }

    pub fn state(&self) -> UpgradeState {
        self.state
    }

    pub fn current_version(&self) -> &VersionInfo {
        &self.version
    }

    /// Whether the running binary matches the latest stable release.
    pub async fn check(&self) -> Result<bool> {
        self.catalog.in_sync(&self.version).await
    }

    /// Run the upgrade attempt to completion.
    ///
    /// Unreachable or throttled release listings end in
    /// [`UpgradeOutcome::Throttled`]. Integrity, security and swap failures
    /// are returned as errors and leave the state at [`UpgradeState::Failed`].
    pub async fn run(&mut self) -> Result<UpgradeOutcome> {
        match self.attempt().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.transition(UpgradeState::Failed);
                Err(e)
            }
        }
    }

    async fn attempt(&mut self) -> Result<UpgradeOutcome> {
        let releases = match self.catalog.list_releases().await {
            Ok(releases) => releases,
            Err(e) if PicamError::find(&e).is_some_and(PicamError::is_transient) => {
                warn!("Failed to list releases of {}: {e:#}", self.catalog.repository());
                self.transition(UpgradeState::Throttled);
                return Ok(UpgradeOutcome::Throttled {
                    reason: "release provider unreachable".to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        if releases.is_empty() {
            self.transition(UpgradeState::Throttled);
            return Ok(UpgradeOutcome::Throttled {
                reason: "no release information available".to_string(),
            });
        }
        self.transition(UpgradeState::CatalogFetched);

        let Some(release) = latest(&releases, self.options.allow_prerelease) else {
            info!("No eligible release for {}", self.catalog.repository());
            return Ok(self.up_to_date());
        };

        if !self.options.force {
            if self.version.is_dev_build() {
                info!("Development build, not replacing it without --force");
                return Ok(self.up_to_date());
            }
            if self.version.matches_tag(&release.tag) {
                return Ok(self.up_to_date());
            }
        }

        let target = self.target_path()?;
        let binary_asset = release.binary_asset(&self.platform).cloned();

        if self.options.dry_run {
            self.transition(UpgradeState::DryRun);
            return Ok(UpgradeOutcome::DryRun {
                from: self.version.semver().to_string(),
                to: release.tag.clone(),
                target,
                asset: binary_asset.map(|asset| asset.name),
            });
        }

        let Some(binary_asset) = binary_asset else {
            return Err(PicamError::NoMatchingAsset {
                tag: release.tag.clone(),
                os: self.platform.os.clone(),
                arch: self.platform.arch.clone(),
            }
            .into());
        };

        let scratch = tempfile::Builder::new()
            .prefix("picam-upgrade-")
            .tempdir()
            .context("Failed to create scratch directory")?;
        debug!("Scratch directory {}", scratch.path().display());

        let plan = UpgradePlan {
            current: self.version.clone(),
            release: release.clone(),
            checksum_asset: release.checksum_asset(&self.platform).cloned(),
            binary_asset,
            target,
            scratch,
        };
        self.execute(plan).await
    }

    /// Download, verify, extract and install `plan`.
    pub async fn execute(&mut self, plan: UpgradePlan) -> Result<UpgradeOutcome> {
        info!(
            "Upgrading {} from {} to {}",
            plan.target.display(),
            plan.current.semver(),
            plan.release.tag
        );

        self.transition(UpgradeState::Downloading);
        let archive = plan.scratch.path().join(&plan.binary_asset.name);
        self.fetcher.download_to(&plan.binary_asset.download_url, &archive).await?;

        self.transition(UpgradeState::Verifying);
        match &plan.checksum_asset {
            Some(checksum_asset) => {
                let algorithm = ChecksumAlgorithm::from_asset_name(&checksum_asset.name)
                    .unwrap_or(ChecksumAlgorithm::Md5);
                let published = self.fetcher.download_text(&checksum_asset.download_url).await?;
                IntegrityVerifier::verify_file(
                    &archive,
                    &plan.binary_asset.name,
                    algorithm,
                    &published,
                )
                .await?;
            }
            None => warn!(
                "Release {} publishes no checksum for {}, skipping verification",
                plan.release.tag, plan.binary_asset.name
            ),
        }

        self.transition(UpgradeState::Extracting);
        let extract_dir = plan.scratch.path().join("extracted");
        {
            let archive = archive.clone();
            let extract_dir = extract_dir.clone();
            tokio::task::spawn_blocking(move || ArchiveExtractor::extract(&archive, &extract_dir))
                .await
                .context("Archive extraction task failed")??;
        }
        let binary = locate_binary(&extract_dir, &self.binary_name)
            .with_context(|| format!("Invalid release archive {}", plan.binary_asset.name))?;

        self.transition(UpgradeState::Swapping);
        self.swap(binary, plan.target.clone()).await?;

        self.transition(UpgradeState::Done);
        if let Err(e) = plan.scratch.close() {
            warn!("Failed to remove scratch directory: {e}");
        }

        Ok(UpgradeOutcome::Upgraded {
            from: plan.current.semver().to_string(),
            to: plan.release.tag,
            target: plan.target,
        })
    }

    /// Install `binary` over `target`.
    ///
    /// A failure after the target was replaced, while removing the extracted
    /// copy, only warns.
    async fn swap(&self, binary: PathBuf, target: PathBuf) -> Result<()> {
        let swapper = Arc::clone(&self.swapper);
        let result = tokio::task::spawn_blocking(move || swapper.replace(&binary, &target))
            .await
            .context("Binary swap task failed")?;

        let Err(e) = result else {
            return Ok(());
        };

        if let Some(PicamError::Swap {
            step: SwapStep::RemoveSource,
            ..
        }) = PicamError::find(&e)
        {
            warn!("New binary installed, leaving extracted copy behind: {e:#}");
            return Ok(());
        }

        error!("Binary swap failed: {e:#}");
        Err(e)
    }

    fn target_path(&self) -> Result<PathBuf> {
        match &self.target {
            Some(target) => Ok(target.clone()),
            None => std::env::current_exe().context("Failed to locate the running executable"),
        }
    }

    fn up_to_date(&mut self) -> UpgradeOutcome {
        self.transition(UpgradeState::UpToDate);
        UpgradeOutcome::UpToDate {
            version: self.version.semver().to_string(),
        }
    }

    fn transition(&mut self, next: UpgradeState) {
        debug!("Upgrade state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Find `binary_name` in an extracted release archive.
///
/// The top level is checked first, then the whole tree.
pub fn locate_binary(extract_dir: &Path, binary_name: &str) -> Result<PathBuf> {
    let candidates = [binary_name.to_string(), format!("{binary_name}.exe")];

    for candidate in &candidates {
        let path = extract_dir.join(candidate);
        if path.is_file() {
            return Ok(path);
        }
    }

    for entry in WalkDir::new(extract_dir).min_depth(1).into_iter().filter_map(Result::ok) {
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| candidates.iter().any(|candidate| candidate == name));
        if matches && entry.file_type().is_file() {
            debug!("Found binary at {}", entry.path().display());
            return Ok(entry.into_path());
        }
    }

    bail!("No {binary_name} binary found in {}", extract_dir.display())
}
