//! Self-update engine.
//!
//! The installed binary replaces itself with the latest release published on
//! its source repository. One invocation performs at most one attempt:
//!
//! ```text
//! 1. Release listing ([`release::ReleaseCatalog`])
//!    ├── skipped while the network or anonymous rate-limit lease holds
//!    └── latest release under the stability policy
//!
//! 2. Decision
//!    ├── running version already released   -> up to date
//!    └── --dry-run                           -> report only
//!
//! 3. Installation, inside a fresh scratch directory
//!    ├── download the platform archive         ([`download::ArtifactFetcher`])
//!    ├── verify it against a published checksum ([`verification::IntegrityVerifier`])
//!    ├── extract it                             ([`archive::ArchiveExtractor`])
//!    └── swap the executable                    ([`swap::BinarySwapper`])
//! ```
//!
//! Network failures never fail an attempt: they set a lease and the attempt
//! ends as [`UpgradeOutcome::Throttled`]. A checksum mismatch, an unsafe
//! archive entry or a failed swap always does. The swap renames a staged copy
//! over the installed binary, so a swap that fails leaves it untouched.
//!
//! # Release layout
//!
//! Archives are `.tar.gz` files whose name carries OS and architecture
//! tokens, with an optional checksum file next to them:
//!
//! ```text
//! picam-streamer_linux_arm.tar.gz
//! picam-streamer_linux_arm.tar.gz.md5
//! picam-streamer_darwin_arm64.tar.gz
//! ```

/// `[upgrade]` settings.
pub mod config;

/// `.tar.gz` extraction with path traversal protection.
pub mod archive;

/// HTTP download of release assets.
pub mod download;

/// Release model and the provider catalog.
pub mod release;

/// The upgrade state machine.
pub mod self_updater;

/// Rename-into-place replacement of the executable.
pub mod swap;

/// Chunked checksums of downloaded archives.
pub mod verification;

pub use release::{Asset, Release, ReleaseCatalog, latest};
pub use self_updater::{SelfUpdater, UpgradeOptions, UpgradeOutcome, UpgradePlan, UpgradeState};
