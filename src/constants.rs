//! Global constants used by the update engine.
//!
//! Lease durations, client timeouts, well-known file names and build-time
//! defaults live here so that every component reads the same values.

use std::time::Duration;

/// Lock file backing off release API calls after a transport failure.
pub const NETWORK_LOCK_NAME: &str = "network-problems";

/// Lock file throttling anonymous release API calls.
pub const BINARY_SYNC_LOCK_NAME: &str = "binary-sync";

/// Advisory text written into the network lock.
pub const NETWORK_LOCK_DESCRIPTION: &str = "lock used to mitigate network connectivity problems";

/// Advisory text written into the binary-sync lock.
pub const BINARY_SYNC_LOCK_DESCRIPTION: &str =
    "lock used to mitigate Git provider request limits. Use a personal access token to enable more requests";

/// Cooldown after a failed release listing (2 minutes).
pub const NETWORK_COOLDOWN: Duration = Duration::from_secs(120);

/// Cooldown between two anonymous release listings (30 minutes).
///
/// Anonymous GitHub API usage is limited to 60 requests per hour and per IP,
/// which is shared by every device behind the same NAT.
pub const BINARY_SYNC_COOLDOWN: Duration = Duration::from_secs(30 * 60);

/// Timeout of the release API client (5 seconds).
pub const API_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout of artifact downloads (5 minutes).
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound of any timeout or cooldown read from the settings file (1 year).
pub const MAX_CONFIGURED_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Read buffer size used when hashing downloaded artifacts.
pub const CHECKSUM_CHUNK_SIZE: usize = 4096;

/// Default release API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Name of the optional settings file inside the configuration directory.
pub const SETTINGS_FILE_NAME: &str = "config.toml";

/// Name of the git credential store inside the home directory.
pub const CREDENTIALS_FILE_NAME: &str = ".git-credentials";

/// Semver reported by builds that were not produced by the release pipeline.
pub const DEV_SEMVER: &str = "n/a";

/// Commit reported by builds that were not produced by the release pipeline.
pub const DEV_COMMIT: &str = "dirty";

/// Repository the binary is published from when none is injected at build time.
pub const DEFAULT_REPOSITORY: &str = "git@github.com:test/some-repo.git";

/// User agent sent to the release API and download hosts.
pub const USER_AGENT: &str = concat!("picam-streamer/", env!("CARGO_PKG_VERSION"));
