//! picam-streamer: a Raspberry Pi camera streamer that keeps itself current.
//!
//! The library holds the self-update engine of the `picam-streamer` binary:
//! the installed executable looks up the releases of its source repository,
//! downloads the archive built for its platform, verifies and extracts it,
//! and swaps itself for the new binary.
//!
//! # Modules
//!
//! - [`cli`] - command-line interface (`upgrade`, `version`)
//! - [`config`] - runtime configuration resolved once at startup
//! - [`core`] - error taxonomy and user-facing error rendering
//! - [`git`] - repository URI normalization and git credential lookup
//! - [`lock`] - filesystem leases throttling release checks
//! - [`upgrade`] - release catalog, download, verification, extraction, swap
//! - [`version`] - build-time version information
//!
//! # Example
//!
//! ```rust,no_run
//! use picam_streamer::config::Config;
//! use picam_streamer::upgrade::{SelfUpdater, UpgradeOptions};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::resolve(None).await?;
//! let outcome = SelfUpdater::new(&config)?
//!     .with_options(UpgradeOptions::default())
//!     .run()
//!     .await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;

// Release source
pub mod git;
pub mod lock;

// Self-update engine
pub mod upgrade;
pub mod utils;
pub mod version;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
