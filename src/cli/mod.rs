//! Command-line interface for picam-streamer.
//!
//! # Commands
//!
//! - `upgrade` - replace the installed binary with the latest release
//! - `version` - print the version of the binary
//!
//! # Global Options
//!
//! - `-v, --verbose` (alias `--debug`) - debug logging
//! - `-q, --quiet` - only errors are logged
//! - `--no-progress` - no download progress bars
//! - `--config-dir <DIR>` - configuration directory (`PICAM_CONFIG_DIR`)
//!
//! Logs go to stderr, command output to stdout. `RUST_LOG` overrides the
//! level selected by the flags.
//!
//! # Examples
//!
//! ```bash
//! picam-streamer upgrade --dry-run
//! picam-streamer upgrade --non-blocking --debug
//! picam-streamer version --separator _
//! ```

mod upgrade;
mod version;

use crate::config::Config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
    pub no_progress: bool,
    pub config_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Install the global tracing subscriber, writing to stderr.
    ///
    /// Calling it again has no effect.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("picam_streamer={}", self.log_level)));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "picam-streamer",
    about = "Raspberry Pi camera streamer",
    version,
    long_about = "picam-streamer keeps itself up to date with the releases of its source repository."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, visible_alias = "debug")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Disable download progress bars
    #[arg(long, global = true)]
    no_progress: bool,

    /// Directory holding lock files and config.toml
    #[arg(long, global = true, env = "PICAM_CONFIG_DIR", value_name = "DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upgrade the binary to the latest release
    Upgrade(upgrade::UpgradeArgs),

    /// Print the version of the binary
    Version(version::VersionArgs),
}

impl Cli {
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress || self.quiet,
            config_dir: self.config_dir.clone(),
        }
    }

    /// Whether failures of this command must not fail the process.
    pub fn non_blocking(&self) -> bool {
        match &self.command {
            Commands::Upgrade(args) => args.non_blocking,
            Commands::Version(_) => false,
        }
    }

    pub async fn execute_with_config(self, cli_config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Upgrade(args) => {
                let mut config = Config::resolve(cli_config.config_dir.clone()).await?;
                config.show_progress = !cli_config.no_progress;
                upgrade::execute(args, &config).await
            }
            Commands::Version(args) => version::execute(&args),
        }
    }
}
