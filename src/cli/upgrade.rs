//! `upgrade` command.
//!
//! ```bash
//! picam-streamer upgrade                    # install the latest stable release
//! picam-streamer upgrade --check            # only report whether an upgrade exists
//! picam-streamer upgrade --dry-run          # show what would be installed
//! picam-streamer upgrade --force            # reinstall even when up to date
//! picam-streamer upgrade --allow-prerelease # consider prereleases
//! picam-streamer upgrade --non-blocking     # never fail, for cron jobs and boot scripts
//! ```

use crate::config::Config;
use crate::upgrade::{SelfUpdater, UpgradeOptions, UpgradeOutcome};
use anyhow::Result;
use clap::Parser;
use colored::Colorize;

#[derive(Parser, Debug)]
pub struct UpgradeArgs {
    /// Only report whether the binary matches the latest release
    #[arg(long, conflicts_with_all = ["dry_run", "force"])]
    pub check: bool,

    /// Do not replace the binary
    #[arg(long)]
    pub dry_run: bool,

    /// Replace the binary even when it is up to date
    #[arg(long)]
    pub force: bool,

    /// Allow the installation of prerelease versions
    #[arg(long)]
    pub allow_prerelease: bool,

    /// Exit successfully even when the upgrade fails
    #[arg(long)]
    pub non_blocking: bool,
}

impl UpgradeArgs {
    fn options(&self) -> UpgradeOptions {
        UpgradeOptions {
            dry_run: self.dry_run,
            force: self.force,
            allow_prerelease: self.allow_prerelease,
        }
    }
}

pub async fn execute(args: UpgradeArgs, config: &Config) -> Result<()> {
    let mut updater = SelfUpdater::new(config)?.with_options(args.options());

    if args.check {
        return check(&updater).await;
    }

    println!("targeting binary for {}", config.platform);
    match updater.run().await? {
        UpgradeOutcome::Throttled { reason } => {
            println!("{}", format!("Upgrade skipped: {reason}").yellow());
        }
        UpgradeOutcome::UpToDate { version } => {
            println!(
                "{}",
                format!("binary with version \"{version}\" is up to date: skipping upgrade").green()
            );
        }
        UpgradeOutcome::DryRun { from, to, target, asset } => {
            println!(
                "upgrade would replace binary from \"{from}\" to \"{to}\" at its current location {}",
                target.display()
            );
            match asset {
                Some(asset) => println!("using release asset {}", asset.cyan()),
                None => println!(
                    "{}",
                    format!("release {to} has no binary for {}", config.platform).yellow()
                ),
            }
        }
        UpgradeOutcome::Upgraded { from, to, target } => {
            println!(
                "{}",
                format!("Upgraded {} from \"{from}\" to \"{to}\"", target.display()).green()
            );
        }
    }

    Ok(())
}

async fn check(updater: &SelfUpdater) -> Result<()> {
    let current = updater.current_version().semver();
    if updater.check().await? {
        println!("{}", format!("You are on the latest version ({current})").green());
    } else {
        println!("{}", format!("An upgrade is available for version {current}").yellow());
        println!("Run `picam-streamer upgrade` to install it");
    }
    Ok(())
}
