//! `version` command.

use crate::version::VersionInfo;
use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct VersionArgs {
    /// Print only the semver string
    #[arg(long)]
    pub semver: bool,

    /// Print only the commit hash
    #[arg(long)]
    pub commit: bool,

    /// Replace the points in the semver notation
    #[arg(short, long, value_name = "SEPARATOR")]
    pub separator: Option<String>,
}

pub fn execute(args: &VersionArgs) -> Result<()> {
    println!("{}", render(args, &VersionInfo::from_build()));
    Ok(())
}

fn render(args: &VersionArgs, version: &VersionInfo) -> String {
    if args.semver {
        return version.semver().to_string();
    }
    if args.commit {
        return version.commit().to_string();
    }
    match args.separator.as_deref() {
        Some(separator) if !separator.is_empty() => version.semver_with_separator(separator),
        _ => version.to_string(),
    }
}
