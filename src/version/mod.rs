//! Version of the running binary.
//!
//! The release pipeline injects the version at compile time:
//!
//! ```bash
//! PICAM_SEMVER=v0.3.2 PICAM_COMMIT=$(git rev-parse HEAD) \
//! PICAM_REPOSITORY=git@github.com:ylallemant/go-picam-streamer.git cargo build --release
//! ```
//!
//! Builds without these variables report `n/a`/`dirty`. Such development
//! builds never consider themselves out of date.

use crate::constants::{DEFAULT_REPOSITORY, DEV_COMMIT, DEV_SEMVER};
use crate::git::uri;
use semver::Version;
use std::fmt;

/// Semver, commit and source repository of the running binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    semver: String,
    commit: String,
    source: String,
}

impl VersionInfo {
    pub fn new(
        semver: impl Into<String>,
        commit: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            semver: semver.into(),
            commit: commit.into(),
            source: source.into(),
        }
    }

    /// Values injected at build time, with development defaults.
    pub fn from_build() -> Self {
        Self::new(
            non_empty(option_env!("PICAM_SEMVER")).unwrap_or(DEV_SEMVER),
            non_empty(option_env!("PICAM_COMMIT")).unwrap_or(DEV_COMMIT),
            non_empty(option_env!("PICAM_REPOSITORY")).unwrap_or(DEFAULT_REPOSITORY),
        )
    }

    /// Same version, published from another repository.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn semver(&self) -> &str {
        &self.semver
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this binary was built outside the release pipeline.
    pub fn is_dev_build(&self) -> bool {
        self.semver == DEV_SEMVER
    }

    /// Semver with every `.` replaced by `separator` (`v1_2_3`).
    pub fn semver_with_separator(&self, separator: &str) -> String {
        self.semver.replace('.', separator)
    }

    /// Whether the release `tag` is the running version.
    ///
    /// Tags and versions are compared as semantic versions when both parse,
    /// so `v1.2.3` matches `1.2.3`. Anything else is compared verbatim.
    pub fn matches_tag(&self, tag: &str) -> bool {
        match (parse_tag(&self.semver), parse_tag(tag)) {
            (Some(current), Some(released)) => current == released,
            _ => self.semver == tag,
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version: {}, commit: {}\nsource: {}",
            self.semver,
            self.commit,
            uri::normalize(&self.source)
        )
    }
}

/// Parse a release tag, ignoring a leading `v`.
pub fn parse_tag(tag: &str) -> Option<Version> {
    let cleaned = tag.trim().trim_start_matches('v').trim_start_matches('V');
    Version::parse(cleaned).ok()
}

fn non_empty(value: Option<&'static str>) -> Option<&'static str> {
    value.filter(|v| !v.trim().is_empty())
}
