//! Shared helpers for the integration suite.
//!
//! [`UpgradeEnv`] bundles a temporary home directory, a mock release API
//! and the installed binary an upgrade replaces.

#![allow(dead_code)]

use anyhow::Result;
use picam_streamer::config::Config;
use picam_streamer::test_utils::{ReleaseFixture, TarEntry, releases_json, tar_gz_bytes};
use picam_streamer::upgrade::config::UpgradeConfig;
use picam_streamer::upgrade::verification::{ChecksumAlgorithm, IntegrityVerifier};
use picam_streamer::utils::platform::Platform;
use picam_streamer::version::VersionInfo;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const REPOSITORY: &str = "git@github.com:test/some-repo.git";
pub const RELEASES_PATH: &str = "/repos/test/some-repo/releases";
pub const BINARY_NAME: &str = "some-repo";
pub const OLD_BINARY: &[u8] = b"#!/bin/sh\necho old\n";
pub const NEW_BINARY: &[u8] = b"#!/bin/sh\necho new\n";

pub struct UpgradeEnv {
    pub temp: TempDir,
    pub server: MockServer,
    /// Installed binary replaced by upgrades
    pub target: PathBuf,
}

impl UpgradeEnv {
    pub async fn new() -> Result<Self> {
        picam_streamer::test_utils::init_test_logging(None);

        let temp = TempDir::new()?;
        let server = MockServer::start().await;

        let bin_dir = temp.path().join("bin");
        std::fs::create_dir_all(&bin_dir)?;
        let target = bin_dir.join(BINARY_NAME);
        std::fs::write(&target, OLD_BINARY)?;

        Ok(Self {
            temp,
            server,
            target,
        })
    }

    pub fn home(&self) -> &Path {
        self.temp.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.temp.path().join(".picam-streamer")
    }

    pub fn config(&self, semver: &str) -> Config {
        let upgrade = UpgradeConfig {
            api_url: self.server.uri(),
            ..UpgradeConfig::default()
        };
        let config_dir = self.config_dir();
        let _ = std::fs::create_dir_all(&config_dir);

        Config::new(
            config_dir,
            self.home(),
            VersionInfo::new(semver, "0123abc", REPOSITORY),
            upgrade,
        )
    }

    /// Write a credential store line into `~/.git-credentials`.
    pub fn store_credentials(&self, lines: &str) -> Result<()> {
        std::fs::write(self.home().join(".git-credentials"), lines)?;
        Ok(())
    }

    /// Archive name for the platform running the tests.
    pub fn archive_name(&self) -> String {
        let platform = Platform::current();
        format!("{BINARY_NAME}_{}_{}.tar.gz", platform.os, platform.arch)
    }

    pub async fn mount_releases(&self, releases: &[ReleaseFixture]) {
        Mock::given(method("GET"))
            .and(path(RELEASES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(releases_json(releases)))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_asset(&self, release: &ReleaseFixture, name: &str, body: Vec<u8>) {
        Mock::given(method("GET"))
            .and(path(release.asset_path(name)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&self.server)
            .await;
    }

    /// Publish `tag` with an archive holding `entries` and, when given, a
    /// checksum file with exactly `checksum` as content.
    pub async fn publish(
        &self,
        tag: &str,
        entries: &[TarEntry],
        checksum: Option<(ChecksumAlgorithm, String)>,
    ) -> Result<ReleaseFixture> {
        let archive_name = self.archive_name();
        let archive = tar_gz_bytes(entries)?;

        let mut release = ReleaseFixture::stable(tag).with_asset(&self.server.uri(), &archive_name);
        self.mount_asset(&release, &archive_name, archive).await;

        if let Some((algorithm, value)) = checksum {
            let suffix = match algorithm {
                ChecksumAlgorithm::Md5 => "md5",
                ChecksumAlgorithm::Sha256 => "sha256",
            };
            let checksum_name = format!("{archive_name}.{suffix}");
            release = release.with_asset(&self.server.uri(), &checksum_name);
            self.mount_asset(&release, &checksum_name, value.into_bytes()).await;
        }

        self.mount_releases(std::slice::from_ref(&release)).await;
        Ok(release)
    }
}

/// Checksum of the archive `entries` produce.
pub async fn checksum_of(entries: &[TarEntry], algorithm: ChecksumAlgorithm) -> Result<String> {
    let archive = tar_gz_bytes(entries)?;
    IntegrityVerifier::checksum_reader(archive.as_slice(), algorithm).await
}
