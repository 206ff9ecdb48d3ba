//! Tests of the `picam-streamer` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn picam() -> Command {
    let mut cmd = Command::cargo_bin("picam-streamer").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("PICAM_CONFIG_DIR");
    cmd
}

/// Config directory whose settings point at `api_url` and `credentials`.
fn config_dir(api_url: &str, credentials: Option<&str>) -> TempDir {
    let temp = TempDir::new().unwrap();
    let credentials_path = temp.path().join("git-credentials");
    fs::write(&credentials_path, credentials.unwrap_or("")).unwrap();

    let settings = format!(
        "[upgrade]\napi_url = \"{api_url}\"\napi_timeout_secs = 1\ncredentials_path = {:?}\n",
        credentials_path.display().to_string()
    );
    fs::write(temp.path().join("config.toml"), settings).unwrap();
    temp
}

#[test]
fn test_version_prints_information() {
    picam()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("version: "))
        .stdout(predicate::str::contains(", commit: "))
        .stdout(predicate::str::contains("\nsource: https://"));
}

#[test]
fn test_version_semver_and_separator() {
    let semver = picam().args(["version", "--semver"]).assert().success();
    let semver = String::from_utf8_lossy(&semver.get_output().stdout).trim().to_string();
    assert!(!semver.is_empty());

    picam()
        .args(["version", "-s", "_"])
        .assert()
        .success()
        .stdout(format!("{}\n", semver.replace('.', "_")));
}

#[test]
fn test_version_commit() {
    picam()
        .args(["version", "--commit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("version:").not());
}

#[test]
fn test_broken_credentials_fail_upgrade() {
    let dir = config_dir("http://127.0.0.1:9", Some("definitely not a url\n"));

    picam()
        .args(["upgrade", "--force", "--dry-run", "--config-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to resolve credentials"));
}

#[test]
fn test_non_blocking_upgrade_exits_zero() {
    let dir = config_dir("http://127.0.0.1:9", Some("definitely not a url\n"));

    picam()
        .args(["upgrade", "--force", "--dry-run", "--non-blocking"])
        .env("PICAM_CONFIG_DIR", dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("--non-blocking"));
}

#[test]
fn test_unreachable_provider_skips_upgrade() {
    let dir = config_dir("http://127.0.0.1:9", None);

    picam()
        .args(["upgrade", "--force", "--dry-run", "--config-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Upgrade skipped"));

    assert!(dir.path().join("network-problems").exists());
    assert!(dir.path().join("binary-sync").exists());
}

#[test]
fn test_check_reports_status() {
    let dir = config_dir("http://127.0.0.1:9", None);

    picam()
        .args(["upgrade", "--check", "--config-dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("latest version").or(predicate::str::contains("upgrade is available")));
}

#[test]
fn test_invalid_settings_are_a_config_error() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("config.toml"), "[upgrade\n").unwrap();

    picam()
        .args(["upgrade", "--config-dir"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_out_of_range_cooldown_is_a_config_error() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.toml"),
        "[upgrade]\nnetwork_cooldown_secs = 9223372036854775807\n",
    )
    .unwrap();

    picam()
        .args(["upgrade", "--non-blocking", "--config-dir"])
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("upgrade.network_cooldown_secs"));
}
