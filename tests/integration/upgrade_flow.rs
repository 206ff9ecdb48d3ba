//! End-to-end upgrades against a mock release API.

use crate::common::{BINARY_NAME, NEW_BINARY, OLD_BINARY, UpgradeEnv, checksum_of};
use anyhow::Result;
use picam_streamer::core::{PicamError, SwapStep};
use picam_streamer::test_utils::TarEntry;
use picam_streamer::upgrade::swap::Swap;
use picam_streamer::upgrade::verification::ChecksumAlgorithm;
use picam_streamer::upgrade::{SelfUpdater, UpgradeOutcome, UpgradeState};
use std::io;
use std::path::Path;

fn release_entries() -> Vec<TarEntry> {
    vec![TarEntry::executable(BINARY_NAME, NEW_BINARY), TarEntry::file("README.md", b"docs")]
}

#[tokio::test]
async fn test_upgrade_with_matching_checksum_is_done() -> Result<()> {
    let env = UpgradeEnv::new().await?;
    let entries = release_entries();
    let md5 = checksum_of(&entries, ChecksumAlgorithm::Md5).await?;
    env.publish("v2.0.0", &entries, Some((ChecksumAlgorithm::Md5, format!("{md5}\n")))).await?;

    let config = env.config("v1.0.0");
    let mut updater = SelfUpdater::new(&config)?.with_target(&env.target);
    let outcome = updater.run().await?;

    assert_eq!(
        outcome,
        UpgradeOutcome::Upgraded {
            from: "v1.0.0".to_string(),
            to: "v2.0.0".to_string(),
            target: env.target.clone(),
        }
    );
    assert_eq!(updater.state(), UpgradeState::Done);
    assert_eq!(std::fs::read(&env.target)?, NEW_BINARY);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&env.target)?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    Ok(())
}

#[tokio::test]
async fn test_checksum_mismatch_leaves_target_untouched() -> Result<()> {
    let env = UpgradeEnv::new().await?;
    env.publish(
        "v2.0.0",
        &release_entries(),
        Some((ChecksumAlgorithm::Md5, "d41d8cd98f00b204e9800998ecf8427e".to_string())),
    )
    .await?;

    let config = env.config("v1.0.0");
    let mut updater = SelfUpdater::new(&config)?.with_target(&env.target);
    let error = updater.run().await.unwrap_err();

    match PicamError::find(&error) {
        Some(PicamError::ChecksumMismatch { expected, .. }) => {
            assert_eq!(expected, "d41d8cd98f00b204e9800998ecf8427e");
        }
        other => panic!("expected a checksum mismatch, got {other:?}"),
    }
    assert_eq!(updater.state(), UpgradeState::Failed);
    assert_eq!(std::fs::read(&env.target)?, OLD_BINARY);

    Ok(())
}

#[tokio::test]
async fn test_sha256_checksum_is_verified() -> Result<()> {
    let env = UpgradeEnv::new().await?;
    let entries = release_entries();
    let sha = checksum_of(&entries, ChecksumAlgorithm::Sha256).await?;
    env.publish("v2.0.0", &entries, Some((ChecksumAlgorithm::Sha256, sha))).await?;

    let config = env.config("v1.0.0");
    let mut updater = SelfUpdater::new(&config)?.with_target(&env.target);
    updater.run().await?;

    assert_eq!(updater.state(), UpgradeState::Done);
    assert_eq!(std::fs::read(&env.target)?, NEW_BINARY);
    Ok(())
}

#[tokio::test]
async fn test_missing_checksum_is_tolerated() -> Result<()> {
    let env = UpgradeEnv::new().await?;
    env.publish("v2.0.0", &release_entries(), None).await?;

    let config = env.config("v1.0.0");
    let mut updater = SelfUpdater::new(&config)?.with_target(&env.target);
    updater.run().await?;

    assert_eq!(updater.state(), UpgradeState::Done);
    assert_eq!(std::fs::read(&env.target)?, NEW_BINARY);
    Ok(())
}

#[tokio::test]
async fn test_binary_nested_in_archive() -> Result<()> {
    let env = UpgradeEnv::new().await?;
    let entries = vec![
        TarEntry::dir("some-repo-v2.0.0/"),
        TarEntry::executable(&format!("some-repo-v2.0.0/{BINARY_NAME}"), NEW_BINARY),
    ];
    env.publish("v2.0.0", &entries, None).await?;

    let config = env.config("v1.0.0");
    let mut updater = SelfUpdater::new(&config)?.with_target(&env.target);
    updater.run().await?;

    assert_eq!(std::fs::read(&env.target)?, NEW_BINARY);
    Ok(())
}

#[tokio::test]
async fn test_unsafe_archive_is_rejected() -> Result<()> {
    let env = UpgradeEnv::new().await?;
    let entries = vec![
        TarEntry::file("../../etc/passwd", b"root::0:0"),
        TarEntry::executable(BINARY_NAME, NEW_BINARY),
    ];
    env.publish("v2.0.0", &entries, None).await?;

    let config = env.config("v1.0.0");
    let mut updater = SelfUpdater::new(&config)?.with_target(&env.target);
    let error = updater.run().await.unwrap_err();

    assert!(matches!(PicamError::find(&error), Some(PicamError::ArchiveSecurity { .. })));
    assert_eq!(updater.state(), UpgradeState::Failed);
    assert_eq!(std::fs::read(&env.target)?, OLD_BINARY);
    Ok(())
}

#[tokio::test]
async fn test_archive_without_binary_fails_before_swap() -> Result<()> {
    let env = UpgradeEnv::new().await?;
    env.publish("v2.0.0", &[TarEntry::file("README.md", b"docs")], None).await?;

    let config = env.config("v1.0.0");
    let mut updater = SelfUpdater::new(&config)?.with_target(&env.target);
    let error = updater.run().await.unwrap_err();

    assert!(format!("{error:#}").contains("No some-repo binary found"));
    assert_eq!(std::fs::read(&env.target)?, OLD_BINARY);
    Ok(())
}

#[tokio::test]
async fn test_up_to_date_release_is_not_downloaded() -> Result<()> {
    let env = UpgradeEnv::new().await?;
    env.publish("v2.0.0", &release_entries(), None).await?;

    let config = env.config("v2.0.0");
    let mut updater = SelfUpdater::new(&config)?.with_target(&env.target);
    let outcome = updater.run().await?;

    assert!(matches!(outcome, UpgradeOutcome::UpToDate { .. }));
    assert_eq!(std::fs::read(&env.target)?, OLD_BINARY);

    let requests = env.server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1, "only the release listing should be requested");
    Ok(())
}

#[tokio::test]
async fn test_forced_upgrade_reinstalls_current_release() -> Result<()> {
    let env = UpgradeEnv::new().await?;
    env.publish("v2.0.0", &release_entries(), None).await?;

    let config = env.config("v2.0.0");
    let mut updater = SelfUpdater::new(&config)?
        .with_target(&env.target)
        .with_options(picam_streamer::upgrade::UpgradeOptions {
            force: true,
            ..Default::default()
        });
    updater.run().await?;

    assert_eq!(updater.state(), UpgradeState::Done);
    assert_eq!(std::fs::read(&env.target)?, NEW_BINARY);
    Ok(())
}

#[tokio::test]
async fn test_swap_failure_fails_and_keeps_target() -> Result<()> {
    let env = UpgradeEnv::new().await?;
    env.publish("v2.0.0", &release_entries(), None).await?;

    let target = env.home().join("bin").join("occupied");
    std::fs::create_dir_all(&target)?;
    std::fs::write(target.join("keep"), OLD_BINARY)?;

    let config = env.config("v1.0.0");
    let mut updater = SelfUpdater::new(&config)?.with_target(&target);
    let error = updater.run().await.unwrap_err();

    match PicamError::find(&error) {
        Some(PicamError::Swap { step, .. }) => assert_eq!(*step, SwapStep::Rename),
        other => panic!("expected a swap error, got {other:?}"),
    }
    assert_eq!(updater.state(), UpgradeState::Failed);
    assert_eq!(std::fs::read(target.join("keep"))?, OLD_BINARY);
    assert!(!env.home().join("bin").join(".occupied.new").exists());
    Ok(())
}

/// Installs the binary but cannot delete the extracted copy.
struct SourceLeftBehind;

impl Swap for SourceLeftBehind {
    fn replace(&self, source: &Path, target: &Path) -> Result<()> {
        std::fs::copy(source, target)?;
        Err(PicamError::Swap {
            step: SwapStep::RemoveSource,
            path: source.to_path_buf(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only scratch"),
        }
        .into())
    }
}

#[tokio::test]
async fn test_leftover_source_still_completes_upgrade() -> Result<()> {
    let env = UpgradeEnv::new().await?;
    env.publish("v2.0.0", &release_entries(), None).await?;

    let config = env.config("v1.0.0");
    let mut updater =
        SelfUpdater::new(&config)?.with_target(&env.target).with_swapper(SourceLeftBehind);
    let outcome = updater.run().await?;

    assert!(matches!(outcome, UpgradeOutcome::Upgraded { .. }));
    assert_eq!(updater.state(), UpgradeState::Done);
    assert_eq!(std::fs::read(&env.target)?, NEW_BINARY);
    Ok(())
}
