use crate::core::PicamError;
use anyhow::{Context, Result};
use md5::Md5;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

use crate::constants::CHECKSUM_CHUNK_SIZE;

/// Checksum algorithms recognized from the checksum asset name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    /// `.md5` assets, the format published by the release pipeline
    Md5,
    /// `.sha256` assets
    Sha256,
}

impl ChecksumAlgorithm {
    /// Algorithm of a checksum asset, `None` for any other asset.
    pub fn from_asset_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.contains(".md5") {
            Some(Self::Md5)
        } else if name.contains(".sha256") {
            Some(Self::Sha256)
        } else {
            None
        }
    }
}

/// Verifies downloaded archives against their published checksum.
///
/// A release may publish a checksum file next to each archive, containing
/// nothing but the hex digest of the archive. When one exists, the archive
/// must match it exactly. A release without checksum file is accepted.
pub struct IntegrityVerifier;

impl IntegrityVerifier {
    /// Hex digest of the file at `path`.
    ///
    /// ```rust,no_run
    /// use picam_streamer::upgrade::verification::{ChecksumAlgorithm, IntegrityVerifier};
    /// use std::path::Path;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let digest =
    ///     IntegrityVerifier::checksum(Path::new("/tmp/archive.tar.gz"), ChecksumAlgorithm::Md5).await?;
    /// println!("md5: {digest}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn checksum(path: &Path, algorithm: ChecksumAlgorithm) -> Result<String> {
        debug!("Computing {:?} checksum for {}", algorithm, path.display());

        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open file: {}", path.display()))?;

        Self::checksum_reader(file, algorithm)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))
    }

    /// Hex digest of everything `reader` yields.
    pub async fn checksum_reader<R>(reader: R, algorithm: ChecksumAlgorithm) -> Result<String>
    where
        R: AsyncRead + Unpin,
    {
        match algorithm {
            ChecksumAlgorithm::Md5 => digest_reader::<Md5, _>(reader).await,
            ChecksumAlgorithm::Sha256 => digest_reader::<Sha256, _>(reader).await,
        }
    }

    /// Whether `computed` equals the `published` checksum, ignoring
    /// surrounding whitespace of the published value.
    pub fn verify(computed: &str, published: &str) -> bool {
        computed == published.trim()
    }

    /// Check the archive at `path` against the `published` checksum.
    ///
    /// Fails with [`PicamError::ChecksumMismatch`] when they differ.
    pub async fn verify_file(
        path: &Path,
        asset_name: &str,
        algorithm: ChecksumAlgorithm,
        published: &str,
    ) -> Result<()> {
        info!("Verifying checksum of {}", asset_name);

        let computed = Self::checksum(path, algorithm).await?;
        if !Self::verify(&computed, published) {
            return Err(PicamError::ChecksumMismatch {
                asset: asset_name.to_string(),
                expected: published.trim().to_string(),
                actual: computed,
            }
            .into());
        }

        info!("Downloaded archive is pristine, checksum match ({computed})");
        Ok(())
    }
}

/// Feed `reader` through `D` one chunk at a time until end of stream.
async fn digest_reader<D, R>(mut reader: R) -> Result<String>
where
    D: Digest,
    R: AsyncRead + Unpin,
{
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHECKSUM_CHUNK_SIZE];

    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
