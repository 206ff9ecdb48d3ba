//! Extraction of gzip-compressed tar release archives.

use crate::core::PicamError;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info};

/// Extracts release archives into the scratch directory.
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Extract the `.tar.gz` at `archive` into `dest`.
    ///
    /// An entry naming a parent directory (`..`) or an absolute path fails
    /// with [`PicamError::ArchiveSecurity`] before anything is written for
    /// it. The first error stops extraction. Entries written before it stay
    /// in place.
    pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
        info!("Extracting {} into {}", archive.display(), dest.display());

        let file = File::open(archive)
            .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
        fs::create_dir_all(dest)
            .with_context(|| format!("Failed to create directory: {}", dest.display()))?;

        Self::extract_from(GzDecoder::new(file), dest)
    }

    /// Extract a gzip-decoded tar stream into `dest`.
    pub fn extract_from<R: Read>(reader: R, dest: &Path) -> Result<()> {
        let mut archive = tar::Archive::new(reader);

        for entry in archive.entries().context("Failed to read archive")? {
            let mut entry = entry.context("Failed to read archive entry")?;
            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();

            if is_unsafe_entry(&name) {
                return Err(PicamError::ArchiveSecurity {
                    entry: name,
                }
                .into());
            }

            let outpath = dest.join(&name);
            let entry_type = entry.header().entry_type();

            if entry_type.is_dir() {
                debug!("Create directory {}", outpath.display());
                fs::create_dir_all(&outpath)
                    .with_context(|| format!("Failed to create directory: {}", outpath.display()))?;
            } else if entry_type.is_file() {
                if let Some(parent) = outpath.parent() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create directory: {}", parent.display())
                    })?;
                }

                debug!("Extract {}", outpath.display());
                let mut output = File::create(&outpath)
                    .with_context(|| format!("Failed to create file: {}", outpath.display()))?;
                io::copy(&mut entry, &mut output)
                    .with_context(|| format!("Failed to extract: {}", outpath.display()))?;
            } else {
                debug!("Skipping {name}, unsupported entry type {entry_type:?}");
            }
        }

        Ok(())
    }
}

fn is_unsafe_entry(name: &str) -> bool {
    name.contains("..") || name.starts_with('/') || name.starts_with('\\') || Path::new(name).has_root()
}
