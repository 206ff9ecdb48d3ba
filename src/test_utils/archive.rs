//! Builders for `.tar.gz` release archives used in tests.
//!
//! Entry names are written into the header verbatim, so archives with
//! hostile names such as `../../etc/passwd` can be produced as well.

use anyhow::{Result, ensure};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::path::Path;

/// One entry of a test archive.
#[derive(Debug, Clone)]
pub struct TarEntry {
    pub name: String,
    /// `None` for directories
    pub contents: Option<Vec<u8>>,
    pub mode: u32,
}

impl TarEntry {
    pub fn file(name: &str, contents: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            contents: Some(contents.to_vec()),
            mode: 0o644,
        }
    }

    pub fn executable(name: &str, contents: &[u8]) -> Self {
        Self {
            mode: 0o755,
            ..Self::file(name, contents)
        }
    }

    pub fn dir(name: &str) -> Self {
        Self {
            name: name.to_string(),
            contents: None,
            mode: 0o755,
        }
    }
}

/// Gzip-compressed tar archive holding `entries` in order.
pub fn tar_gz_bytes(entries: &[TarEntry]) -> Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for entry in entries {
        let name = entry.name.as_bytes();
        let mut header = tar::Header::new_gnu();
        {
            let raw = header.as_old_mut();
            ensure!(name.len() < raw.name.len(), "entry name too long: {}", entry.name);
            raw.name[..name.len()].copy_from_slice(name);
        }
        header.set_mode(entry.mode);

        match &entry.contents {
            Some(contents) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(contents.len() as u64);
                header.set_cksum();
                builder.append(&header, contents.as_slice())?;
            }
            None => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                header.set_cksum();
                builder.append(&header, std::io::empty())?;
            }
        }
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

/// Write a `.tar.gz` holding `entries` to `path`.
pub fn write_tar_gz(path: &Path, entries: &[TarEntry]) -> Result<()> {
    std::fs::write(path, tar_gz_bytes(entries)?)?;
    Ok(())
}
