//! Filesystem leases shared by every invocation on the host.
//!
//! A lock is a small file at a well-known path in the configuration
//! directory. Its permission mode tells what kind of lock it is:
//!
//! | mode   | kind        | active while                         |
//! |--------|-------------|--------------------------------------|
//! | `0600` | permanent   | the file exists                      |
//! | `0644` | temporary   | the modification time is in the future |
//!
//! A temporary lock stores its expiry in the file's access and modification
//! times. The content is advisory text for humans. An expired temporary lock
//! is deleted the first time it is observed.
//!
//! Concurrent invocations may race on the same lock file. The worst outcome
//! is a redundant API call.
//!
//! # Examples
//!
//! ```rust,no_run
//! use picam_streamer::lock::LockStore;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # fn example() -> anyhow::Result<()> {
//! let path = Path::new("/home/pi/.picam-streamer/network-problems");
//! LockStore::set_temporary(path, "network is down", Duration::from_secs(120))?;
//! assert!(LockStore::is_active(path)?);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeDelta};
use std::fs::{self, FileTimes};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

#[cfg(unix)]
const PERMANENT_MODE: u32 = 0o600;
#[cfg(unix)]
const TEMPORARY_MODE: u32 = 0o644;

/// Kind of a lock, derived from its permission mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Permanent,
    Temporary,
    Unknown,
}

impl LockKind {
    fn header(self) -> &'static str {
        match self {
            Self::Permanent => "# permanent lock",
            Self::Temporary => "# temporary lock",
            Self::Unknown => "# lock",
        }
    }
}

/// Snapshot of a lock file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub path: PathBuf,
    pub kind: LockKind,
    /// Advisory content
    pub description: String,
    /// Expiry of a temporary lock
    pub expires_at: Option<SystemTime>,
}

/// Cross-process leases on the filesystem.
pub struct LockStore;

impl LockStore {
    /// Write a permanent lock at `path`.
    pub fn set_permanent(path: &Path, description: &str) -> Result<()> {
        write_lock(path, LockKind::Permanent, description)?;
        debug!("Set permanent lock at {}", path.display());
        Ok(())
    }

    /// Write a temporary lock at `path` expiring `duration` from now.
    pub fn set_temporary(path: &Path, description: &str, duration: Duration) -> Result<()> {
        let valid_until: DateTime<Local> = expiry_after(SystemTime::now(), duration, path)?.into();
        let content = format!("{description}\nvalid until: {}", valid_until.to_rfc3339());
        write_lock(path, LockKind::Temporary, &content)?;

        let written = fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("Failed to read lock metadata at {}", path.display()))?;
        let expiry = expiry_after(written, duration, path)?;

        fs::File::options()
            .write(true)
            .open(path)
            .and_then(|file| file.set_times(FileTimes::new().set_accessed(expiry).set_modified(expiry)))
            .with_context(|| format!("Failed to set lock expiry at {}", path.display()))?;

        debug!("Set temporary lock at {} for {:?}", path.display(), duration);
        Ok(())
    }

    /// Whether the lock at `path` currently holds.
    ///
    /// A permanent lock holds while it exists. A temporary (or unrecognized)
    /// lock holds while its modification time is in the future, and is
    /// removed once it no longer does.
    pub fn is_active(path: &Path) -> Result<bool> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to stat lock at {}", path.display()));
            }
        };

        if Self::kind(path)? == LockKind::Permanent {
            debug!("Permanent lock present at {}", path.display());
            return Ok(true);
        }

        let modified = metadata
            .modified()
            .with_context(|| format!("Failed to read lock expiry at {}", path.display()))?;
        let active = modified > SystemTime::now();
        debug!("Timed lock at {} active: {}", path.display(), active);

        if !active {
            Self::remove(path)?;
        }
        Ok(active)
    }

    /// Kind of the lock at `path`, [`LockKind::Unknown`] when absent.
    pub fn kind(path: &Path) -> Result<LockKind> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LockKind::Unknown),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to stat lock at {}", path.display()));
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let kind = match metadata.permissions().mode() & 0o777 {
                PERMANENT_MODE => LockKind::Permanent,
                TEMPORARY_MODE => LockKind::Temporary,
                _ => LockKind::Unknown,
            };
            Ok(kind)
        }

        #[cfg(not(unix))]
        {
            let _ = metadata;
            let content = fs::read_to_string(path).unwrap_or_default();
            let kind = match content.lines().next() {
                Some(line) if line == LockKind::Permanent.header() => LockKind::Permanent,
                Some(line) if line == LockKind::Temporary.header() => LockKind::Temporary,
                _ => LockKind::Unknown,
            };
            Ok(kind)
        }
    }

    /// Read the lock at `path` without changing it.
    pub fn inspect(path: &Path) -> Result<Option<Lock>> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to stat lock at {}", path.display()));
            }
        };

        let kind = Self::kind(path)?;
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read lock at {}", path.display()))?;
        let description = content
            .lines()
            .filter(|line| !line.starts_with("# "))
            .collect::<Vec<_>>()
            .join("\n");

        let expires_at = match kind {
            LockKind::Permanent => None,
            LockKind::Temporary | LockKind::Unknown => metadata.modified().ok(),
        };

        Ok(Some(Lock {
            path: path.to_path_buf(),
            kind,
            description,
            expires_at,
        }))
    }

    /// Delete the lock at `path`. Missing locks are fine.
    pub fn remove(path: &Path) -> Result<()> {
        debug!("Remove lock at {}", path.display());
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove lock at {}", path.display())),
        }
    }
}

/// `start + duration`, or an error when the expiry cannot be represented.
fn expiry_after(start: SystemTime, duration: Duration, path: &Path) -> Result<SystemTime> {
    let representable = TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| DateTime::<Local>::from(start).checked_add_signed(delta))
        .is_some();

    start
        .checked_add(duration)
        .filter(|_| representable)
        .with_context(|| format!("Lock duration {duration:?} out of range for {}", path.display()))
}

fn write_lock(path: &Path, kind: LockKind, description: &str) -> Result<()> {
    let content = format!("{}\n{description}\n", kind.header());
    fs::write(path, content)
        .with_context(|| format!("Failed to write lock at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = match kind {
            LockKind::Permanent => PERMANENT_MODE,
            LockKind::Temporary | LockKind::Unknown => TEMPORARY_MODE,
        };
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("Failed to set lock mode at {}", path.display()))?;
    }

    Ok(())
}
