//! Replacement of the installed executable.
//!
//! The new binary is staged next to the target, in the same directory and
//! therefore on the same filesystem, then renamed over it. The rename is
//! atomic on Unix, so the target path always holds either the old or the new
//! binary.

use crate::core::{PicamError, SwapStep};
use anyhow::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// Installs an extracted binary over the target executable.
///
/// Implementations block and are run on the blocking thread pool.
pub trait Swap: Send + Sync {
    /// Replace `target` with the content of `source`, then delete `source`.
    ///
    /// Failures are reported as [`PicamError::Swap`]. A failure at
    /// [`SwapStep::RemoveSource`] means the target was already replaced.
    fn replace(&self, source: &Path, target: &Path) -> Result<()>;
}

/// Swaps a freshly extracted binary into place by renaming over the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySwapper;

impl Swap for BinarySwapper {
    /// Every failing step aborts with [`PicamError::Swap`] naming the step
    /// and the path involved. Until the rename succeeds the target is left
    /// as it was.
    fn replace(&self, source: &Path, target: &Path) -> Result<()> {
        info!("Replacing {} with {}", target.display(), source.display());

        let content = fs::read(source).map_err(|e| swap_error(SwapStep::ReadSource, source, e))?;

        let staged = staged_path(target);
        if let Err(e) = stage(&staged, &content) {
            let _ = fs::remove_file(&staged);
            return Err(e);
        }

        if let Err(e) = fs::rename(&staged, target) {
            let _ = fs::remove_file(&staged);
            return Err(swap_error(SwapStep::Rename, target, e));
        }
        debug!("Moved {} over {}", staged.display(), target.display());

        fs::remove_file(source).map_err(|e| swap_error(SwapStep::RemoveSource, source, e))?;

        Ok(())
    }
}

fn stage(staged: &Path, content: &[u8]) -> Result<()> {
    fs::write(staged, content).map_err(|e| swap_error(SwapStep::WriteStaged, staged, e))?;
    set_executable(staged).map_err(|e| swap_error(SwapStep::SetPermissions, staged, e))?;
    Ok(())
}

/// `<dir>/.<name>.new` next to `target`.
fn staged_path(target: &Path) -> PathBuf {
    let name = target.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    target.with_file_name(format!(".{name}.new"))
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn swap_error(step: SwapStep, path: &Path, source: io::Error) -> anyhow::Error {
    PicamError::Swap {
        step,
        path: path.to_path_buf(),
        source,
    }
    .into()
}
