//! Platform detection and release asset matching.
//!
//! Release archives are named after the Go toolchain conventions used by the
//! release pipeline (`picam-streamer_linux_arm64.tar.gz`), so the Rust target
//! constants are translated into those tokens before any name comparison.
//!
//! # Examples
//!
//! ```rust,no_run
//! use picam_streamer::utils::platform::Platform;
//!
//! let platform = Platform::current();
//! if platform.matches_asset("picam-streamer_linux_arm64.tar.gz") {
//!     println!("archive published for {platform}");
//! }
//! ```

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Returns `true` when compiled for Windows.
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Resolve the current user's home directory.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Create `path` and its parents, with mode `0755` on Unix.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }

    builder
        .create(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))
}

/// Operating system and CPU architecture tokens of a release asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Operating system token (`linux`, `darwin`, `windows`, ...)
    pub os: String,
    /// Architecture token (`amd64`, `arm64`, `arm`, `386`, ...)
    pub arch: String,
}

impl Platform {
    /// Build a platform from explicit tokens.
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        Self::new(os_token(std::env::consts::OS), arch_token(std::env::consts::ARCH))
    }

    /// Whether `name` carries both the OS and the architecture token.
    ///
    /// Names are split on `_`, `-` and `.` so that `arm` does not match an
    /// `arm64` archive. `x86_64` is read as `amd64`.
    pub fn matches_asset(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase().replace("x86_64", "amd64");
        let tokens: Vec<&str> =
            name.split(['_', '-', '.']).filter(|token| !token.is_empty()).collect();

        tokens.contains(&self.os.as_str()) && tokens.contains(&self.arch.as_str())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

fn os_token(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn arch_token(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "powerpc64" => "ppc64",
        other => other,
    }
}
