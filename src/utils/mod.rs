//! Cross-platform utilities.
//!
//! - [`platform`]: home directory, directory creation, OS/arch asset matching
//! - [`progress`]: download progress bars

pub mod platform;
pub mod progress;

pub use platform::{Platform, ensure_dir, get_home_dir, is_windows};
pub use progress::ProgressBar;
