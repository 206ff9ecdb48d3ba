//! Progress reporting for artifact downloads.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

/// Download progress bar that can be disabled as a whole.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Create a byte counter for `len` bytes, hidden when `enabled` is false.
    pub fn download(len: Option<u64>, enabled: bool) -> Self {
        let inner = match (enabled, len) {
            (true, Some(len)) => {
                let bar = IndicatifBar::new(len);
                bar.set_style(download_style());
                bar
            }
            _ => IndicatifBar::hidden(),
        };
        Self { inner }
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .map(|style| style.progress_chars("━╸━"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
