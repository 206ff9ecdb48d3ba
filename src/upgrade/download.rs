//! HTTP download of release assets.

use crate::config::Config;
use crate::constants::USER_AGENT;
use crate::core::PicamError;
use crate::utils::progress::ProgressBar;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Downloads release assets with a bounded client.
///
/// No retries happen here. A failed download aborts the upgrade.
pub struct ArtifactFetcher {
    client: reqwest::Client,
    show_progress: bool,
}

/// An accepted response whose body has not been read yet.
pub struct Download {
    url: String,
    response: reqwest::Response,
    show_progress: bool,
}

impl ArtifactFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.upgrade.download_timeout())
            .build()
            .context("Failed to build download client")?;

        Ok(Self {
            client,
            show_progress: config.show_progress,
        })
    }

    /// Start downloading `url`.
    ///
    /// Any status other than 200 fails with [`PicamError::Network`] carrying
    /// the status code.
    pub async fn download(&self, url: &str) -> Result<Download> {
        debug!("Download {url}");

        let response = self.client.get(url).send().await.map_err(|e| PicamError::Network {
            url: url.to_string(),
            reason: e.to_string(),
            status: None,
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(PicamError::Network {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
                status: Some(status.as_u16()),
            }
            .into());
        }

        Ok(Download {
            url: url.to_string(),
            response,
            show_progress: self.show_progress,
        })
    }

    /// Download `url` into `path`, returning the number of bytes written.
    pub async fn download_to(&self, url: &str, path: &Path) -> Result<u64> {
        self.download(url).await?.persist(path).await
    }

    /// Download `url` as text. Used for checksum files.
    pub async fn download_text(&self, url: &str) -> Result<String> {
        self.download(url).await?.text().await
    }
}

impl Download {
    /// Announced body length.
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Stream the body into a new file at `path`.
    pub async fn persist(mut self, path: &Path) -> Result<u64> {
        let mut file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let progress = ProgressBar::download(self.content_length(), self.show_progress);
        if let Some(name) = path.file_name() {
            progress.set_prefix(name.to_string_lossy());
        }

        let mut written = 0u64;
        loop {
            let chunk = self.response.chunk().await.map_err(|e| PicamError::Network {
                url: self.url.clone(),
                reason: e.to_string(),
                status: None,
            })?;
            let Some(chunk) = chunk else {
                break;
            };

            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written += chunk.len() as u64;
            progress.inc(chunk.len() as u64);
        }

        file.flush().await.with_context(|| format!("Failed to flush {}", path.display()))?;
        progress.finish_and_clear();

        debug!("Saved {} bytes from {} to {}", written, self.url, path.display());
        Ok(written)
    }

    /// Read the whole body as text.
    pub async fn text(self) -> Result<String> {
        let url = self.url;
        self.response.text().await.map_err(|e| {
            PicamError::Network {
                url,
                reason: e.to_string(),
                status: None,
            }
            .into()
        })
    }
}
