//! Release API payloads for tests.

use serde_json::{Value, json};

/// A release as served by the releases endpoint.
#[derive(Clone, Debug)]
pub struct ReleaseFixture {
    pub tag: String,
    pub prerelease: bool,
    pub assets: Vec<(String, String)>,
}

impl ReleaseFixture {
    pub fn stable(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            prerelease: false,
            assets: Vec::new(),
        }
    }

    pub fn prerelease(tag: &str) -> Self {
        Self {
            prerelease: true,
            ..Self::stable(tag)
        }
    }

    /// Attach an asset downloadable from `{base_url}/download/{tag}/{name}`.
    pub fn with_asset(mut self, base_url: &str, name: &str) -> Self {
        let url = format!("{}/download/{}/{}", base_url.trim_end_matches('/'), self.tag, name);
        self.assets.push((name.to_string(), url));
        self
    }

    /// Path the asset `name` is served under, relative to the base URL.
    pub fn asset_path(&self, name: &str) -> String {
        format!("/download/{}/{}", self.tag, name)
    }

    pub fn to_json(&self) -> Value {
        let assets: Vec<Value> = self
            .assets
            .iter()
            .map(|(name, url)| json!({ "name": name, "browser_download_url": url }))
            .collect();

        json!({
            "tag_name": self.tag,
            "name": self.tag,
            "prerelease": self.prerelease,
            "draft": false,
            "assets": assets,
        })
    }
}

/// Body of a releases listing, newest first.
pub fn releases_json(releases: &[ReleaseFixture]) -> Value {
    Value::Array(releases.iter().map(ReleaseFixture::to_json).collect())
}
