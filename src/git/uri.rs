//! Canonical HTTPS form of repository URIs.
//!
//! The same repository can be referenced through several transports:
//!
//! ```text
//! git@github.com:test/some-repo.git                  SSH shorthand
//! ssh://git@github.com/test/some-repo.git            SSH URL
//! git://github.com/test/some-repo.git                git protocol
//! https://github.com/test/some-repo.git              HTTPS with suffix
//! git@ssh.dev.azure.com:v3/ORG/project/some-repo     Azure DevOps SSH
//! ```
//!
//! [`normalize`] maps all of them onto one HTTPS form without the `.git`
//! suffix (`https://github.com/test/some-repo`,
//! `https://dev.azure.com/ORG/project/_git/some-repo`). Normalizing an
//! already normalized URI returns it unchanged.

use crate::core::PicamError;
use anyhow::{Context, Result};
use std::fmt;
use url::Url;

/// Hosting providers with their own URI conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// `github.com`
    GitHub,
    /// `dev.azure.com`
    AzureDevOps,
    /// Any other host, handled like GitHub.
    Unknown,
}

impl Provider {
    const TABLE: [(&'static str, Provider); 2] =
        [("github.com", Provider::GitHub), ("dev.azure.com", Provider::AzureDevOps)];

    /// Classify `uri` by hostname substring.
    pub fn detect(uri: &str) -> Self {
        Self::TABLE
            .iter()
            .find(|(host, _)| uri.contains(host))
            .map_or(Self::Unknown, |(_, provider)| *provider)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GitHub => "github",
            Self::AzureDevOps => "azure-devops",
            Self::Unknown => "unknown Git provider",
        };
        f.write_str(name)
    }
}

/// Canonical HTTPS form of `uri`.
pub fn normalize(uri: &str) -> String {
    let uri = uri.trim();
    let normalized = match Provider::detect(uri) {
        Provider::AzureDevOps => normalize_azure_devops(uri),
        Provider::GitHub | Provider::Unknown => normalize_github_like(uri),
    };

    strip_git_suffix(&normalized).to_string()
}

fn normalize_github_like(uri: &str) -> String {
    if let Some(rest) = uri.strip_prefix("git://") {
        return format!("https://{rest}");
    }

    if let Some(rest) = uri.strip_prefix("ssh://") {
        let rest = strip_userinfo(rest);
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        let host = authority.split(':').next().unwrap_or(authority);
        return format!("https://{host}/{path}");
    }

    // scp-like shorthand: [user@]host:path
    if !uri.contains("://") {
        if let Some((authority, path)) = uri.split_once(':') {
            let host = strip_userinfo(authority);
            if !host.is_empty() && !host.contains('/') {
                return format!("https://{host}/{}", path.trim_start_matches('/'));
            }
        }
    }

    uri.to_string()
}

fn normalize_azure_devops(uri: &str) -> String {
    let rest = strip_userinfo(uri.strip_prefix("ssh://").unwrap_or(uri));
    let Some(rest) = rest.strip_prefix("ssh.") else {
        return uri.to_string();
    };
    let Some(split) = rest.find([':', '/']) else {
        return uri.to_string();
    };

    let host = &rest[..split];
    let path = strip_git_suffix(&rest[split + 1..]);
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.first().is_some_and(|s| is_version_marker(s)) {
        segments.remove(0);
    }
    if segments.len() >= 2 && segments[segments.len() - 2] != "_git" {
        segments.insert(segments.len() - 1, "_git");
    }

    format!("https://{host}/{}", segments.join("/"))
}

/// Drop `user@` when the `@` belongs to the authority.
fn strip_userinfo(value: &str) -> &str {
    match value.find('@') {
        Some(at) if !value[..at].contains('/') => &value[at + 1..],
        _ => value,
    }
}

fn strip_git_suffix(uri: &str) -> &str {
    let uri = uri.trim_end_matches('/');
    uri.strip_suffix(".git").unwrap_or(uri)
}

/// `v3` style API version segment of Azure DevOps SSH paths.
fn is_version_marker(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Parse the normalized form of `uri`.
pub fn parse(uri: &str) -> Result<Url> {
    let normalized = normalize(uri);
    Url::parse(&normalized).with_context(|| format!("Failed to parse repository URI {uri}"))
}

/// Owner (organization for Azure DevOps) and repository name of `uri`.
pub fn owner_and_repository(uri: &str) -> Result<(String, String)> {
    let segments = path_segments(uri)?;

    let (owner, repository) = match Provider::detect(uri) {
        Provider::AzureDevOps => (segments.first(), segments.get(3)),
        Provider::GitHub | Provider::Unknown => (segments.first(), segments.get(1)),
    };

    match (owner, repository) {
        (Some(owner), Some(repository)) => Ok((owner.clone(), repository.clone())),
        _ => Err(PicamError::Config {
            message: format!("repository URI {uri} does not name an owner and a repository"),
        }
        .into()),
    }
}

/// Last path segment of `uri`, which is also the published binary name.
pub fn repository_name(uri: &str) -> Result<String> {
    let segments = path_segments(uri)?;
    segments.last().cloned().ok_or_else(|| {
        PicamError::Config {
            message: format!("repository URI {uri} has an empty path"),
        }
        .into()
    })
}

fn path_segments(uri: &str) -> Result<Vec<String>> {
    let parsed = parse(uri)?;
    Ok(parsed
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default())
}
