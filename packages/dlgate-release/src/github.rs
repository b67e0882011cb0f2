use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use dlgate_cache::CacheManager;
use dlgate_utils::http::{get, http_status_is_ok};

pub const GITHUB_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "dlgate";

/// One entry of a repository's release list, newest-first as returned by
/// the GitHub API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionInfo {
    pub latest: Option<ReleaseInfo>,
    pub latest_stable: Option<ReleaseInfo>,
}

/// Strip a single leading `v` from a release tag. Idempotent on tags
/// without the prefix.
pub fn extract_version_from_tag(tag_name: &str) -> &str {
    tag_name.strip_prefix('v').unwrap_or(tag_name)
}

pub struct GitHubClient {
    api_base: String,
    cache: Arc<CacheManager>,
}

impl GitHubClient {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self::with_api_base(cache, GITHUB_API_URL)
    }

    /// Point the client at a different API host (used by tests).
    pub fn with_api_base(cache: Arc<CacheManager>, api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            cache,
        }
    }

    /// Full release list for `owner/repo`, or `None` on any upstream
    /// failure. Successful bodies are cached for the cache's TTL, keyed
    /// by request URL.
    pub async fn get_releases(&self, owner: &str, repo: &str) -> Option<Vec<ReleaseInfo>> {
        let url = format!("{}/repos/{}/{}/releases", self.api_base, owner, repo);

        let cached = self.cache.get(&url).await.ok().flatten();
        let body = match cached {
            Some(body) => body,
            None => {
                let body = self.fetch(&url).await?;
                let _ = self.cache.set(&url, &body).await;
                body
            }
        };

        serde_json::from_str::<Vec<ReleaseInfo>>(&body).ok()
    }

    /// Latest and latest-stable release descriptors. Both are `None` when
    /// the list is empty or could not be fetched.
    pub async fn get_version_info(&self, owner: &str, repo: &str) -> VersionInfo {
        let releases = match self.get_releases(owner, repo).await {
            Some(releases) => releases,
            None => return VersionInfo::default(),
        };
        let latest = releases.first().cloned();
        let latest_stable = releases.iter().find(|r| !r.prerelease).cloned();
        VersionInfo {
            latest,
            latest_stable,
        }
    }

    async fn fetch(&self, url: &str) -> Option<String> {
        let parsed_url = url.parse().ok()?;
        let header_map = HashMap::from([
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            (
                "Accept".to_string(),
                "application/vnd.github.v3+json".to_string(),
            ),
        ]);
        let rsp = get(parsed_url, &header_map).await.ok()?;
        if !http_status_is_ok(rsp.status) {
            return None;
        }
        rsp.body
            .map(|body| String::from_utf8_lossy(&body).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_version_from_tag() {
        assert_eq!(extract_version_from_tag("v2.3.1"), "2.3.1");
        assert_eq!(extract_version_from_tag("2.3.1"), "2.3.1");
        assert_eq!(extract_version_from_tag(""), "");
        // Only a single leading 'v' is stripped.
        assert_eq!(extract_version_from_tag("vv1.0"), "v1.0");
    }
}
