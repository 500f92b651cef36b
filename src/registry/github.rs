use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

const API_ROOT: &str = "https://api.github.com";
const RAW_ROOT: &str = "https://raw.githubusercontent.com";
const USER_AGENT: &str = "notice-crawlr/0.1.0 (legal compliance crawler)";

/// Attempts per request before giving up on a rate-limited endpoint.
const MAX_ATTEMPTS: u32 = 3;
const MAX_BACKOFF_SECS: u64 = 60;

/// Filenames likely to hold the full license text at the top of a repo.
pub const LICENSE_FILENAMES: &[&str] = &[
    "LICENSE",
    "LICENSE.txt",
    "LICENSE.md",
    "LICENCE.md",
    "LICENSE.rst",
    "LICENSE.markdown",
    "license",
    "license.txt",
    "License",
    "LICENSE-MIT.txt",
];

pub const NOTICE_FILENAMES: &[&str] = &["NOTICE", "NOTICE.txt"];

/// GitHub API session. The token is a read-only personal access token used
/// purely to avoid the strict rate limits on anonymous requests.
pub struct GithubClient {
    http: Client,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RepoData {
    pub description: Option<String>,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub fork: bool,
    pub source: Option<RepoSummary>,
    pub owner: RepoOwner,
    pub license: Option<RepoLicense>,
}

#[derive(Debug, Deserialize)]
pub struct RepoSummary {
    pub full_name: String,
    pub owner: RepoOwner,
}

#[derive(Debug, Deserialize)]
pub struct RepoOwner {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct RepoLicense {
    pub key: String,
    pub spdx_id: Option<String>,
}

impl RepoLicense {
    /// GitHub uses the key `other` when it can't identify the license;
    /// that carries no usable SPDX id.
    pub fn recognized_spdx(&self) -> Option<&str> {
        if self.key == "other" {
            return None;
        }
        self.spdx_id.as_deref().filter(|id| *id != "NOASSERTION")
    }
}

#[derive(Debug, Deserialize)]
struct UserData {
    login: String,
    name: Option<String>,
}

impl GithubClient {
    pub fn new(http: Client, token: Option<String>) -> Self {
        Self { http, token }
    }

    /// GET with bounded retries on 403/429, honoring `retry-after` or the
    /// rate-limit reset header when present.
    async fn get_with_backoff(&self, url: &str, authenticated: bool) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let mut req = self
                .http
                .get(url)
                .header("User-Agent", USER_AGENT)
                .header("Accept", "application/vnd.github.v3+json");
            if authenticated {
                if let Some(token) = &self.token {
                    req = req.header("Authorization", format!("token {}", token));
                }
            }

            let response = req.send().await.with_context(|| format!("GET {}", url))?;
            let status = response.status();

            attempt += 1;
            if rate_limited(status, response.headers()) && attempt < MAX_ATTEMPTS {
                let wait = backoff_secs(response.headers());
                eprintln!(
                    "rate limited by {}; backing off {}s (attempt {}/{})",
                    url, wait, attempt, MAX_ATTEMPTS
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            return Ok(response);
        }
    }

    async fn api_get(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}/{}", API_ROOT, path);
        let response = self.get_with_backoff(&url, true).await?;
        let status = response.status();
        let value: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("decoding GitHub response for {}", path))?;

        if !status.is_success() {
            let message = value
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("no message");
            bail!("GET {} failed: HTTP {} ({})", path, status, message);
        }
        Ok(value)
    }

    /// Repo metadata: description, default branch, fork lineage, license.
    pub async fn repo(&self, slug: &str) -> Result<RepoData> {
        let value = self.api_get(&format!("repos/{}", slug)).await?;
        Ok(serde_json::from_value(value)
            .with_context(|| format!("unexpected repo payload for {}", slug))?)
    }

    /// Display name of a user or organization, falling back to the login.
    pub async fn user_display_name(&self, login: &str) -> Result<String> {
        let value = self.api_get(&format!("users/{}", login)).await?;
        let user: UserData = serde_json::from_value(value)
            .with_context(|| format!("unexpected user payload for {}", login))?;
        match user.name {
            Some(name) if name != user.login => Ok(name),
            _ => Ok(format!("GitHub user \"{}\"", user.login)),
        }
    }

    /// Real name of a repo's owner. Forks also credit the upstream owner,
    /// since a NOTICE for a fork must acknowledge the original authors.
    pub async fn owner_name(&self, slug: &str) -> Result<String> {
        let repo = self.repo(slug).await?;
        let mut owner = self.user_display_name(&repo.owner.login).await?;
        if repo.fork {
            if let Some(source) = &repo.source {
                let upstream = self.user_display_name(&source.owner.login).await?;
                owner.push_str(&format!(
                    ", modified (forked) from original GitHub repo '{}' owned by {}",
                    source.full_name, upstream
                ));
            }
        }
        Ok(owner)
    }

    /// License body for a license key (`mit`, `apache-2.0`, ...), with the
    /// template's copyright placeholders filled in.
    pub async fn license_template(&self, key: &str, owner: &str) -> Result<String> {
        if key == "other" {
            bail!("\"other\" is not a valid GitHub license key");
        }
        let value = self.api_get(&format!("licenses/{}", key)).await?;
        let body = value
            .get("body")
            .and_then(|b| b.as_str())
            .with_context(|| format!("license {} has no body", key))?;
        let year = chrono::Utc::now().format("%Y").to_string();
        Ok(body
            .replace("[fullname]", owner)
            .replace("[name of copyright owner]", owner)
            .replace("[year]", &year)
            .replace("[yyyy]", &year))
    }

    /// Fetch a URL's body. `Ok(None)` on 404 when `fail_missing` is off.
    pub async fn slurp(&self, url: &str, fail_missing: bool) -> Result<Option<String>> {
        let response = self.get_with_backoff(url, false).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(Some(response.text().await?));
        }
        if status == StatusCode::NOT_FOUND && !fail_missing {
            return Ok(None);
        }
        bail!("{} -> HTTP {}", url, status);
    }

    /// Probe the raw-file host for the first of `filenames` that exists at
    /// the top of `slug`. Tries `master` first, then the repo's actual
    /// default branch when that misses.
    pub async fn find_repo_file(
        &self,
        slug: &str,
        filenames: &[&str],
    ) -> Result<Option<String>> {
        if let Some(text) = self.probe_branch(slug, "master", filenames).await? {
            return Ok(Some(text));
        }

        let repo = self.repo(slug).await?;
        match repo.default_branch.as_deref() {
            Some(branch) if branch != "master" => self.probe_branch(slug, branch, filenames).await,
            _ => Ok(None),
        }
    }

    pub async fn find_license_file(&self, slug: &str) -> Result<Option<String>> {
        self.find_repo_file(slug, LICENSE_FILENAMES).await
    }

    pub async fn find_notice_file(&self, slug: &str) -> Result<Option<String>> {
        self.find_repo_file(slug, NOTICE_FILENAMES).await
    }

    async fn probe_branch(
        &self,
        slug: &str,
        branch: &str,
        filenames: &[&str],
    ) -> Result<Option<String>> {
        for filename in filenames {
            let url = format!("{}/{}/{}/{}", RAW_ROOT, slug, branch, filename);
            if let Some(text) = self.slurp(&url, false).await? {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}

fn rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    // GitHub reports primary rate limiting as 403 with a zeroed remaining count.
    status == StatusCode::FORBIDDEN
        && header_u64(headers, "x-ratelimit-remaining") == Some(0)
}

fn backoff_secs(headers: &HeaderMap) -> u64 {
    if let Some(secs) = header_u64(headers, "retry-after") {
        return secs.min(MAX_BACKOFF_SECS);
    }
    if let Some(reset) = header_u64(headers, "x-ratelimit-reset") {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        return reset.saturating_sub(now).clamp(1, MAX_BACKOFF_SECS);
    }
    10
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

/// Extract the `account/repo` slug from a GitHub repo URL.
pub fn slug_from_url(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("http://github.com/"))?;
    let mut parts = rest.split('/');
    let account = parts.next()?;
    let repo = parts.next()?.trim_end_matches(".git");
    if account.is_empty() || repo.is_empty() {
        return None;
    }
    Some(format!("{}/{}", account, repo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_from_url() {
        assert_eq!(
            slug_from_url("https://github.com/gorilla/mux").as_deref(),
            Some("gorilla/mux")
        );
        assert_eq!(
            slug_from_url("https://github.com/gorilla/mux.git").as_deref(),
            Some("gorilla/mux")
        );
        assert_eq!(
            slug_from_url("https://github.com/facebook/react/tree/main").as_deref(),
            Some("facebook/react")
        );
        assert!(slug_from_url("https://example.com/foo/bar").is_none());
    }

    #[test]
    fn test_recognized_spdx() {
        let lic = RepoLicense {
            key: "mit".to_string(),
            spdx_id: Some("MIT".to_string()),
        };
        assert_eq!(lic.recognized_spdx(), Some("MIT"));

        let other = RepoLicense {
            key: "other".to_string(),
            spdx_id: Some("NOASSERTION".to_string()),
        };
        assert_eq!(other.recognized_spdx(), None);
    }

    #[test]
    fn test_backoff_prefers_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", "5".parse().unwrap());
        assert_eq!(backoff_secs(&headers), 5);
    }

    #[test]
    fn test_backoff_caps_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", "600".parse().unwrap());
        assert_eq!(backoff_secs(&headers), MAX_BACKOFF_SECS);
    }

    #[test]
    fn test_rate_limited_requires_exhausted_quota() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", "42".parse().unwrap());
        assert!(!rate_limited(StatusCode::FORBIDDEN, &headers));

        headers.insert("x-ratelimit-remaining", "0".parse().unwrap());
        assert!(rate_limited(StatusCode::FORBIDDEN, &headers));
        assert!(rate_limited(StatusCode::TOO_MANY_REQUESTS, &HeaderMap::new()));
    }
}
