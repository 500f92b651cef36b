use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde_json::Value;

use crate::config::OverrideEntry;
use crate::models::{DependencyDecl, Discrepancy, MetadataDraft, SpdxSource, TextSource};
use crate::registry::github::{slug_from_url, GithubClient};

/// Fetch and normalize npm registry metadata for one package.
///
/// The registry document is authoritative for name/author/description/license
/// but is frequently incomplete; each gap falls back to GitHub (recording a
/// discrepancy) and, failing that, to the operator override table.
pub async fn fetch_metadata(
    http: &Client,
    github: &GithubClient,
    decl: &DependencyDecl,
    override_entry: Option<&OverrideEntry>,
) -> Result<MetadataDraft> {
    let data = fetch_registry_doc(http, &decl.name).await?;
    let latest = latest_version(&data);

    let mut draft = MetadataDraft::default();

    // -- repository URL ----------------------------------------------------
    let repo_url = match data
        .get("repository")
        .and_then(|r| r.get("url"))
        .and_then(|u| u.as_str())
    {
        Some(raw) => clean_repo_url(raw),
        None => match override_entry.and_then(|o| o.repo_url.clone()) {
            Some(url) => {
                draft.discrepancies.push(Discrepancy::RegistryNoRepo);
                url
            }
            None => bail!(
                "unable to determine repo URL for npm package {:?}; \
                 add an override entry with repo_url",
                decl.name
            ),
        },
    };
    let github_slug = slug_from_url(&repo_url);

    // -- author ------------------------------------------------------------
    let owner = match author_name(&data).or_else(|| latest.and_then(author_name)) {
        Some(name) => name,
        None => {
            draft.discrepancies.push(Discrepancy::RegistryNoAuthor);
            match &github_slug {
                Some(slug) => github.owner_name(slug).await?,
                None => bail!(
                    "unable to determine owner for npm package {:?}",
                    decl.name
                ),
            }
        }
    };

    // -- description ---------------------------------------------------------
    let description = match string_field(&data, "description")
        .or_else(|| latest.and_then(|v| string_field(v, "description")))
    {
        Some(text) => Some(text),
        None => {
            draft.discrepancies.push(Discrepancy::RegistryNoDescription);
            match &github_slug {
                Some(slug) => {
                    let repo = github.repo(slug).await?;
                    if repo.description.is_none() {
                        draft.discrepancies.push(Discrepancy::GithubNoDescription);
                    }
                    repo.description
                }
                None => None,
            }
        }
    };
    let description = match description {
        Some(text) => text,
        None => bail!(
            "unable to determine description for npm package {:?}",
            decl.name
        ),
    };

    // -- license -------------------------------------------------------------
    let mut license_text_url = None;
    match data.get("license") {
        Some(Value::String(spdx)) => {
            draft.license_spdx = Some(spdx.clone());
            draft.license_spdx_source = Some(SpdxSource::PackageRegistry);
        }
        Some(Value::Object(obj)) => {
            // older registry entries use {type, url}
            draft.license_spdx = obj.get("type").and_then(|t| t.as_str()).map(str::to_string);
            draft.license_spdx_source = Some(SpdxSource::PackageRegistry);
            license_text_url = obj.get("url").and_then(|u| u.as_str()).map(|url| {
                // sometimes mis-reported as an HTML link instead of raw
                if url.contains("github.com") && url.contains("/blob/") {
                    url.replace("/blob/", "/raw/")
                } else {
                    url.to_string()
                }
            });
        }
        Some(Value::Array(list)) => {
            let ids: Vec<&str> = list.iter().filter_map(|v| v.as_str()).collect();
            draft.license_spdx = Some(format!("({})", ids.join(" AND ")));
            draft.license_spdx_source = Some(SpdxSource::PackageRegistry);
        }
        _ => {
            draft.discrepancies.push(Discrepancy::RegistryNoLicense);
            if let Some(slug) = &github_slug {
                let repo = github.repo(slug).await?;
                if let Some(spdx) = repo.license.as_ref().and_then(|l| l.recognized_spdx()) {
                    draft.license_spdx = Some(spdx.to_string());
                    draft.license_spdx_source = Some(SpdxSource::Github);
                }
            }
        }
    }

    if let Some(url) = &license_text_url {
        if let Some(text) = github.slurp(url, false).await? {
            draft.license_text = Some(text);
            draft.license_text_source = Some(TextSource::PackageRegistry);
        }
    }

    if draft.license_text.is_none() {
        if let Some(slug) = &github_slug {
            if let Some(text) = github.find_license_file(slug).await? {
                draft.license_text = Some(text);
                draft.license_text_source = Some(TextSource::Inline);
            }
        }
    }

    if let Some(slug) = &github_slug {
        draft.notice_text = github.find_notice_file(slug).await?;
    }

    // -- modified-fork check --------------------------------------------------
    // A github: version range pointing somewhere other than the registry's
    // repo means we're shipping a modified copy.
    if let Some(hint) = &decl.repo_hint {
        draft.is_modified = match &github_slug {
            Some(slug) => Some(*slug != hint.github_slug()),
            None => Some(true),
        };
    }

    draft.project_url = string_field(&data, "homepage").or_else(|| Some(repo_url.clone()));
    draft.owner = Some(owner);
    draft.description = Some(description);
    draft.repo_url = Some(repo_url);

    Ok(draft)
}

async fn fetch_registry_doc(http: &Client, name: &str) -> Result<Value> {
    // scoped packages need URL encoding: @scope/pkg → %40scope%2Fpkg
    let encoded = name.replace('@', "%40").replace('/', "%2F");
    let url = format!("https://registry.npmjs.org/{}", encoded);

    let response = http
        .get(&url)
        .header("User-Agent", "notice-crawlr/0.1.0")
        .header("Accept", "application/json")
        .send()
        .await
        .with_context(|| format!("querying npm registry for {}", name))?;

    if !response.status().is_success() {
        bail!(
            "npm registry lookup for {:?} failed: HTTP {}",
            name,
            response.status()
        );
    }
    Ok(response.json().await?)
}

/// The document for the `dist-tags.latest` version, when present. Some
/// packages only record author/description there.
fn latest_version(data: &Value) -> Option<&Value> {
    let tag = data
        .get("dist-tags")
        .and_then(|d| d.get("latest"))
        .and_then(|v| v.as_str())?;
    data.get("versions").and_then(|vs| vs.get(tag))
}

fn string_field(data: &Value, field: &str) -> Option<String> {
    data.get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Author can be `{"name": ...}` or a bare string; contributors are the
/// fallback and come in both shapes too.
fn author_name(data: &Value) -> Option<String> {
    if let Some(author) = data.get("author") {
        if let Some(name) = person_name(author) {
            return Some(name);
        }
    }
    data.get("contributors")
        .and_then(|c| c.as_array())
        .and_then(|list| list.first())
        .and_then(person_name)
}

fn person_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("name")
            .and_then(|n| n.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Normalize the registry's repository URL into a clean `https://` form:
/// strip git schemes, embedded usernames, and the `.git` suffix.
fn clean_repo_url(raw: &str) -> String {
    let mut url = raw.to_string();

    if let Some(rest) = url.strip_prefix("git@github.com:") {
        url = format!("https://github.com/{}", rest);
    }

    let rest = match url.split_once("://") {
        Some((_, rest)) => rest,
        None => url.as_str(),
    };

    let (netloc, path) = match rest.split_once('/') {
        Some((netloc, path)) => (netloc, path),
        None => (rest, ""),
    };

    // remove any user@ prefix from the host
    let netloc = netloc.rsplit('@').next().unwrap_or(netloc);

    let mut cleaned = if path.is_empty() {
        format!("https://{}", netloc)
    } else {
        format!("https://{}/{}", netloc, path)
    };
    if let Some(stripped) = cleaned.strip_suffix(".git") {
        cleaned = stripped.to_string();
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_repo_url() {
        assert_eq!(
            clean_repo_url("git+https://github.com/foo/bar.git"),
            "https://github.com/foo/bar"
        );
        assert_eq!(
            clean_repo_url("git@github.com:foo/bar.git"),
            "https://github.com/foo/bar"
        );
        assert_eq!(
            clean_repo_url("git://github.com/foo/bar"),
            "https://github.com/foo/bar"
        );
        assert_eq!(
            clean_repo_url("https://user@github.com/foo/bar"),
            "https://github.com/foo/bar"
        );
    }

    #[test]
    fn test_author_name_shapes() {
        assert_eq!(
            author_name(&json!({"author": {"name": "Jane Doe"}})).as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(
            author_name(&json!({"author": "Jane Doe"})).as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(
            author_name(&json!({"contributors": ["First Person", "Second"]})).as_deref(),
            Some("First Person")
        );
        assert_eq!(
            author_name(&json!({"contributors": [{"name": "First Person"}]})).as_deref(),
            Some("First Person")
        );
        assert!(author_name(&json!({})).is_none());
    }

    #[test]
    fn test_latest_version() {
        let doc = json!({
            "dist-tags": {"latest": "2.0.0"},
            "versions": {
                "1.0.0": {"description": "old"},
                "2.0.0": {"description": "new"}
            }
        });
        let latest = latest_version(&doc).unwrap();
        assert_eq!(string_field(latest, "description").as_deref(), Some("new"));
    }
}
