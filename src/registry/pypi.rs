use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde_json::Value;

use crate::models::{DependencyDecl, Discrepancy, MetadataDraft, SpdxSource, TextSource};
use crate::registry::github::{slug_from_url, GithubClient};

/// Fetch PyPI metadata for one package and translate its license string.
pub async fn fetch_metadata(
    http: &Client,
    github: &GithubClient,
    decl: &DependencyDecl,
) -> Result<MetadataDraft> {
    let url = format!("https://pypi.org/pypi/{}/json", decl.name);
    let response = http
        .get(&url)
        .header("User-Agent", "notice-crawlr/0.1.0")
        .send()
        .await
        .with_context(|| format!("querying PyPI for {}", decl.name))?;

    if !response.status().is_success() {
        bail!(
            "PyPI lookup for {:?} failed: HTTP {}",
            decl.name,
            response.status()
        );
    }
    let data: Value = response.json().await?;
    let info = data
        .get("info")
        .with_context(|| format!("PyPI entry for {:?} has no info block", decl.name))?;

    let mut draft = MetadataDraft::default();

    match info.get("license").and_then(|l| l.as_str()) {
        Some(raw) if !raw.is_empty() => {
            // some entries wrap the license in stray quotes
            let raw = raw.trim_matches('"');
            match translate_license(raw) {
                Some(spdx) => {
                    draft.license_spdx = Some(spdx.to_string());
                    draft.license_spdx_source = Some(SpdxSource::PackageRegistry);
                }
                None => bail!(
                    "no SPDX translation of PyPI license {:?} for package {:?}; \
                     add an override entry",
                    raw,
                    decl.name
                ),
            }
        }
        _ => draft.discrepancies.push(Discrepancy::RegistryNoLicense),
    }

    let home_page = info
        .get("home_page")
        .and_then(|h| h.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    if let Some(slug) = home_page.as_deref().and_then(slug_from_url) {
        if let Some(text) = github.find_license_file(&slug).await? {
            draft.license_text = Some(text);
            draft.license_text_source = Some(TextSource::Inline);
        }
        draft.notice_text = github.find_notice_file(&slug).await?;
    }

    let mut owner = info
        .get("author")
        .and_then(|a| a.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| {
            info.get("maintainer")
                .and_then(|m| m.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        });
    if owner.is_none() {
        draft.discrepancies.push(Discrepancy::RegistryNoAuthor);
        if let Some(slug) = home_page.as_deref().and_then(slug_from_url) {
            owner = Some(github.owner_name(&slug).await?);
        }
    }

    draft.owner = owner;
    draft.repo_url = info
        .get("project_url")
        .and_then(|u| u.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    draft.description = info
        .get("summary")
        .and_then(|s| s.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| Some(format!("A PyPI package named {}", decl.name)));
    draft.project_url = home_page;

    Ok(draft)
}

/// PyPI license strings are free-form; only spellings seen in the wild are
/// translated. An unknown spelling is a hard error so the operator reviews
/// it instead of shipping a mislabeled NOTICE entry.
fn translate_license(raw: &str) -> Option<&'static str> {
    match raw {
        "Apache License, Version 2.0" | "Apache License 2.0" | "Apache 2.0" => Some("Apache-2.0"),
        "CC0-1.0" => Some("CC0-1.0"),
        "MIT" | "MIT License" => Some("MIT"),
        "BSD-2-Clause" => Some("BSD-2-Clause"),
        // "BSD" alone is ambiguous: assume the more restrictive 3-clause
        // variant and let the text cross-check catch real mismatches.
        "BSD" | "BSD License" | "BSD-like" => Some("BSD-3-Clause"),
        "MPL-2.0" | "MPL2" => Some("MPL-2.0"),
        "Standard PIL License" => Some("MIT"),
        "LGPL" => Some("LGPL-2.1"),
        "BSD or Apache License, Version 2.0" => Some("(BSD-3-Clause OR Apache-2.0)"),
        "Python Software Foundation License" | "PSF" => Some("Python-2.0"),
        "LGPL with exceptions or ZPL" => Some("(LGPL-3.0 OR ZPL-2.1)"),
        "ZPL 2.1" => Some("ZPL-2.1"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_known_spellings() {
        assert_eq!(translate_license("Apache 2.0"), Some("Apache-2.0"));
        assert_eq!(translate_license("BSD"), Some("BSD-3-Clause"));
        assert_eq!(translate_license("PSF"), Some("Python-2.0"));
    }

    #[test]
    fn test_translate_unknown() {
        assert_eq!(translate_license("My Custom License"), None);
    }
}
