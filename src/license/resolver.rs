use anyhow::{bail, Context, Result};

use crate::config::OverrideEntry;
use crate::license::spdx;
use crate::models::{
    Dependency, DependencyDecl, Discrepancy, MetadataDraft, SpdxSource, TextSource,
};
use crate::registry::github::GithubClient;

/// Turn a declaration plus whatever the registries reported into a fully
/// resolved record, or fail loudly with instructions for the operator.
///
/// The core of the resolution is a four-state matrix over (license text
/// present, SPDX id present): both present get cross-checked, an id without
/// text gets a template body, text without an id gets matched against known
/// licenses, and neither is an error that requires an override entry.
pub async fn resolve(
    github: &GithubClient,
    override_entry: Option<&OverrideEntry>,
    decl: &DependencyDecl,
    mut draft: MetadataDraft,
) -> Result<Dependency> {
    if let Some(entry) = override_entry {
        if let Some(spdx_id) = &entry.license_spdx {
            draft.license_spdx = Some(spdx_id.clone());
            draft.license_spdx_source = Some(SpdxSource::Project);
        }
        if let Some(discrepancy) = &entry.discrepancy {
            if !draft.discrepancies.contains(discrepancy) {
                draft.discrepancies.push(discrepancy.clone());
            }
        }
    }

    if let Some(raw) = &draft.license_spdx {
        if !spdx::is_compound(raw) {
            draft.license_spdx = Some(spdx::normalize(raw));
        }
    }

    let owner = draft
        .owner
        .clone()
        .with_context(|| format!("no owner found for {}/{}", decl.namespace, decl.name))?;

    let (license_text, license_spdx) = match (draft.license_text.take(), draft.license_spdx.take())
    {
        (Some(text), Some(id)) => {
            cross_check(decl, &text, &id)?;
            (text, id)
        }
        (None, None) => {
            bail!(
                "cannot determine license text or SPDX id for {}/{}; \
                 add an override entry with license_spdx",
                decl.namespace,
                decl.name
            );
        }
        (None, Some(id)) => {
            // fall back to a license template body for the known id
            let body = template_body(github, &id, &owner).await.with_context(|| {
                format!(
                    "building template license text for {}/{}",
                    decl.namespace, decl.name
                )
            })?;
            draft.license_text_source = Some(TextSource::SpdxTemplate);
            if !draft.discrepancies.contains(&Discrepancy::NoLicenseFile) {
                draft
                    .discrepancies
                    .push(Discrepancy::LicenseTextUnavailable);
            }
            (body, id)
        }
        (Some(text), None) => match spdx::infer_from_text(&text) {
            Some(id) => {
                draft.license_spdx_source = Some(SpdxSource::InferredFromText);
                (text, id.to_string())
            }
            None => bail!(
                "license text for {}/{} does not match any known license; \
                 add an override entry with license_spdx",
                decl.namespace,
                decl.name
            ),
        },
    };

    for id in spdx::component_ids(&license_spdx) {
        if !spdx::is_known_id(&id) {
            bail!(
                "invalid SPDX id {:?} for {}/{}",
                id,
                decl.namespace,
                decl.name
            );
        }
    }

    for url in [&draft.project_url, &draft.repo_url] {
        if let Some(url) = url {
            if let Some(problem) = validate_url(url) {
                draft
                    .discrepancies
                    .push(Discrepancy::RegistryBadUrl(problem));
            }
        }
    }

    Ok(Dependency {
        name: decl.name.clone(),
        namespace: decl.namespace,
        version: decl.version.clone(),
        source_file: decl.source_file.clone(),
        owner,
        project_url: draft.project_url,
        repo_url: draft.repo_url,
        description: draft
            .description
            .unwrap_or_else(|| format!("A {} package named {}", decl.namespace, decl.name)),
        license_spdx,
        license_spdx_source: draft
            .license_spdx_source
            .unwrap_or(SpdxSource::PackageRegistry),
        license_text,
        license_text_source: draft.license_text_source.unwrap_or(TextSource::Inline),
        notice_text: draft.notice_text,
        discrepancies: draft.discrepancies,
        is_modified: draft.is_modified,
    })
}

/// When both text and id are present, make sure they agree. Failure here
/// means the upstream metadata is lying somewhere and a human has to look.
fn cross_check(decl: &DependencyDecl, text: &str, declared: &str) -> Result<()> {
    let inferred = match spdx::infer_from_text(text) {
        Some(id) => id,
        // text didn't match any template, but we already have both pieces
        None => return Ok(()),
    };

    if spdx_agrees(declared, inferred) {
        return Ok(());
    }
    bail!(
        "SPDX mismatch for {}/{}: declared {} but the license text reads as {}; \
         add an override entry if the declared id is correct",
        decl.namespace,
        decl.name,
        declared,
        inferred
    )
}

fn spdx_agrees(declared: &str, inferred: &str) -> bool {
    if declared == inferred {
        return true;
    }
    if spdx::is_compound(declared) && spdx::component_ids(declared).iter().any(|id| id == inferred)
    {
        return true;
    }
    // don't quibble between BSD variants
    declared.starts_with("BSD-") && inferred.starts_with("BSD-")
}

/// Build license text from templates for a (possibly compound) id.
async fn template_body(github: &GithubClient, expr: &str, owner: &str) -> Result<String> {
    if !spdx::is_compound(expr) {
        return github.license_template(&github_license_key(expr), owner).await;
    }
    let mut body = String::new();
    for part in spdx::parts(expr) {
        match part {
            spdx::ExprPart::And => body.push_str("\n\nAND the following license:\n\n"),
            spdx::ExprPart::Or => body.push_str("\n\nOR the following license:\n\n"),
            spdx::ExprPart::Id(id) => {
                body.push_str(&github.license_template(&github_license_key(&id), owner).await?)
            }
        }
    }
    Ok(body)
}

/// GitHub license keys are lowercased SPDX ids (`MIT` → `mit`).
fn github_license_key(spdx_id: &str) -> String {
    spdx_id.to_lowercase()
}

/// Vet a project or repo URL. Returns a description of the problem(s), or
/// `None` when the URL is clean.
fn validate_url(url: &str) -> Option<String> {
    let mut problems = Vec::new();
    if !url.starts_with("https://") {
        problems.push("Scheme is not https://");
    }
    // a ';' only marks path parameters when it sits in the final path
    // segment; earlier segments may contain it legitimately
    let path = match url.find(|c| c == '?' || c == '#') {
        Some(idx) => &url[..idx],
        None => url,
    };
    let last_segment = path.rsplit('/').next().unwrap_or("");
    if url.contains('?') || last_segment.contains(';') {
        problems.push("URL includes parameters or a query string");
    }
    if url.contains('#') {
        problems.push("URL includes a #fragment");
    }
    if problems.is_empty() {
        None
    } else {
        Some(problems.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Namespace;
    use futures::executor::block_on;

    fn test_github() -> GithubClient {
        GithubClient::new(reqwest::Client::new(), None)
    }

    fn decl(name: &str) -> DependencyDecl {
        DependencyDecl {
            name: name.to_string(),
            namespace: Namespace::Npm,
            version: "^1.0.0".to_string(),
            source_file: "package.json".to_string(),
            repo_hint: None,
        }
    }

    fn draft_with(text: Option<&str>, spdx_id: Option<&str>) -> MetadataDraft {
        MetadataDraft {
            owner: Some("Jane Doe".to_string()),
            project_url: Some("https://example.com".to_string()),
            repo_url: Some("https://github.com/jane/pkg".to_string()),
            description: Some("A test package.".to_string()),
            license_spdx: spdx_id.map(str::to_string),
            license_spdx_source: spdx_id.map(|_| SpdxSource::PackageRegistry),
            license_text: text.map(str::to_string),
            license_text_source: text.map(|_| TextSource::Inline),
            ..Default::default()
        }
    }

    const MIT_TEXT: &str =
        "MIT License\n\nPermission is hereby granted, free of charge, to any person";

    #[test]
    fn test_resolve_text_and_spdx_agree() {
        let dep = block_on(resolve(
            &test_github(),
            None,
            &decl("pkg"),
            draft_with(Some(MIT_TEXT), Some("MIT")),
        ))
        .unwrap();
        assert_eq!(dep.license_spdx, "MIT");
        assert_eq!(dep.license_text_source, TextSource::Inline);
        assert!(dep.discrepancies.is_empty());
    }

    #[test]
    fn test_resolve_mismatch_fails() {
        let result = block_on(resolve(
            &test_github(),
            None,
            &decl("pkg"),
            draft_with(Some(MIT_TEXT), Some("GPL-3.0")),
        ));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("SPDX mismatch"));
    }

    #[test]
    fn test_resolve_nothing_fails() {
        let result = block_on(resolve(
            &test_github(),
            None,
            &decl("pkg"),
            draft_with(None, None),
        ));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("add an override entry"));
    }

    #[test]
    fn test_resolve_infers_from_text() {
        let dep = block_on(resolve(
            &test_github(),
            None,
            &decl("pkg"),
            draft_with(Some(MIT_TEXT), None),
        ))
        .unwrap();
        assert_eq!(dep.license_spdx, "MIT");
        assert_eq!(dep.license_spdx_source, SpdxSource::InferredFromText);
    }

    #[test]
    fn test_resolve_normalizes_registry_spelling() {
        let dep = block_on(resolve(
            &test_github(),
            None,
            &decl("pkg"),
            draft_with(Some(MIT_TEXT), Some("MIT License")),
        ))
        .unwrap();
        assert_eq!(dep.license_spdx, "MIT");
    }

    #[test]
    fn test_resolve_rejects_unknown_id() {
        let result = block_on(resolve(
            &test_github(),
            None,
            &decl("pkg"),
            draft_with(Some(MIT_TEXT), Some("Custom-1.0")),
        ));
        assert!(result.unwrap_err().to_string().contains("invalid SPDX id"));
    }

    #[test]
    fn test_override_wins() {
        let entry = OverrideEntry {
            license_spdx: Some("(BSD-2-Clause OR GPL-2.0)".to_string()),
            repo_url: None,
            discrepancy: Some(Discrepancy::NonstandardLicense),
            note: None,
        };
        let mut draft = draft_with(Some("unrecognizable combo license text"), None);
        draft.license_spdx_source = None;
        let dep = block_on(resolve(&test_github(), Some(&entry), &decl("sjcl"), draft)).unwrap();
        assert_eq!(dep.license_spdx, "(BSD-2-Clause OR GPL-2.0)");
        assert_eq!(dep.license_spdx_source, SpdxSource::Project);
        assert!(dep.discrepancies.contains(&Discrepancy::NonstandardLicense));
    }

    #[test]
    fn test_bad_url_recorded() {
        let mut draft = draft_with(Some(MIT_TEXT), Some("MIT"));
        draft.project_url = Some("http://example.com/page#readme".to_string());
        let dep = block_on(resolve(&test_github(), None, &decl("pkg"), draft)).unwrap();
        assert!(dep
            .discrepancies
            .iter()
            .any(|d| matches!(d, Discrepancy::RegistryBadUrl(_))));
    }

    #[test]
    fn test_spdx_agrees_rules() {
        assert!(spdx_agrees("MIT", "MIT"));
        assert!(spdx_agrees("(MIT OR CC-BY-4.0)", "MIT"));
        assert!(spdx_agrees("BSD-3-Clause", "BSD-2-Clause"));
        assert!(!spdx_agrees("GPL-3.0", "MIT"));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://github.com/foo/bar").is_none());
        assert_eq!(
            validate_url("http://github.com/foo/bar").as_deref(),
            Some("Scheme is not https://")
        );
        assert!(validate_url("https://example.com/x?y=1#z")
            .unwrap()
            .contains("fragment"));
    }

    #[test]
    fn test_validate_url_semicolon_placement() {
        // a ';' in an earlier path segment is not a parameter marker
        assert!(validate_url("https://example.com/a;b/page").is_none());
        assert!(validate_url("https://example.com/page;type=raw")
            .unwrap()
            .contains("parameters"));
    }
}
