use anyhow::{bail, Context, Result};

use crate::models::{DependencyDecl, MetadataDraft, SpdxSource, TextSource};
use crate::registry::github::GithubClient;

/// Resolve metadata for a Go module. Go has no central registry carrying
/// license data, so everything comes from the code host: GitHub directly,
/// or a vanity-import host that redirects there.
pub async fn fetch_metadata(github: &GithubClient, decl: &DependencyDecl) -> Result<MetadataDraft> {
    let repo = decl
        .repo_hint
        .as_ref()
        .with_context(|| format!("Go module {:?} carries no repo location", decl.name))?;

    let mut draft = MetadataDraft::default();
    let mut license_text_url = None;
    let github_slug;

    match repo.host.as_str() {
        "github.com" => {
            let slug = repo.github_slug();
            let url = format!("https://github.com/{}", slug);
            draft.project_url = Some(url.clone());
            draft.repo_url = Some(url);
            draft.owner = Some(github.owner_name(&slug).await?);

            let repo_data = github.repo(&slug).await?;
            draft.description = repo_data.description;
            if let Some(spdx) = repo_data.license.as_ref().and_then(|l| l.recognized_spdx()) {
                draft.license_spdx = Some(spdx.to_string());
                draft.license_spdx_source = Some(SpdxSource::Github);
            }
            github_slug = Some(slug);
        }

        "google.golang.org" => {
            let url = format!("https://google.golang.org/{}", repo.repo);
            draft.project_url = Some(url.clone());
            draft.repo_url = Some(url);
            draft.owner = Some("Google".to_string());
            draft.license_spdx = Some("Apache-2.0".to_string());
            draft.license_spdx_source = Some(SpdxSource::Project);
            draft.description = google_module_description(&repo.repo).map(str::to_string);
            github_slug = None;
        }

        "go.uber.org" => {
            let slug = format!("uber-go/{}", repo.repo);
            let url = format!("https://github.com/{}", slug);
            draft.project_url = Some(url.clone());
            draft.repo_url = Some(url);
            draft.owner = Some("Uber Technologies, Inc.".to_string());

            let repo_data = github.repo(&slug).await?;
            draft.description = repo_data.description;
            if let Some(spdx) = repo_data.license.as_ref().and_then(|l| l.recognized_spdx()) {
                draft.license_spdx = Some(spdx.to_string());
                draft.license_spdx_source = Some(SpdxSource::Github);
            }
            github_slug = Some(slug);
        }

        "golang.org" => {
            let slug = format!("golang/{}", repo.repo);
            let url = format!("https://github.com/{}", slug);
            draft.project_url = Some(url.clone());
            draft.repo_url = Some(url);
            draft.owner = Some("The Go Authors".to_string());

            let repo_data = github.repo(&slug).await?;
            draft.description = repo_data.description;

            // GitHub does not recognize the Go Authors' license file, so go
            // straight to the raw text.
            license_text_url = Some(format!(
                "https://raw.githubusercontent.com/golang/{}/master/LICENSE",
                repo.repo
            ));
            github_slug = Some(slug);
        }

        "willnorris.com" => {
            let slug = format!("willnorris/{}", repo.repo);
            let url = format!("https://github.com/{}", slug);
            draft.project_url = Some(url.clone());
            draft.repo_url = Some(url);
            draft.owner = Some("Will Norris".to_string());

            let repo_data = github.repo(&slug).await?;
            draft.description = repo_data.description;
            if let Some(spdx) = repo_data.license.as_ref().and_then(|l| l.recognized_spdx()) {
                draft.license_spdx = Some(spdx.to_string());
                draft.license_spdx_source = Some(SpdxSource::Github);
            }
            github_slug = Some(slug);
        }

        other => bail!(
            "unhandled Go module host {:?} for {}; add an override entry",
            other,
            decl.name
        ),
    }

    if let Some(url) = &license_text_url {
        if let Some(text) = github.slurp(url, false).await? {
            draft.license_text = Some(text);
            draft.license_text_source = Some(TextSource::Project);
        }
    }

    if let Some(slug) = &github_slug {
        if draft.license_text.is_none() {
            if let Some(text) = github.find_license_file(slug).await? {
                draft.license_text = Some(text);
                draft.license_text_source = Some(TextSource::Inline);
            }
        }
        draft.notice_text = github.find_notice_file(slug).await?;
    }

    if draft.description.is_none() {
        draft.description = Some(format!("This is a Go package called {}.", decl.name));
    }

    Ok(draft)
}

/// Module blurbs for the google.golang.org vanity host, which carries no
/// queryable metadata. See https://cloud.google.com/go/google.golang.org.
fn google_module_description(repo: &str) -> Option<&'static str> {
    match repo {
        "api" => Some(
            "A set of auto-generated packages that provide low-level access to various Google APIs",
        ),
        "appengine" => {
            Some("A set of packages that provide access to the Google App Engine APIs.")
        }
        "cloud" => Some(
            "A set of idiomatically-designed packages that provide access to Google Cloud Platform APIs.",
        ),
        "genproto" => Some("Protocol code related to Google services"),
        "grpc" => Some("Package grpc implements an RPC system called gRPC."),
        "protobuf" => Some("Go support for Google's protocol buffers"),
        _ => None,
    }
}
