use serde::{Deserialize, Serialize};

/// A dependency as declared in a project manifest, before any registry lookup.
#[derive(Debug, Clone)]
pub struct DependencyDecl {
    pub name: String,
    pub namespace: Namespace,
    /// Declared version or range, `*` when the manifest doesn't pin one.
    pub version: String,
    /// Manifest file (relative to the project root) this came from.
    pub source_file: String,
    /// Known code location, when the manifest itself tells us (Go module
    /// paths, npm `github:` ranges).
    pub repo_hint: Option<RepoRef>,
}

/// Host/account/repo triple pointing at the upstream code.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoRef {
    pub host: String,
    /// `None` for single-segment hosts like `google.golang.org/grpc`.
    pub account: Option<String>,
    pub repo: String,
}

impl RepoRef {
    /// `account/repo` slug for GitHub API paths.
    pub fn github_slug(&self) -> String {
        match &self.account {
            Some(account) => format!("{}/{}", account, self.repo),
            None => self.repo.clone(),
        }
    }
}

/// Fully resolved dependency record, ready for report rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub namespace: Namespace,
    pub version: String,
    pub source_file: String,
    pub owner: String,
    pub project_url: Option<String>,
    pub repo_url: Option<String>,
    pub description: String,
    /// SPDX identifier; may be compound like `(MIT OR Apache-2.0)`.
    pub license_spdx: String,
    pub license_spdx_source: SpdxSource,
    pub license_text: String,
    pub license_text_source: TextSource,
    /// Upstream NOTICE file contents we are required to reproduce.
    pub notice_text: Option<String>,
    pub discrepancies: Vec<Discrepancy>,
    /// Whether the shipped code diverges from upstream. `None` when unknown.
    pub is_modified: Option<bool>,
}

impl Dependency {
    /// Short name with any leading scope/account stripped (`@scope/pkg` → `pkg`).
    pub fn short_name(&self) -> String {
        match self.name.split_once('/') {
            Some((_, rest)) => rest.to_string(),
            None => self.name.clone(),
        }
    }
}

/// Partially filled metadata gathered from a registry or code host.
/// The resolver turns this plus a [`DependencyDecl`] into a [`Dependency`].
#[derive(Debug, Clone, Default)]
pub struct MetadataDraft {
    pub owner: Option<String>,
    pub project_url: Option<String>,
    pub repo_url: Option<String>,
    pub description: Option<String>,
    pub license_spdx: Option<String>,
    pub license_spdx_source: Option<SpdxSource>,
    pub license_text: Option<String>,
    pub license_text_source: Option<TextSource>,
    pub notice_text: Option<String>,
    pub discrepancies: Vec<Discrepancy>,
    pub is_modified: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Npm,
    Golang,
    Pypi,
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Namespace::Npm => write!(f, "npm"),
            Namespace::Golang => write!(f, "golang"),
            Namespace::Pypi => write!(f, "pypi"),
        }
    }
}

/// Where the SPDX identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpdxSource {
    /// The license text matched a known license.
    InferredFromText,
    /// Stated by the project itself (or by the operator override table).
    Project,
    /// Reported by the package registry.
    PackageRegistry,
    /// Reported by GitHub for the repo hosting the code.
    Github,
}

impl std::fmt::Display for SpdxSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpdxSource::InferredFromText => write!(f, "inferred-from-license-text"),
            SpdxSource::Project => write!(f, "project"),
            SpdxSource::PackageRegistry => write!(f, "package-registry"),
            SpdxSource::Github => write!(f, "github"),
        }
    }
}

/// Where the license text came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextSource {
    /// Found inside the code repo (LICENSE file).
    Inline,
    /// Found on the project's official website.
    Project,
    /// URL reported by the package registry.
    PackageRegistry,
    /// Prepared from a license template based on the SPDX identifier.
    SpdxTemplate,
}

impl std::fmt::Display for TextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextSource::Inline => write!(f, "inline"),
            TextSource::Project => write!(f, "project"),
            TextSource::PackageRegistry => write!(f, "package-registry"),
            TextSource::SpdxTemplate => write!(f, "spdx-template"),
        }
    }
}

/// Problems found in a dependency's upstream metadata. These feed the
/// discrepancy reports so the operator can chase upstreams (or keep an
/// override entry) for each one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Discrepancy {
    GithubDoesntRecognize,
    NoLicenseFile,
    NonstandardLicense,
    NonstandardLicenseVariant,
    RegistryInconsistent,
    LicenseTextUnavailable,
    RegistryNoRepo,
    RegistryNoAuthor,
    RegistryNoDescription,
    GithubNoDescription,
    RegistryNoLicense,
    RegistryBadUrl(String),
}

impl Discrepancy {
    /// Stable label used to group discrepancies in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Discrepancy::GithubDoesntRecognize => {
                "Code has a valid license, but the GitHub API does not recognize it"
            }
            Discrepancy::NoLicenseFile => {
                "Code has a valid license, but it's somewhere other than a LICENSE file"
            }
            Discrepancy::NonstandardLicense => {
                "Code has a valid license, but it is not one recognized by SPDX"
            }
            Discrepancy::NonstandardLicenseVariant => {
                "Code has a valid license, and should be recognized by SPDX, but varies too much"
            }
            Discrepancy::RegistryInconsistent => {
                "Code has a valid license, but the package registry lists a different one"
            }
            Discrepancy::LicenseTextUnavailable => {
                "Code has a valid license, but we don't know where to find the original text"
            }
            Discrepancy::RegistryNoRepo => {
                "Package registry entry is missing a link to the repo URL"
            }
            Discrepancy::RegistryNoAuthor => "Package registry entry does not list an author",
            Discrepancy::RegistryNoDescription => {
                "Package registry entry does not list a description"
            }
            Discrepancy::GithubNoDescription => "GitHub repo does not list a description",
            Discrepancy::RegistryNoLicense => "Package registry entry does not list a license",
            Discrepancy::RegistryBadUrl(_) => {
                "Package registry entry has a bad project or repo URL"
            }
        }
    }

    /// Not worth surfacing in the discrepancy reports; kept on the record
    /// only for the QA view.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Discrepancy::NonstandardLicense)
    }
}

impl std::fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Discrepancy::RegistryBadUrl(detail) => write!(f, "{}: {}", self.label(), detail),
            _ => write!(f, "{}", self.label()),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_dep(name: &str) -> Dependency {
    Dependency {
        name: name.to_string(),
        namespace: Namespace::Npm,
        version: "1.0.0".to_string(),
        source_file: "package.json".to_string(),
        owner: "Someone".to_string(),
        project_url: Some("https://example.com".to_string()),
        repo_url: Some("https://github.com/someone/pkg".to_string()),
        description: "A package.".to_string(),
        license_spdx: "MIT".to_string(),
        license_spdx_source: SpdxSource::PackageRegistry,
        license_text: "MIT License ...".to_string(),
        license_text_source: TextSource::Inline,
        notice_text: None,
        discrepancies: Vec::new(),
        is_modified: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        let mut dep = sample_dep("@scope/pkg");
        assert_eq!(dep.short_name(), "pkg");
        dep.name = "plain".to_string();
        assert_eq!(dep.short_name(), "plain");
    }

    #[test]
    fn test_discrepancy_display_with_detail() {
        let d = Discrepancy::RegistryBadUrl("Scheme is not https://".to_string());
        assert!(d.to_string().ends_with("Scheme is not https://"));
    }

    #[test]
    fn test_nonstandard_license_not_reportable() {
        assert!(!Discrepancy::NonstandardLicense.is_reportable());
        assert!(Discrepancy::RegistryNoRepo.is_reportable());
    }
}
