use std::path::Path;

use anyhow::{bail, Context, Result};
use regex::Regex;

use crate::models::{DependencyDecl, Namespace, RepoRef};

/// Hosts that keep repos at the top level (`go.uber.org/zap`), without an
/// account segment.
const SINGLE_SEGMENT_HOSTS: &[&str] = &["google.golang.org", "go.uber.org"];

/// Reads direct module requirements from `go.mod`, or from
/// `vendor/modules.txt` when the project vendors its dependencies.
pub struct GolangAnalyzer {
    use_vendor_modules: bool,
}

impl GolangAnalyzer {
    pub fn new() -> Self {
        Self {
            use_vendor_modules: false,
        }
    }

    pub fn from_vendor_modules() -> Self {
        Self {
            use_vendor_modules: true,
        }
    }
}

impl super::Analyzer for GolangAnalyzer {
    fn analyze(&self, path: &Path) -> Result<Vec<DependencyDecl>> {
        if self.use_vendor_modules {
            let manifest = path.join("vendor").join("modules.txt");
            let content = std::fs::read_to_string(&manifest)
                .with_context(|| format!("reading {}", manifest.display()))?;
            parse_vendor_modules("vendor/modules.txt", &content)
        } else {
            let manifest = path.join("go.mod");
            let content = std::fs::read_to_string(&manifest)
                .with_context(|| format!("reading {}", manifest.display()))?;
            parse_go_mod("go.mod", &content)
        }
    }
}

/// Parse `require` directives out of go.mod. Entries the Go toolchain marks
/// `// indirect` are transitive and excluded.
fn parse_go_mod(source_file: &str, content: &str) -> Result<Vec<DependencyDecl>> {
    let mut deps = Vec::new();
    let mut in_require_block = false;

    for line in content.lines() {
        let line = line.trim();

        if in_require_block {
            if line == ")" {
                in_require_block = false;
                continue;
            }
            if let Some(decl) = parse_require_line(source_file, line)? {
                deps.push(decl);
            }
        } else if line == "require (" {
            in_require_block = true;
        } else if let Some(rest) = line.strip_prefix("require ") {
            if let Some(decl) = parse_require_line(source_file, rest.trim())? {
                deps.push(decl);
            }
        }
    }

    deps.sort_by(|a, b| a.name.cmp(&b.name));
    if let Some(pair) = deps.windows(2).find(|w| w[0].name == w[1].name) {
        bail!("duplicate requirement {:?} in {}", pair[0].name, source_file);
    }
    Ok(deps)
}

fn parse_require_line(source_file: &str, line: &str) -> Result<Option<DependencyDecl>> {
    if line.is_empty() || line.starts_with("//") {
        return Ok(None);
    }

    let (spec, comment) = match line.split_once("//") {
        Some((spec, comment)) => (spec.trim(), comment.trim()),
        None => (line, ""),
    };
    if comment.starts_with("indirect") {
        return Ok(None);
    }

    let mut parts = spec.split_whitespace();
    let (module, version) = match (parts.next(), parts.next()) {
        (Some(m), Some(v)) => (m, v),
        _ => bail!("malformed require line in {}: {:?}", source_file, line),
    };

    Ok(Some(module_decl(source_file, module, version)?))
}

/// Parse `vendor/modules.txt`. Module header lines look like
/// `# github.com/foo/bar v1.2.3`; a following `## explicit` marker means the
/// module is required directly.
fn parse_vendor_modules(source_file: &str, content: &str) -> Result<Vec<DependencyDecl>> {
    let mut deps = Vec::new();
    let mut pending: Option<(String, String)> = None;

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("## ") {
            if rest.starts_with("explicit") {
                if let Some((module, version)) = pending.take() {
                    deps.push(module_decl(source_file, &module, &version)?);
                }
            }
        } else if let Some(rest) = line.strip_prefix("# ") {
            let mut parts = rest.split_whitespace();
            if let (Some(module), Some(version)) = (parts.next(), parts.next()) {
                pending = Some((module.to_string(), version.to_string()));
            } else {
                pending = None;
            }
        }
    }

    deps.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(deps)
}

fn module_decl(source_file: &str, module: &str, version: &str) -> Result<DependencyDecl> {
    let (name, repo) = split_module_path(module)
        .with_context(|| format!("unrecognized Go module path {:?} in {}", module, source_file))?;
    Ok(DependencyDecl {
        name,
        namespace: Namespace::Golang,
        version: version.to_string(),
        source_file: source_file.to_string(),
        repo_hint: Some(repo),
    })
}

/// Map a Go module path onto (display name, code location).
///
/// gopkg.in paths redirect to GitHub: `gopkg.in/yaml.v2` is
/// `github.com/go-yaml/yaml`, `gopkg.in/acct/repo.v1` is
/// `github.com/acct/repo`. `golang.org/x/name` lives at
/// `github.com/golang/name`. Sub-packages beyond the repo root are trimmed.
fn split_module_path(module: &str) -> Result<(String, RepoRef)> {
    let segments: Vec<&str> = module.split('/').collect();
    if segments.is_empty() || !segments[0].contains('.') {
        bail!("module path does not start with a host: {:?}", module);
    }
    let host = segments[0];

    if SINGLE_SEGMENT_HOSTS.contains(&host) {
        if segments.len() < 2 {
            bail!("module path too short: {:?}", module);
        }
        let repo = segments[1];
        return Ok((
            format!("{}/{}", host, repo),
            RepoRef {
                host: host.to_string(),
                account: None,
                repo: repo.to_string(),
            },
        ));
    }

    if host == "gopkg.in" {
        // `.vN` suffix on gopkg.in import paths
        let v_suffix = Regex::new(r"\.v\d+$")?;
        match segments.len() {
            2 => {
                let repo = v_suffix.replace(segments[1], "").to_string();
                let account = format!("go-{}", repo);
                let name = format!("{}/{}", account, repo);
                return Ok((
                    name,
                    RepoRef {
                        host: "github.com".to_string(),
                        account: Some(account),
                        repo,
                    },
                ));
            }
            _ => {
                let account = segments[1].to_string();
                let repo = v_suffix.replace(segments[2], "").to_string();
                return Ok((
                    format!("{}/{}", account, repo),
                    RepoRef {
                        host: "github.com".to_string(),
                        account: Some(account),
                        repo,
                    },
                ));
            }
        }
    }

    if host == "golang.org" {
        if segments.len() < 3 || segments[1] != "x" {
            bail!("unrecognized golang.org path: {:?}", module);
        }
        let repo = segments[2];
        return Ok((
            format!("golang/{}", repo),
            RepoRef {
                host: "golang.org".to_string(),
                account: None,
                repo: repo.to_string(),
            },
        ));
    }

    if segments.len() < 3 {
        bail!("module path too short: {:?}", module);
    }
    let account = segments[1];
    let repo = segments[2];
    Ok((
        format!("{}/{}", account, repo),
        RepoRef {
            host: host.to_string(),
            account: Some(account.to_string()),
            repo: repo.to_string(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_go_mod_block() {
        let gomod = r#"
module github.com/example/server

go 1.21

require (
	github.com/gorilla/mux v1.8.1
	github.com/pkg/errors v0.9.1 // indirect
	go.uber.org/zap v1.26.0
)

require golang.org/x/crypto v0.17.0
"#;
        let deps = parse_go_mod("go.mod", gomod).unwrap();
        let names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["go.uber.org/zap", "golang/crypto", "gorilla/mux"]
        );
        let mux = deps.iter().find(|d| d.name == "gorilla/mux").unwrap();
        assert_eq!(mux.version, "v1.8.1");
        assert_eq!(mux.repo_hint.as_ref().unwrap().host, "github.com");
    }

    #[test]
    fn test_parse_go_mod_duplicate_rejected() {
        let gomod = r#"
require (
	github.com/gorilla/mux v1.8.1
	github.com/gorilla/mux v1.8.0
)
"#;
        let err = parse_go_mod("go.mod", gomod).unwrap_err();
        assert!(err.to_string().contains("duplicate requirement"));
    }

    #[test]
    fn test_parse_vendor_modules_explicit_only() {
        let modules = r#"# github.com/gorilla/mux v1.8.1
## explicit; go 1.20
github.com/gorilla/mux
# github.com/pkg/errors v0.9.1
github.com/pkg/errors
# go.uber.org/zap v1.26.0
## explicit
go.uber.org/zap
"#;
        let deps = parse_vendor_modules("vendor/modules.txt", modules).unwrap();
        let names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["go.uber.org/zap", "gorilla/mux"]);
    }

    #[test]
    fn test_split_gopkg_in_bare() {
        let (name, repo) = split_module_path("gopkg.in/yaml.v2").unwrap();
        assert_eq!(name, "go-yaml/yaml");
        assert_eq!(repo.host, "github.com");
        assert_eq!(repo.account.as_deref(), Some("go-yaml"));
        assert_eq!(repo.repo, "yaml");
    }

    #[test]
    fn test_split_gopkg_in_namespaced() {
        let (name, repo) = split_module_path("gopkg.in/olivere/elastic.v5").unwrap();
        assert_eq!(name, "olivere/elastic");
        assert_eq!(repo.github_slug(), "olivere/elastic");
    }

    #[test]
    fn test_split_golang_org_x() {
        let (name, repo) = split_module_path("golang.org/x/crypto").unwrap();
        assert_eq!(name, "golang/crypto");
        assert_eq!(repo.host, "golang.org");
        assert_eq!(repo.repo, "crypto");
    }

    #[test]
    fn test_split_single_segment_host() {
        let (name, repo) = split_module_path("google.golang.org/grpc").unwrap();
        assert_eq!(name, "google.golang.org/grpc");
        assert!(repo.account.is_none());
    }

    #[test]
    fn test_split_rejects_non_host() {
        assert!(split_module_path("fmt").is_err());
    }

    #[test]
    fn test_subpackage_trimmed() {
        let (name, _) = split_module_path("github.com/aws/aws-sdk-go/service/s3").unwrap();
        assert_eq!(name, "aws/aws-sdk-go");
    }
}
