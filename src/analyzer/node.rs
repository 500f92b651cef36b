use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::{DependencyDecl, Namespace, RepoRef};

pub struct NodeAnalyzer;

impl NodeAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for NodeAnalyzer {
    fn analyze(&self, path: &Path) -> Result<Vec<DependencyDecl>> {
        let manifest = path.join("package.json");
        let content = std::fs::read_to_string(&manifest)
            .with_context(|| format!("reading {}", manifest.display()))?;
        parse_package_json("package.json", &content)
    }
}

/// Extract the `dependencies` map. Only runtime dependencies end up in a
/// NOTICE; devDependencies are not shipped.
fn parse_package_json(source_file: &str, content: &str) -> Result<Vec<DependencyDecl>> {
    let json: Value =
        serde_json::from_str(content).with_context(|| format!("parsing {}", source_file))?;

    let mut deps = Vec::new();

    if let Some(pkgs) = json.get("dependencies").and_then(|v| v.as_object()) {
        for (name, range) in pkgs {
            let version = range.as_str().unwrap_or("*").to_string();
            deps.push(DependencyDecl {
                name: name.clone(),
                namespace: Namespace::Npm,
                version: version.clone(),
                source_file: source_file.to_string(),
                repo_hint: parse_github_range(&version),
            });
        }
    }

    deps.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(deps)
}

/// Recognize `github:owner/repo#ref` version ranges. These pin the dependency
/// to a specific repo, which may or may not be the official one; the
/// resolver compares against the registry's repo to flag modified forks.
fn parse_github_range(range: &str) -> Option<RepoRef> {
    let rest = range.strip_prefix("github:")?;
    let path = rest.split('#').next()?;
    let (account, repo) = path.split_once('/')?;
    Some(RepoRef {
        host: "github.com".to_string(),
        account: Some(account.to_string()),
        repo: repo.to_string(),
    })
}
