use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::models::{DependencyDecl, Namespace};

pub struct PythonAnalyzer;

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for PythonAnalyzer {
    fn analyze(&self, path: &Path) -> Result<Vec<DependencyDecl>> {
        let manifest = path.join("requirements.txt");
        let content = std::fs::read_to_string(&manifest)
            .with_context(|| format!("reading {}", manifest.display()))?;
        parse_requirements_txt("requirements.txt", &content)
    }
}

/// Parse a pip requirements file. Flag lines (`-r`, `-e`, `--index-url`)
/// would pull in arbitrary files or URLs, so they are rejected outright
/// rather than silently skipped.
fn parse_requirements_txt(source_file: &str, content: &str) -> Result<Vec<DependencyDecl>> {
    let mut deps: Vec<DependencyDecl> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('-') {
            bail!("unhandled line in {}: {:?}", source_file, line);
        }
        if line.contains("#egg=") {
            continue;
        }

        let (name, version) = split_requirement(line);
        if deps.iter().any(|d| d.name == name) {
            bail!("duplicate requirement {:?} in {}", name, source_file);
        }
        deps.push(DependencyDecl {
            name,
            namespace: Namespace::Pypi,
            version,
            source_file: source_file.to_string(),
            repo_hint: None,
        });
    }

    deps.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(deps)
}

/// Split `requests[security]>=2.28,<3` into a bare name and the raw
/// version specifier (`*` when unconstrained).
fn split_requirement(line: &str) -> (String, String) {
    let spec_start = line.find(|c| ['=', '>', '<', '~', '!', ';', ' '].contains(&c));
    let (name_part, spec) = match spec_start {
        Some(idx) => (&line[..idx], line[idx..].trim()),
        None => (line, ""),
    };
    let name = name_part
        .split('[')
        .next()
        .unwrap_or(name_part)
        .trim()
        .to_string();
    let version = if spec.is_empty() {
        "*".to_string()
    } else {
        spec.to_string()
    };
    (name, version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requirements() {
        let content = "\n# comment\nrequests>=2.28\nflask==2.3.0\npyyaml\n";
        let deps = parse_requirements_txt("requirements.txt", content).unwrap();
        let names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["flask", "pyyaml", "requests"]);
        assert_eq!(deps[1].version, "*");
        assert_eq!(deps[2].version, ">=2.28");
    }

    #[test]
    fn test_extras_stripped() {
        let deps = parse_requirements_txt("requirements.txt", "requests[security]>=2.0\n").unwrap();
        assert_eq!(deps[0].name, "requests");
    }

    #[test]
    fn test_flag_lines_rejected() {
        assert!(parse_requirements_txt("requirements.txt", "-r other.txt\n").is_err());
    }

    #[test]
    fn test_egg_lines_skipped() {
        let content = "git+https://example.com/repo.git#egg=thing\nflask\n";
        let deps = parse_requirements_txt("requirements.txt", content).unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "flask");
    }

    #[test]
    fn test_duplicate_rejected() {
        assert!(parse_requirements_txt("requirements.txt", "flask\nflask==2.0\n").is_err());
    }
}
