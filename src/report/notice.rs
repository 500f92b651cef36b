use std::path::Path;

use anyhow::{Context, Result};

use crate::license::spdx;
use crate::models::{Dependency, SpdxSource, TextSource};

const PREAMBLE: &str = "\
This document lists the third-party software contained in this product,
along with the applicable license for each. We are thankful to all
developers whose work is included here.";

/// Assemble the combined NOTICE document: a preamble, then one block per
/// dependency, separated by horizontal rules.
pub fn render(deps: &[Dependency], include_full_text: bool) -> String {
    let mut blocks = vec![PREAMBLE.to_string()];
    for dep in deps {
        blocks.push(dependency_block(dep, include_full_text));
    }
    let mut doc = blocks.join("\n\n---\n\n");
    doc.push('\n');
    doc
}

/// Write the NOTICE as individual files: `preamble.txt` plus one file per
/// dependency named by its short name. Diffing these against the previous
/// run's directory shows exactly which dependencies changed.
pub fn split_to_dir(dir: &Path, deps: &[Dependency], include_full_text: bool) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    std::fs::write(dir.join("preamble.txt"), format!("{}\n", PREAMBLE))?;
    for dep in deps {
        let path = dir.join(format!("{}.txt", dep.short_name()));
        let block = dependency_block(dep, include_full_text);
        std::fs::write(&path, format!("{}\n", block))
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn dependency_block(dep: &Dependency, include_full_text: bool) -> String {
    let mut block = to_markdown(dep, !include_full_text);

    if include_full_text {
        block.push_str("\n\n");
        block.push_str(&body_text(dep));
    }

    if let Some(notice) = &dep.notice_text {
        block.push_str("\n\n* This package includes the following NOTICE:\n\n");
        block.push_str(notice.trim_end());
    }

    block
}

/// The attribution header for one dependency.
fn to_markdown(dep: &Dependency, include_license_url: bool) -> String {
    let modified = if dep.is_modified == Some(true) {
        " a modified version of"
    } else {
        ""
    };

    let homepage = dep
        .project_url
        .as_deref()
        .or(dep.repo_url.as_deref())
        .unwrap_or("(no homepage listed)");

    let mut license_line = format!(" {}", dep.license_spdx);
    if include_license_url {
        // compound ids expand to one URL per component
        if let Ok(url) = spdx::license_url(&dep.license_spdx, true) {
            license_line.push_str(&format!("\n  * {}", url));
        }
    }

    format!(
        "## {}\n\n\
         This product contains{} '{}' by {}.\n\n\
         {}\n\n\
         * HOMEPAGE:\n  * {}\n\n\
         * LICENSE:{}",
        dep.name, modified, dep.short_name(), dep.owner, dep.description, homepage, license_line
    )
}

/// The full license text, with a provenance note when the text had to be
/// prepared from a template rather than taken from the project itself.
fn body_text(dep: &Dependency) -> String {
    let mut body = String::new();

    if dep.license_text_source == TextSource::SpdxTemplate {
        let reason = match dep.license_spdx_source {
            SpdxSource::Project | SpdxSource::InferredFromText => "the official project website",
            SpdxSource::PackageRegistry => "the package registry entry for this project",
            SpdxSource::Github => "the GitHub repository for this project",
        };
        body.push_str(&format!(
            "Note: An original license file for this dependency is not available. \
             We determined the type of license based on {}. The following text has \
             been prepared using a standard template for this type of license.\n\n",
            reason
        ));
    }

    body.push_str(dep.license_text.trim_end());
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_dep;

    #[test]
    fn test_block_without_full_text_links_spdx() {
        let dep = sample_dep("left-pad");
        let block = dependency_block(&dep, false);
        assert!(block.starts_with("## left-pad"));
        assert!(block.contains("This product contains 'left-pad' by Someone."));
        assert!(block.contains("https://spdx.org/licenses/MIT.html"));
        assert!(!block.contains("MIT License ..."));
    }

    #[test]
    fn test_block_with_full_text() {
        let dep = sample_dep("left-pad");
        let block = dependency_block(&dep, true);
        assert!(block.contains("MIT License ..."));
        assert!(!block.contains("spdx.org"));
    }

    #[test]
    fn test_modified_fork_wording() {
        let mut dep = sample_dep("some-fork");
        dep.is_modified = Some(true);
        let block = dependency_block(&dep, false);
        assert!(block.contains("contains a modified version of 'some-fork'"));
    }

    #[test]
    fn test_template_provenance_note() {
        let mut dep = sample_dep("quiet-pkg");
        dep.license_text_source = TextSource::SpdxTemplate;
        dep.license_spdx_source = SpdxSource::Github;
        let block = dependency_block(&dep, true);
        assert!(block.contains("An original license file for this dependency is not available"));
        assert!(block.contains("the GitHub repository for this project"));
    }

    #[test]
    fn test_upstream_notice_included() {
        let mut dep = sample_dep("apache-thing");
        dep.notice_text = Some("Copyright The Upstream Authors.\n".to_string());
        let block = dependency_block(&dep, false);
        assert!(block.contains("includes the following NOTICE"));
        assert!(block.ends_with("Copyright The Upstream Authors."));
    }

    #[test]
    fn test_split_writes_one_file_per_dependency() {
        let dir = tempfile::TempDir::new().unwrap();
        let deps = vec![sample_dep("@scope/alpha"), sample_dep("beta")];
        split_to_dir(dir.path(), &deps, false).unwrap();

        let preamble = std::fs::read_to_string(dir.path().join("preamble.txt")).unwrap();
        assert!(preamble.starts_with("This document lists"));

        // scoped names collapse to their short name
        let alpha = std::fs::read_to_string(dir.path().join("alpha.txt")).unwrap();
        assert!(alpha.starts_with("## @scope/alpha"));
        assert!(dir.path().join("beta.txt").exists());
    }

    #[test]
    fn test_render_joins_with_rules() {
        let deps = vec![sample_dep("a"), sample_dep("b")];
        let doc = render(&deps, false);
        assert_eq!(doc.matches("\n\n---\n\n").count(), 2);
        assert!(doc.starts_with("This document lists"));
        assert!(doc.ends_with("\n"));
    }
}
