use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;

use crate::models::Dependency;

/// Plain-text report of upstream metadata problems, grouped by problem kind
/// so the operator can work through one category at a time.
pub fn render<W: Write>(out: &mut W, deps: &[Dependency]) -> Result<()> {
    let mut by_kind: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for dep in deps {
        for discrepancy in dep.discrepancies.iter().filter(|d| d.is_reportable()) {
            by_kind
                .entry(discrepancy.to_string())
                .or_default()
                .push(format!("{}/{}", dep.namespace, dep.name));
        }
    }

    if by_kind.is_empty() {
        writeln!(out, "No discrepancies.")?;
        return Ok(());
    }

    for (kind, mut names) in by_kind {
        names.sort();
        names.dedup();
        writeln!(out, "--- {} ---", kind)?;
        for name in names {
            writeln!(out, "{}", name)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_dep, Discrepancy};

    #[test]
    fn test_no_discrepancies() {
        let mut buf = Vec::new();
        render(&mut buf, &[sample_dep("clean")]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "No discrepancies.\n");
    }

    #[test]
    fn test_grouped_output() {
        let mut a = sample_dep("alpha");
        a.discrepancies = vec![Discrepancy::RegistryNoAuthor];
        let mut b = sample_dep("beta");
        b.discrepancies = vec![
            Discrepancy::RegistryNoAuthor,
            Discrepancy::RegistryNoDescription,
        ];

        let mut buf = Vec::new();
        render(&mut buf, &[b, a]).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let author_section = text
            .split("--- ")
            .find(|s| s.starts_with("Package registry entry does not list an author"))
            .unwrap();
        // entries are sorted within a section
        let alpha_pos = author_section.find("npm/alpha").unwrap();
        let beta_pos = author_section.find("npm/beta").unwrap();
        assert!(alpha_pos < beta_pos);
        assert!(text.contains("does not list a description"));
    }
}
