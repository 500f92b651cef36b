use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};

use crate::models::Dependency;

/// Terminal report on the quality of gathered metadata: which records are
/// thin, where each license came from, and which upstream NOTICEs apply.
pub fn render(deps: &[Dependency]) {
    let mut fields = Table::new();
    fields
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Source File").add_attribute(Attribute::Bold),
            Cell::new("Owner").add_attribute(Attribute::Bold),
            Cell::new("Project URL").add_attribute(Attribute::Bold),
            Cell::new("Repo URL").add_attribute(Attribute::Bold),
            Cell::new("Description").add_attribute(Attribute::Bold),
        ]);

    for dep in deps {
        fields.add_row(vec![
            Cell::new(&dep.name),
            Cell::new(&dep.source_file),
            Cell::new(&dep.owner),
            Cell::new(dep.project_url.as_deref().unwrap_or("-")),
            Cell::new(dep.repo_url.as_deref().unwrap_or("-")),
            Cell::new(truncate(&dep.description, 60)),
        ]);
    }

    println!("{}", fields);

    let mut licenses = Table::new();
    licenses
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("SPDX").add_attribute(Attribute::Bold),
            Cell::new("SPDX Source").add_attribute(Attribute::Bold),
            Cell::new("Text Source").add_attribute(Attribute::Bold),
            Cell::new("Text").add_attribute(Attribute::Bold),
            Cell::new("NOTICE").add_attribute(Attribute::Bold),
            Cell::new("Problems").add_attribute(Attribute::Bold),
        ]);

    for dep in deps {
        licenses.add_row(vec![
            Cell::new(&dep.name),
            Cell::new(&dep.license_spdx),
            Cell::new(dep.license_spdx_source.to_string()),
            Cell::new(dep.license_text_source.to_string()),
            Cell::new(truncate(&dep.license_text, 40)),
            Cell::new(if dep.notice_text.is_some() { "yes" } else { "-" }),
            Cell::new(dep.discrepancies.len().to_string()),
        ]);
    }

    println!("{}", licenses);
}

fn truncate(text: &str, limit: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= limit {
        return flat;
    }
    let cut: String = flat.chars().take(limit).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly-10", 10), "exactly-10");
        assert_eq!(truncate("a longer piece of text", 8), "a longer...");
        assert_eq!(truncate("multi\nline", 20), "multi line");
    }
}
