use std::io::Write;

use anyhow::Result;

use crate::license::spdx;
use crate::models::Dependency;

/// CSV spreadsheet listing every dependency in every project, in the layout
/// the legal team expects.
pub fn write_summary<W: Write>(out: W, projects: &[(String, Vec<Dependency>)]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "Name of Open Source Software",
        "Link to Software License",
        "License Type (SPDX ID)",
        "Where Used",
        "Functionality",
    ])?;

    for (project, deps) in projects {
        for dep in deps {
            let where_used = format!("{} ({} dependency)", project, dep.namespace);
            writer.write_record([
                dep.name.as_str(),
                &spdx::license_url(&dep.license_spdx, true)?,
                dep.license_spdx.as_str(),
                &where_used,
                dep.description.as_str(),
            ])?;
        }
    }

    writer.write_record([generated_footer().as_str(), "", "", "", ""])?;
    writer.flush()?;
    Ok(())
}

/// CSV form of the discrepancy report: one row per (dependency, problem).
pub fn write_discrepancies<W: Write>(out: W, rows: &[(Dependency, String)]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "Source Project",
        "Namespace",
        "Name",
        "Discrepancy",
        "Repo URL",
    ])?;

    for (dep, project) in rows {
        for discrepancy in dep.discrepancies.iter().filter(|d| d.is_reportable()) {
            writer.write_record([
                project.as_str(),
                &dep.namespace.to_string(),
                dep.name.as_str(),
                &discrepancy.to_string(),
                dep.repo_url.as_deref().unwrap_or(""),
            ])?;
        }
    }

    writer.write_record([generated_footer().as_str(), "", "", "", ""])?;
    writer.flush()?;
    Ok(())
}

fn generated_footer() -> String {
    let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S");
    format!("Generated by notice-crawlr at {}", stamp)
}
