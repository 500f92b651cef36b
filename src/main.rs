//! `notice-crawlr`: crawl first-order dependencies and assemble a
//! legal-compliance NOTICE document.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load the operator override table ([`config::load_overrides`]).
//! 3. For each `--dir`: detect manifests ([`detector`]), read declared
//!    dependencies ([`analyzer`]).
//! 4. Fetch metadata from the registries and GitHub ([`registry`]).
//! 5. Resolve a license id and text per dependency ([`license::resolver`]).
//! 6. Render the NOTICE, spreadsheet, discrepancy, and QA reports
//!    ([`report`]).
//!
//! Any dependency that cannot be resolved aborts the run with a message
//! telling the operator what override to add; this is a supervised batch
//! tool, not a resilient service.

mod analyzer;
mod cli;
mod config;
mod detector;
mod license;
mod models;
mod registry;
mod report;

use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};

use analyzer::Analyzer;
use cli::Cli;
use config::{load_overrides, OverrideTable};
use detector::{detect_manifests, Manifest};
use models::{Dependency, DependencyDecl, Namespace};
use registry::github::GithubClient;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let token = cli
        .github_token
        .clone()
        .or_else(|| std::env::var("GITHUB_TOKEN").ok());
    if token.is_none() {
        bail!(
            "a GitHub access token is required to avoid anonymous rate limits; \
             generate one at https://github.com/settings/tokens and export it \
             as $GITHUB_TOKEN (or pass --github-token)"
        );
    }

    let overrides = load_overrides(&cli.dirs[0], cli.overrides.as_deref())?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;
    let github = GithubClient::new(http.clone(), token);

    // crawl each project directory
    let mut projects: Vec<(String, Vec<Dependency>)> = Vec::new();

    for dir in &cli.dirs {
        let path = dir.canonicalize().unwrap_or_else(|_| dir.clone());
        let project = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        if projects.iter().any(|(name, _)| *name == project) {
            bail!("duplicate project name {:?}", project);
        }

        let manifests = detect_manifests(&path);
        if manifests.is_empty() {
            bail!(
                "no supported dependency manifests found in {}",
                path.display()
            );
        }

        let mut decls = Vec::new();
        for manifest in &manifests {
            let found = match manifest {
                Manifest::PackageJson => analyzer::node::NodeAnalyzer::new().analyze(&path)?,
                Manifest::GoMod => analyzer::golang::GolangAnalyzer::new().analyze(&path)?,
                Manifest::GoVendorModules => {
                    analyzer::golang::GolangAnalyzer::from_vendor_modules().analyze(&path)?
                }
                Manifest::RequirementsTxt => {
                    analyzer::python::PythonAnalyzer::new().analyze(&path)?
                }
            };
            if !cli.quiet {
                eprintln!(
                    "  {} {} {}: {} direct dependencies",
                    "→".cyan(),
                    project,
                    manifest,
                    found.len()
                );
            }
            decls.extend(found);
        }

        let deps = crawl(&http, &github, &overrides, &decls, &cli).await?;
        projects.push((project, deps));
    }

    // De-dupe across projects for the NOTICE: the first project a dependency
    // appears in claims it. The spreadsheet keeps the per-project rows.
    let mut by_key: BTreeMap<(Namespace, String), (Dependency, String)> = BTreeMap::new();
    for (project, deps) in &projects {
        for dep in deps {
            by_key
                .entry((dep.namespace, dep.name.clone()))
                .or_insert_with(|| (dep.clone(), project.clone()));
        }
    }
    let dep_proj: Vec<(Dependency, String)> = by_key.into_values().collect();
    let deduped: Vec<Dependency> = dep_proj.iter().map(|(dep, _)| dep.clone()).collect();

    if let Some(target) = &cli.discrepancies {
        if target == "-" {
            report::discrepancies::render(&mut std::io::stdout().lock(), &deduped)?;
        } else {
            let mut file = std::fs::File::create(target)
                .with_context(|| format!("creating {}", target))?;
            report::discrepancies::render(&mut file, &deduped)?;
        }
    }

    if let Some(path) = &cli.discrepancies_csv {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        report::spreadsheet::write_discrepancies(file, &dep_proj)?;
    }

    let notice = report::notice::render(&deduped, cli.full_text);
    match &cli.notice {
        Some(path) => {
            std::fs::write(path, &notice)
                .with_context(|| format!("writing {}", path.display()))?;
            if !cli.quiet {
                eprintln!(
                    "  {} wrote NOTICE for {} dependencies to {}",
                    "→".cyan(),
                    deduped.len(),
                    path.display()
                );
            }
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(notice.as_bytes())?;
        }
    }

    if let Some(dir) = &cli.split {
        report::notice::split_to_dir(dir, &deduped, cli.full_text)?;
        if !cli.quiet {
            eprintln!(
                "  {} split NOTICE into {} files under {}",
                "→".cyan(),
                deduped.len() + 1,
                dir.display()
            );
        }
    }

    if let Some(path) = &cli.spreadsheet {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        report::spreadsheet::write_summary(file, &projects)?;
    }

    if cli.qa {
        report::quality::render(&deduped);
    }

    Ok(())
}

/// Fetch and resolve a batch of declarations. Lookups run a few at a time;
/// registries tolerate that while a dependency list of hundreds still
/// finishes in reasonable time.
async fn crawl(
    http: &reqwest::Client,
    github: &GithubClient,
    overrides: &OverrideTable,
    decls: &[DependencyDecl],
    cli: &Cli,
) -> Result<Vec<Dependency>> {
    const BATCH_SIZE: usize = 8;

    let pb = if !cli.quiet {
        let pb = ProgressBar::new(decls.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut out = Vec::new();

    for batch in decls.chunks(BATCH_SIZE) {
        let futures: Vec<_> = batch
            .iter()
            .map(|decl| async move {
                let entry = overrides.get(decl.namespace, &decl.name);
                let draft = match decl.namespace {
                    Namespace::Npm => {
                        registry::npm::fetch_metadata(http, github, decl, entry).await?
                    }
                    Namespace::Golang => registry::golang::fetch_metadata(github, decl).await?,
                    Namespace::Pypi => registry::pypi::fetch_metadata(http, github, decl).await?,
                };
                license::resolver::resolve(github, entry, decl, draft).await
            })
            .collect();

        for (decl, result) in batch.iter().zip(join_all(futures).await) {
            let dep = result?;
            if cli.verbose {
                eprintln!(
                    "  {} {}/{} -> {}",
                    "✓".green(),
                    dep.namespace,
                    dep.name,
                    dep.license_spdx
                );
            }
            if let Some(pb) = &pb {
                pb.set_message(decl.name.clone());
                pb.inc(1);
            }
            out.push(dep);
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    Ok(out)
}
