use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "notice-crawlr",
    about = "Crawl first-order dependencies and assemble a legal-compliance NOTICE document",
    version
)]
pub struct Cli {
    /// Project directory to scan for dependency manifests (repeatable)
    #[arg(long = "dir", value_name = "PATH", required = true)]
    pub dirs: Vec<PathBuf>,

    /// Include the complete license text for every dependency in the NOTICE
    #[arg(long)]
    pub full_text: bool,

    /// Write the NOTICE document to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub notice: Option<PathBuf>,

    /// Also write the NOTICE as one file per dependency into a directory,
    /// for diffing against a previous run
    #[arg(long, value_name = "DIR")]
    pub split: Option<PathBuf>,

    /// Write a CSV spreadsheet listing every dependency in every project
    #[arg(long, value_name = "FILE")]
    pub spreadsheet: Option<PathBuf>,

    /// Write a report of upstream metadata problems ("-" for stdout)
    #[arg(long, value_name = "FILE")]
    pub discrepancies: Option<String>,

    /// Write the discrepancy report as a CSV spreadsheet
    #[arg(long = "discrepancies-csv", value_name = "FILE")]
    pub discrepancies_csv: Option<PathBuf>,

    /// Print a report on the quality of the gathered metadata
    #[arg(long)]
    pub qa: bool,

    /// Override table [default: ./.notice-crawlr/overrides.toml, fallback ~/.config/notice-crawlr/overrides.toml]
    #[arg(long, value_name = "FILE")]
    pub overrides: Option<PathBuf>,

    /// GitHub access token (read-only, used to avoid anonymous rate limits)
    /// [env: GITHUB_TOKEN]
    #[arg(long, value_name = "TOKEN")]
    pub github_token: Option<String>,

    /// Show per-dependency progress detail
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress status output
    #[arg(short, long)]
    pub quiet: bool,
}
