use anyhow::{Context, Result};
use std::fs;
use std::io::Read;

use crate::commands::CommandReport;
use crate::error::NewsVaultError;
use crate::vault::config::load_config;
use crate::vault::ingest::run_cycle;
use crate::vault::paths::resolve_paths;
use crate::vault::record::FeedEntry;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Path to a JSON array of normalized entries; `-` reads stdin.
    pub entries: String,
}

fn read_entries(input: &str) -> Result<Vec<FeedEntry>> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read entries from stdin")?;
        buf
    } else {
        fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?
    };

    serde_json::from_str(&raw)
        .map_err(|err| NewsVaultError::InvalidEntries(format!("{input}: {err}")).into())
}

/// Run one ingestion cycle. The newly-archived records go to stdout as a
/// JSON array for the delivery collaborator; the report goes to stderr.
pub fn run(opts: &IngestOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config()?;
    let mut report = CommandReport::new("ingest");

    report.detail(format!("data_dir={}", paths.data_dir.display()));
    report.detail(format!("index_dir={}", paths.index_dir.display()));
    report.detail(format!("source={}", config.archive.source));
    report.detail(format!("timezone={}", config.archive.timezone));

    let entries = read_entries(&opts.entries)?;
    report.detail(format!("entries={}", entries.len()));

    let outcome = run_cycle(&paths, &config, &entries)?;
    report.detail(format!("added={}", outcome.added.len()));
    for partition in &outcome.partitions {
        report.detail(format!("partition={partition}"));
    }
    match outcome.total_indexed {
        Some(total) => report.detail(format!("total_indexed={total}")),
        None if !outcome.added.is_empty() => {
            report.issue("archived records were not indexed this cycle")
        }
        None => {}
    }
    for warning in &outcome.warnings {
        report.issue(warning.clone());
    }

    let added_json = serde_json::to_string_pretty(&outcome.added)?;
    println!("{added_json}");

    Ok(report)
}
