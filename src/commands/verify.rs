use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::commands::CommandReport;
use crate::vault::config::load_config;
use crate::vault::index;
use crate::vault::manifest::{MONTH_MANIFEST_FILE, YEAR_MANIFEST_FILE, read_month_manifest};
use crate::vault::paths::resolve_paths;
use crate::vault::record::ItemRecord;
use crate::vault::util::read_json_list;

fn verify_partition(path: &Path, report: &mut CommandReport) -> Result<()> {
    let records: Vec<ItemRecord> = read_json_list(path)?;
    let mut ids = BTreeSet::new();
    let mut urls = BTreeSet::new();
    for record in &records {
        if let Some(id) = record.id.as_deref().filter(|v| !v.is_empty()) {
            if !ids.insert(id.to_string()) {
                report.issue(format!("{}: duplicate id {id}", path.display()));
            }
        } else if !record.url.is_empty() && !urls.insert(record.url.clone()) {
            report.issue(format!("{}: duplicate url {}", path.display(), record.url));
        }
    }
    Ok(())
}

fn numeric_dirs(dir: &Path) -> Result<Vec<(String, std::path::PathBuf)>> {
    let mut out = Vec::new();
    if !dir.exists() {
        return Ok(out);
    }
    let read_dir = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in read_dir {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|v| v.to_str()) else {
            continue;
        };
        if name.bytes().all(|b| b.is_ascii_digit()) {
            out.push((name.to_string(), path));
        }
    }
    out.sort();
    Ok(out)
}

/// Check the persisted invariants: no duplicate identities inside a day
/// partition, manifests that only point at files that exist, and index page
/// capacity and totals.
pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config()?;
    let mut report = CommandReport::new("verify");

    let mut partitions = 0usize;
    for (year_name, year_dir) in numeric_dirs(&paths.data_dir)? {
        let Ok(year) = year_name.parse::<i32>() else {
            continue;
        };
        for (month_name, month_dir) in numeric_dirs(&year_dir)? {
            let Ok(month) = month_name.parse::<u32>() else {
                continue;
            };
            let read_dir = fs::read_dir(&month_dir)
                .with_context(|| format!("failed to read {}", month_dir.display()))?;
            for entry in read_dir {
                let path = entry?.path();
                let Some(name) = path.file_name().and_then(|v| v.to_str()) else {
                    continue;
                };
                if !path.is_file() || !name.ends_with(".json") || name == MONTH_MANIFEST_FILE {
                    continue;
                }
                partitions += 1;
                verify_partition(&path, &mut report)?;
            }

            if month_dir.join(MONTH_MANIFEST_FILE).exists() {
                let manifest = read_month_manifest(&paths.data_dir, year, month)?;
                for (day, value) in &manifest.days {
                    let Some(rel) = value.as_str() else {
                        report.issue(format!("month manifest {year}/{month_name}: day {day} is not a path"));
                        continue;
                    };
                    if !paths.data_dir.join(rel).exists() {
                        report.issue(format!(
                            "month manifest {year}/{month_name}: day {day} points at missing {rel}"
                        ));
                    }
                }
            }
        }

        if !year_dir.join(YEAR_MANIFEST_FILE).exists() && !numeric_dirs(&year_dir)?.is_empty() {
            report.detail(format!("year {year} has partitions but no year manifest yet"));
        }
    }
    report.detail(format!("partitions_checked={partitions}"));

    if paths.index_dir.exists() {
        for issue in index::verify(&paths.index_dir, config.index.page_size)? {
            report.issue(issue);
        }
        report.detail("index_checked=true".to_string());
    } else {
        report.detail("index_checked=false (index dir absent)".to_string());
    }

    Ok(report)
}
