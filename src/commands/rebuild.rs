use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::commands::CommandReport;
use crate::vault::manifest::{rebuild_month, rebuild_year};
use crate::vault::paths::resolve_paths;

#[derive(Debug, Clone)]
pub struct RebuildOptions {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

fn scan_years(data_dir: &Path) -> Result<Vec<i32>> {
    let mut years = Vec::new();
    if !data_dir.exists() {
        return Ok(years);
    }
    let read_dir = fs::read_dir(data_dir)
        .with_context(|| format!("failed to read {}", data_dir.display()))?;
    for entry in read_dir {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(year) = path
            .file_name()
            .and_then(|v| v.to_str())
            .and_then(|v| v.parse::<i32>().ok())
        {
            years.push(year);
        }
    }
    years.sort_unstable();
    Ok(years)
}

fn scan_months(data_dir: &Path, year: i32) -> Result<Vec<u32>> {
    let year_dir = data_dir.join(format!("{year}"));
    let mut months = Vec::new();
    if !year_dir.exists() {
        return Ok(months);
    }
    let read_dir = fs::read_dir(&year_dir)
        .with_context(|| format!("failed to read {}", year_dir.display()))?;
    for entry in read_dir {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(month) = path
            .file_name()
            .and_then(|v| v.to_str())
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|m| (1..=12).contains(m))
        {
            months.push(month);
        }
    }
    months.sort_unstable();
    Ok(months)
}

/// Rebuild rollup manifests. With no scope given, every year and month found
/// under the data dir is rebuilt; manifests are derived state, so this is
/// always safe to run.
pub fn run(opts: &RebuildOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("rebuild");
    report.detail(format!("data_dir={}", paths.data_dir.display()));

    let years = match opts.year {
        Some(year) => vec![year],
        None => scan_years(&paths.data_dir)?,
    };
    if years.is_empty() {
        report.detail("no year partitions found; nothing to rebuild");
        return Ok(report);
    }

    for year in years {
        let months = match opts.month {
            Some(month) => vec![month],
            None => scan_months(&paths.data_dir, year)?,
        };
        for month in months {
            let path = rebuild_month(&paths.data_dir, year, month)?;
            report.detail(format!("month_manifest={}", path.display()));
        }
        let path = rebuild_year(&paths.data_dir, year)?;
        report.detail(format!("year_manifest={}", path.display()));
    }

    Ok(report)
}
