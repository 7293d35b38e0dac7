//! Rollup manifests: derived, non-authoritative views rebuilt wholesale from
//! whatever partition files exist on disk. No incremental state, so a
//! backfilled earlier day needs no replay; the next rebuild picks it up.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::vault::util::write_json_value;

pub const MONTH_MANIFEST_FILE: &str = "month_manifest.json";
pub const YEAR_MANIFEST_FILE: &str = "year_manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthManifest {
    pub year: String,
    pub month: String,
    /// day-of-month ("09") -> partition path relative to the data dir,
    /// descending by day.
    pub days: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearManifest {
    pub year: String,
    /// month ("11") -> month manifest path relative to the data dir,
    /// descending by month.
    pub months: Map<String, Value>,
}

pub fn month_manifest_path(data_dir: &Path, year: i32, month: u32) -> PathBuf {
    data_dir
        .join(format!("{year}"))
        .join(format!("{month:02}"))
        .join(MONTH_MANIFEST_FILE)
}

pub fn year_manifest_path(data_dir: &Path, year: i32) -> PathBuf {
    data_dir.join(format!("{year}")).join(YEAR_MANIFEST_FILE)
}

fn is_two_digit(name: &str) -> bool {
    name.len() == 2 && name.bytes().all(|b| b.is_ascii_digit())
}

/// Rebuild the month manifest from the partition files currently present
/// under `data_dir/YYYY/MM`. Full scan, full rewrite; calling it twice in a
/// row yields byte-identical output.
pub fn rebuild_month(data_dir: &Path, year: i32, month: u32) -> Result<PathBuf> {
    let month_dir = data_dir.join(format!("{year}")).join(format!("{month:02}"));
    fs::create_dir_all(&month_dir)
        .with_context(|| format!("failed to create {}", month_dir.display()))?;

    let mut days: Vec<(String, String)> = Vec::new();
    let read_dir = fs::read_dir(&month_dir)
        .with_context(|| format!("failed to read {}", month_dir.display()))?;
    for entry in read_dir {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|v| v.to_str()) else {
            continue;
        };
        if name == MONTH_MANIFEST_FILE || !name.ends_with(".json") {
            continue;
        }
        let stem = name.trim_end_matches(".json");
        let day = stem.split('-').next().unwrap_or(stem).to_string();
        days.push((day, format!("{year}/{month:02}/{name}")));
    }

    days.sort_by(|a, b| b.0.cmp(&a.0));

    let mut map = Map::new();
    for (day, path) in days {
        map.insert(day, Value::String(path));
    }

    let manifest = MonthManifest {
        year: format!("{year}"),
        month: format!("{month:02}"),
        days: map,
    };

    let path = month_dir.join(MONTH_MANIFEST_FILE);
    write_json_value(&path, &manifest)?;
    Ok(path)
}

/// Rebuild the year manifest from the month directories currently present
/// under `data_dir/YYYY`. Same full-scan, full-rewrite discipline as
/// [`rebuild_month`].
pub fn rebuild_year(data_dir: &Path, year: i32) -> Result<PathBuf> {
    let year_dir = data_dir.join(format!("{year}"));
    fs::create_dir_all(&year_dir)
        .with_context(|| format!("failed to create {}", year_dir.display()))?;

    let mut months: Vec<String> = Vec::new();
    let read_dir =
        fs::read_dir(&year_dir).with_context(|| format!("failed to read {}", year_dir.display()))?;
    for entry in read_dir {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|v| v.to_str()) else {
            continue;
        };
        if is_two_digit(name) {
            months.push(name.to_string());
        }
    }

    months.sort_by(|a, b| b.cmp(a));

    let mut map = Map::new();
    for month in months {
        let value = format!("{year}/{month}/{MONTH_MANIFEST_FILE}");
        map.insert(month, Value::String(value));
    }

    let manifest = YearManifest {
        year: format!("{year}"),
        months: map,
    };

    let path = year_dir.join(YEAR_MANIFEST_FILE);
    write_json_value(&path, &manifest)?;
    Ok(path)
}

pub fn read_month_manifest(data_dir: &Path, year: i32, month: u32) -> Result<MonthManifest> {
    let path = month_manifest_path(data_dir, year, month);
    let raw =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn read_year_manifest(data_dir: &Path, year: i32) -> Result<YearManifest> {
    let path = year_manifest_path(data_dir, year);
    let raw =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
