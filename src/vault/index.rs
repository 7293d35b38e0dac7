//! Global paginated index: fixed-capacity page files, a pagination directory
//! naming them oldest-first, and a stats snapshot overwritten each cycle.
//!
//! The currently-writable page is never cached in process memory; it is
//! recomputed from the pagination directory on every call. Page files are
//! written before the directory entry that references them, so the directory
//! never points at a page that was never created.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::vault::record::SlimRecord;
use crate::vault::util::{read_json_list, write_json_list, write_json_value};
use crate::vault::warn::{self, WarnEvent};

pub const PAGINATION_FILE: &str = "pagination.json";
pub const STATS_FILE: &str = "stats.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Pagination {
    pub total_items: u64,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub total_items: u64,
    pub added_last_cycle: u64,
    pub last_update: String,
}

pub fn pagination_path(index_dir: &Path) -> PathBuf {
    index_dir.join(PAGINATION_FILE)
}

pub fn stats_path(index_dir: &Path) -> PathBuf {
    index_dir.join(STATS_FILE)
}

pub fn page_file_name(number: usize) -> String {
    format!("index_{number}.json")
}

pub fn load_pagination(index_dir: &Path) -> Result<Pagination> {
    let path = pagination_path(index_dir);
    if !path.exists() {
        return Ok(Pagination::default());
    }
    let raw =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn load_stats(index_dir: &Path) -> Result<Option<Stats>> {
    let path = stats_path(index_dir);
    if !path.exists() {
        return Ok(None);
    }
    let raw =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let stats =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(stats))
}

fn load_page(index_dir: &Path, name: &str) -> Vec<SlimRecord> {
    let path = index_dir.join(name);
    match read_json_list(&path) {
        Ok(items) => items,
        Err(err) => {
            warn::emit(WarnEvent {
                code: "INDEX_PAGE_READ_FAILED",
                stage: "index",
                path: &path.display().to_string(),
                source: "na",
                reason: "treating-page-as-empty",
                err: &format!("{err:#}"),
            });
            Vec::new()
        }
    }
}

/// Append slim records to the index with per-item rollover: a page is rolled
/// as soon as it reaches `page_size`, so no page ever exceeds capacity even
/// when one batch is larger than the remaining room. Returns the new total.
pub fn append(
    index_dir: &Path,
    page_size: usize,
    slims: &[SlimRecord],
    now_iso: &str,
) -> Result<u64> {
    let mut pagination = load_pagination(index_dir)?;
    if slims.is_empty() {
        return Ok(pagination.total_items);
    }

    let (mut tail_name, mut items) = match pagination.files.last().cloned() {
        Some(name) => {
            // A listed-but-missing page is recreated empty rather than
            // trusted from the directory.
            let items = if index_dir.join(&name).exists() {
                load_page(index_dir, &name)
            } else {
                Vec::new()
            };
            (name, items)
        }
        None => {
            let name = page_file_name(1);
            pagination.files.push(name.clone());
            (name, Vec::new())
        }
    };

    for slim in slims {
        if items.len() >= page_size {
            write_json_list(&index_dir.join(&tail_name), &items)?;
            let next = pagination.files.len() + 1;
            tail_name = page_file_name(next);
            pagination.files.push(tail_name.clone());
            items = Vec::new();
        }
        items.push(slim.clone());
    }

    write_json_list(&index_dir.join(&tail_name), &items)?;

    pagination.total_items += slims.len() as u64;
    write_json_value(&pagination_path(index_dir), &pagination)?;

    write_stats(index_dir, pagination.total_items, slims.len() as u64, now_iso)?;
    Ok(pagination.total_items)
}

/// Overwrite the stats snapshot. Always computed from the running total,
/// never accumulated from history.
pub fn write_stats(index_dir: &Path, total_items: u64, added: u64, now_iso: &str) -> Result<()> {
    let stats = Stats {
        total_items,
        added_last_cycle: added,
        last_update: now_iso.to_string(),
    };
    write_json_value(&stats_path(index_dir), &stats)
}

/// Check the index invariants, returning one line per violation: every page
/// but the last holds exactly `page_size` items, the last at most that, the
/// directory total equals the sum of page lengths, and the stats snapshot
/// agrees.
pub fn verify(index_dir: &Path, page_size: usize) -> Result<Vec<String>> {
    let mut issues = Vec::new();
    let pagination = load_pagination(index_dir)?;

    let mut sum: u64 = 0;
    let page_count = pagination.files.len();
    for (i, name) in pagination.files.iter().enumerate() {
        let path = index_dir.join(name);
        if !path.exists() {
            issues.push(format!("pagination lists missing page file {name}"));
            continue;
        }
        let items: Vec<SlimRecord> = read_json_list(&path)?;
        sum += items.len() as u64;
        let is_last = i + 1 == page_count;
        if !is_last && items.len() != page_size {
            issues.push(format!(
                "page {name} holds {} items; every page but the last must hold exactly {page_size}",
                items.len()
            ));
        }
        if items.len() > page_size {
            issues.push(format!(
                "page {name} holds {} items; capacity is {page_size}",
                items.len()
            ));
        }
    }

    if sum != pagination.total_items {
        issues.push(format!(
            "pagination total is {} but pages hold {sum} items",
            pagination.total_items
        ));
    }

    match load_stats(index_dir)? {
        Some(stats) if stats.total_items != pagination.total_items => {
            issues.push(format!(
                "stats total is {} but pagination total is {}",
                stats.total_items, pagination.total_items
            ));
        }
        None if pagination.total_items > 0 => {
            issues.push("stats snapshot missing while pagination reports items".to_string());
        }
        _ => {}
    }

    Ok(issues)
}
