//! Ingestion coordinator: one entry point per polling cycle.
//!
//! The archive never initiates delivery. It decides what is new, records it
//! durably, and hands the added records back to the caller; the caller marks
//! identities delivered (ledger) only after a successful outward send.
//! Archiving is exactly-once; outward notification is at-least-once.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;

use crate::error::NewsVaultError;
use crate::vault::config::VaultConfig;
use crate::vault::paths::VaultPaths;
use crate::vault::record::{DayKey, FeedEntry, ItemRecord, SlimRecord, build_record, day_key_for};
use crate::vault::util::now_local;
use crate::vault::warn::{self, WarnEvent};
use crate::vault::{daily, index, ledger, manifest};

#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    /// Newly-archived records in archival order; the delivery collaborator's
    /// input.
    pub added: Vec<ItemRecord>,
    /// Partition files touched this cycle.
    pub partitions: Vec<String>,
    /// Index total after this cycle; `None` when the index append degraded.
    pub total_indexed: Option<u64>,
    pub warnings: Vec<String>,
}

/// Advisory exclusive lock held for the duration of a cycle. Concurrent
/// cycles against one data directory would corrupt the whole-file-rewrite
/// pattern, so a held lock fails the new cycle fast instead of queueing.
struct CycleLock {
    file: File,
}

impl CycleLock {
    fn acquire(lock_file: &Path) -> Result<Self> {
        if let Some(parent) = lock_file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = File::create(lock_file)
            .with_context(|| format!("failed to open {}", lock_file.display()))?;
        if file.try_lock_exclusive().is_err() {
            return Err(NewsVaultError::CycleLocked(lock_file.display().to_string()).into());
        }
        Ok(Self { file })
    }
}

impl Drop for CycleLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Run one ingestion cycle over already-normalized entries.
///
/// Zero new records is a strict no-op: no partition, manifest, index, or
/// stats file is touched, so an idle feed never churns timestamps.
pub fn run_cycle(
    paths: &VaultPaths,
    config: &VaultConfig,
    entries: &[FeedEntry],
) -> Result<CycleOutcome> {
    let zone = config.zone()?;
    let _lock = CycleLock::acquire(&paths.lock_file)?;

    let now = now_local(zone);
    let source = config.archive.source.as_str();

    // Defensive pre-check against the pointer ledger. Day-partition
    // membership below stays authoritative; this only guards the window
    // before today's partition exists.
    let ledger_file = ledger::ledger_path(&paths.ledger_dir, source);
    let delivered = ledger::recorded_identities(&ledger_file, source);

    let mut by_day: Vec<(DayKey, Vec<ItemRecord>)> = Vec::new();
    for entry in entries {
        let record = build_record(entry, zone, &config.archive.default_language);
        if let Some(identity) = record.identity() {
            if delivered.contains(identity) {
                continue;
            }
        }
        let key = day_key_for(record.published.as_deref(), zone, &now);
        match by_day.iter().position(|(k, _)| *k == key) {
            Some(pos) => by_day[pos].1.push(record),
            None => by_day.push((key, vec![record])),
        }
    }

    let mut outcome = CycleOutcome::default();
    let mut affected: BTreeSet<(i32, u32)> = BTreeSet::new();

    for (key, records) in &by_day {
        let added = daily::append(
            &paths.data_dir,
            *key,
            records,
            config.dedup.title_fallback,
            source,
        );
        if added.is_empty() {
            continue;
        }
        affected.insert((key.year, key.month));
        outcome
            .partitions
            .push(key.partition_path(&paths.data_dir).display().to_string());
        outcome.added.extend(added);
    }

    if outcome.added.is_empty() {
        return Ok(outcome);
    }

    for (year, month) in &affected {
        if let Err(err) = manifest::rebuild_month(&paths.data_dir, *year, *month) {
            warn_manifest(paths, source, &mut outcome, &err);
        }
    }
    let years: BTreeSet<i32> = affected.iter().map(|(year, _)| *year).collect();
    for year in years {
        if let Err(err) = manifest::rebuild_year(&paths.data_dir, year) {
            warn_manifest(paths, source, &mut outcome, &err);
        }
    }

    let slims: Vec<SlimRecord> = outcome.added.iter().map(SlimRecord::from).collect();
    match index::append(
        &paths.index_dir,
        config.index.page_size,
        &slims,
        &now.to_rfc3339(),
    ) {
        Ok(total) => outcome.total_indexed = Some(total),
        Err(err) => {
            warn::emit(WarnEvent {
                code: "INDEX_APPEND_FAILED",
                stage: "index",
                path: &paths.index_dir.display().to_string(),
                source,
                reason: "records-archived-but-not-indexed",
                err: &format!("{err:#}"),
            });
            outcome
                .warnings
                .push(format!("index append failed: {err:#}"));
        }
    }

    Ok(outcome)
}

fn warn_manifest(
    paths: &VaultPaths,
    source: &str,
    outcome: &mut CycleOutcome,
    err: &anyhow::Error,
) {
    warn::emit(WarnEvent {
        code: "MANIFEST_REBUILD_FAILED",
        stage: "manifest",
        path: &paths.data_dir.display().to_string(),
        source,
        reason: "manifests-are-derived-will-heal-next-cycle",
        err: &format!("{err:#}"),
    });
    outcome
        .warnings
        .push(format!("manifest rebuild failed: {err:#}"));
}
