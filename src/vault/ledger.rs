//! Pointer-policy dedup ledger: one newline-delimited file per source,
//! most-recent-first, full history trail.
//!
//! The ledger is a defensive pre-check only. Day-partition membership
//! (`vault::daily`) is the authoritative "already archived" test; the ledger
//! alone must never be trusted as sufficient. It is written exclusively by
//! the delivery caller (`mark-sent`) after a successful outward delivery,
//! which keeps "archived" and "delivered" as two independent ledgers.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::vault::warn::{self, WarnEvent};

fn sanitize_slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_dash = false;
    for ch in input.chars() {
        let keep = ch.is_ascii_alphanumeric();
        if keep {
            out.push(ch.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

pub fn ledger_path(ledger_dir: &Path, source: &str) -> PathBuf {
    let slug = sanitize_slug(source);
    let name = if slug.is_empty() { "source".to_string() } else { slug };
    ledger_dir.join(format!("{name}.txt"))
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Every identity the ledger has ever recorded, as a set. A read failure
/// degrades to "nothing seen" with a warning: over-notification is preferred
/// to a silently stopped cycle.
pub fn recorded_identities(path: &Path, source: &str) -> BTreeSet<String> {
    match read_lines(path) {
        Ok(lines) => lines.into_iter().collect(),
        Err(err) => {
            warn::emit(WarnEvent {
                code: "LEDGER_READ_FAILED",
                stage: "ledger",
                path: &path.display().to_string(),
                source,
                reason: "treating-all-entries-as-unseen",
                err: &format!("{err:#}"),
            });
            BTreeSet::new()
        }
    }
}

/// Most recently recorded identity, for quick single-item guards. Degrades
/// to `None` on read failure, with a warning.
pub fn last_identity(path: &Path, source: &str) -> Option<String> {
    match read_lines(path) {
        Ok(lines) => lines.into_iter().next(),
        Err(err) => {
            warn::emit(WarnEvent {
                code: "LEDGER_READ_FAILED",
                stage: "ledger",
                path: &path.display().to_string(),
                source,
                reason: "treating-last-identity-as-unknown",
                err: &format!("{err:#}"),
            });
            None
        }
    }
}

/// Prepend `identity` to the ledger, preserving all prior entries. Creates
/// the file on first write.
pub fn record_identity(path: &Path, identity: &str) -> Result<()> {
    let trimmed = identity.trim();
    if trimmed.is_empty() {
        anyhow::bail!("refusing to record an empty identity");
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let old = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    } else {
        String::new()
    };

    let mut out = String::with_capacity(trimmed.len() + 1 + old.len());
    out.push_str(trimmed);
    out.push('\n');
    out.push_str(&old);
    fs::write(path, out).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
