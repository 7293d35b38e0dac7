use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::vault::config::load_config;
use crate::vault::index;
use crate::vault::paths::resolve_paths;

include!(concat!(env!("OUT_DIR"), "/vault_env_allowlist.rs"));

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("vault_home={}", paths.vault_home.display()));
    report.detail(format!("data_dir={}", paths.data_dir.display()));
    report.detail(format!("index_dir={}", paths.index_dir.display()));
    report.detail(format!("ledger_dir={}", paths.ledger_dir.display()));
    report.detail(format!("source={}", config.archive.source));
    report.detail(format!("timezone={}", config.archive.timezone));
    report.detail(format!("page_size={}", config.index.page_size));
    report.detail(format!("build={}", env!("BUILD_UUID")));

    let pagination = index::load_pagination(&paths.index_dir)?;
    report.detail(format!("index_pages={}", pagination.files.len()));
    report.detail(format!("index_total={}", pagination.total_items));

    match index::load_stats(&paths.index_dir)? {
        Some(stats) => {
            report.detail(format!("added_last_cycle={}", stats.added_last_cycle));
            report.detail(format!("last_update={}", stats.last_update));
        }
        None => report.detail("stats=absent"),
    }

    for key in GENERATED_VAULT_ENV_ALLOWLIST {
        if env::var_os(key).is_some() {
            report.detail(format!("env_override={key}"));
        }
    }

    if !paths.data_dir.exists() {
        report.detail("data_dir does not exist yet (no cycle has archived anything)");
    }

    Ok(report)
}
