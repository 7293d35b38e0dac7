use anyhow::Result;

use crate::commands::CommandReport;
use crate::vault::config::load_config;
use crate::vault::ledger;
use crate::vault::paths::resolve_paths;

#[derive(Debug, Clone)]
pub struct MarkSentOptions {
    pub identity: String,
    /// Report the most recently recorded identity instead of writing.
    pub check: bool,
}

/// Record a delivered identity in the source's pointer ledger. The delivery
/// collaborator calls this only after a successful outward send; a crash
/// before it lands simply re-delivers next cycle (at-least-once).
pub fn run(opts: &MarkSentOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config()?;
    let mut report = CommandReport::new("mark-sent");

    let source = config.archive.source.as_str();
    let ledger_file = ledger::ledger_path(&paths.ledger_dir, source);
    report.detail(format!("ledger={}", ledger_file.display()));
    report.detail(format!("source={source}"));

    if opts.check {
        match ledger::last_identity(&ledger_file, source) {
            Some(last) => {
                report.detail(format!("last_identity={last}"));
                if last == opts.identity.trim() {
                    report.detail("identity already recorded".to_string());
                }
            }
            None => report.detail("ledger is empty".to_string()),
        }
        return Ok(report);
    }

    ledger::record_identity(&ledger_file, &opts.identity)?;
    report.detail(format!("recorded={}", opts.identity.trim()));
    Ok(report)
}
