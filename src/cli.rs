use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(
    name = "newsvault",
    about = "Date-partitioned feed archive and paginated index engine",
    version
)]
struct Cli {
    /// Emit the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one ingestion cycle over normalized entries (JSON array file, or
    /// `-` for stdin). Newly-archived records are printed to stdout.
    Ingest {
        /// Entries input path, `-` for stdin.
        #[arg(long, default_value = "-")]
        entries: String,
    },
    /// Record a delivered identity in the source ledger (call after a
    /// successful outward delivery).
    MarkSent {
        #[arg(long)]
        id: String,
        /// Only report the most recently recorded identity.
        #[arg(long)]
        check: bool,
    },
    /// Rebuild month/year rollup manifests from the partitions on disk.
    Rebuild {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, requires = "year")]
        month: Option<u32>,
    },
    /// Show vault paths, config, and index statistics.
    Status,
    /// Check archive and index invariants.
    Verify,
}

fn print_report(report: &CommandReport, json: bool, to_stderr: bool) -> Result<()> {
    if json {
        let rendered = serde_json::to_string_pretty(report)?;
        if to_stderr {
            eprintln!("{rendered}");
        } else {
            println!("{rendered}");
        }
        return Ok(());
    }

    let mut lines = Vec::with_capacity(1 + report.details.len() + report.issues.len());
    lines.push(format!("{} ok={}", report.command, report.ok));
    for detail in &report.details {
        lines.push(format!("  {detail}"));
    }
    for issue in &report.issues {
        lines.push(format!("  issue: {issue}"));
    }

    for line in lines {
        if to_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let (report, to_stderr) = match &cli.command {
        Commands::Ingest { entries } => {
            // stdout carries the added-records JSON for the delivery
            // collaborator; the report moves to stderr.
            let opts = commands::ingest::IngestOptions {
                entries: entries.clone(),
            };
            (commands::ingest::run(&opts)?, true)
        }
        Commands::MarkSent { id, check } => {
            let opts = commands::mark_sent::MarkSentOptions {
                identity: id.clone(),
                check: *check,
            };
            (commands::mark_sent::run(&opts)?, false)
        }
        Commands::Rebuild { year, month } => {
            let opts = commands::rebuild::RebuildOptions {
                year: *year,
                month: *month,
            };
            (commands::rebuild::run(&opts)?, false)
        }
        Commands::Status => (commands::status::run()?, false),
        Commands::Verify => (commands::verify::run()?, false),
    };

    print_report(&report, cli.json, to_stderr)?;

    if !report.ok {
        std::process::exit(2);
    }
    Ok(())
}
