//! `repo-updater sync`: run one reconciliation cycle now.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use repo_updater_core::{Diff, Repo};
use repo_updater_daemon::{build_syncer, config};
use repo_updater_sync::{CycleError, SyncReport};

/// Arguments for `repo-updater sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Show what would change without writing to the store.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let config = config::load_at(&home)
            .context("failed to load config (create ~/.repo-updater/config.yaml first)")?;
        let syncer = build_syncer(&home, &config).context("failed to open store")?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;

        if self.dry_run {
            let planned = runtime
                .block_on(syncer.plan())
                .context("failed to plan sync")?;
            if self.json {
                return print_json(&PlanJson::from(&planned));
            }
            print_plan(&planned);
            return Ok(());
        }

        match runtime.block_on(syncer.sync()) {
            Ok(report) if self.json => print_json(&report),
            Ok(report) => {
                print_report(&report);
                Ok(())
            }
            Err(CycleError::Apply(failures)) => {
                eprint!("{failures}");
                anyhow::bail!("{} repos failed to sync", failures.len())
            }
            Err(err) => Err(err).context("sync failed"),
        }
    }
}

#[derive(Serialize)]
struct PlanJson {
    dry_run: bool,
    added: Vec<String>,
    modified: Vec<String>,
    deleted: Vec<String>,
}

impl From<&Diff<Repo>> for PlanJson {
    fn from(planned: &Diff<Repo>) -> Self {
        Self {
            dry_run: true,
            added: ids(&planned.added),
            modified: ids(&planned.modified),
            deleted: ids(&planned.deleted),
        }
    }
}

fn ids(repos: &[Repo]) -> Vec<String> {
    repos.iter().map(|r| r.id().to_string()).collect()
}

fn print_json<T: Serialize>(payload: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).context("failed to serialize sync JSON")?
    );
    Ok(())
}

fn print_plan(planned: &Diff<Repo>) {
    if planned.is_empty() {
        println!("[dry-run] ✓ nothing to do");
        return;
    }

    println!(
        "[dry-run] {} added, {} modified, {} deleted",
        planned.added.len(),
        planned.modified.len(),
        planned.deleted.len(),
    );
    for repo in &planned.added {
        println!("  {} {}  {}", "+".green().bold(), repo.id(), repo.name);
    }
    for repo in &planned.modified {
        println!("  {} {}  {}", "~".yellow().bold(), repo.id(), repo.name);
    }
    for repo in &planned.deleted {
        println!("  {} {}  {}", "-".red().bold(), repo.id(), repo.name);
    }
}

fn print_report(report: &SyncReport) {
    if report.changes() == 0 {
        println!("✓ up to date ({}ms)", report.duration_ms);
        return;
    }
    println!(
        "✓ synced ({} added, {} modified, {} deleted, {} applied) in {}ms",
        report.added, report.modified, report.deleted, report.applied, report.duration_ms,
    );
}
