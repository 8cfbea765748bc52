//! `repo-updater status`: stored inventory at a glance.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use repo_updater_core::Repo;
use repo_updater_daemon::{config, paths, ConfigError};
use repo_updater_sync::store;

/// Arguments for `repo-updater status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Include soft-deleted repositories.
    #[arg(long)]
    pub all: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let store_path = resolve_store_path(&home)?;

        let mut repos = store::read_all(&store_path)
            .with_context(|| format!("failed to read store {}", store_path.display()))?;
        let deleted = repos.iter().filter(|r| r.is_deleted()).count();
        let live = repos.len() - deleted;
        if !self.all {
            repos.retain(|r| !r.is_deleted());
        }

        if self.json {
            return print_json(live, deleted, repos);
        }
        print_table(&store_path, live, deleted, repos);
        Ok(())
    }
}

/// Store named by the config, or the default location when no config exists yet.
fn resolve_store_path(home: &Path) -> Result<PathBuf> {
    match config::load_at(home) {
        Ok(config) => Ok(config.store_path(home)),
        Err(ConfigError::NotFound { .. }) => Ok(paths::default_store_path(home)),
        Err(err) => Err(err).context("failed to load config"),
    }
}

#[derive(Serialize)]
struct StatusJson {
    summary: SummaryJson,
    repos: Vec<RepoJson>,
}

#[derive(Serialize)]
struct SummaryJson {
    live: usize,
    deleted: usize,
}

#[derive(Serialize)]
struct RepoJson {
    id: String,
    name: String,
    state: &'static str,
    language: String,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "repo")]
    name: String,
    #[tabled(rename = "external id")]
    id: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "last change")]
    last_change: String,
}

fn print_json(live: usize, deleted: usize, repos: Vec<Repo>) -> Result<()> {
    let payload = StatusJson {
        summary: SummaryJson { live, deleted },
        repos: repos
            .into_iter()
            .map(|repo| RepoJson {
                id: repo.id().to_string(),
                state: state_key(&repo),
                name: repo.name,
                language: repo.language,
                created_at: repo.created_at,
                updated_at: repo.updated_at,
                deleted_at: repo.deleted_at,
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(store_path: &Path, live: usize, deleted: usize, repos: Vec<Repo>) {
    println!(
        "repo-updater v{} | {} live | {} deleted | {}",
        env!("CARGO_PKG_VERSION"),
        live,
        deleted,
        store_path.display(),
    );

    if repos.is_empty() {
        println!("No repositories stored. Run 'repo-updater sync' first.");
        return;
    }

    let rows: Vec<StatusTableRow> = repos
        .iter()
        .map(|repo| StatusTableRow {
            name: repo.name.clone(),
            id: repo.id().to_string(),
            state: state_label(repo),
            last_change: last_change(repo),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn state_key(repo: &Repo) -> &'static str {
    if repo.is_deleted() {
        "deleted"
    } else {
        "live"
    }
}

fn state_label(repo: &Repo) -> String {
    if repo.is_deleted() {
        "DELETED".red().bold().to_string()
    } else {
        "LIVE".green().bold().to_string()
    }
}

fn last_change(repo: &Repo) -> String {
    repo.deleted_at
        .or(repo.updated_at)
        .or(repo.created_at)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}
