//! repo-updater: keep a repository inventory in sync with its code hosts.
//!
//! # Usage
//!
//! ```text
//! repo-updater run                      # reconcile every interval until ctrl-c
//! repo-updater sync [--dry-run] [--json]
//! repo-updater status [--all] [--json]
//! ```
//!
//! Configuration lives in `~/.repo-updater/config.yaml`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "repo-updater",
    version,
    about = "Reconcile a stored repository inventory with its code hosts",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the reconciliation loop in the foreground until ctrl-c.
    Run,

    /// Run a single reconciliation cycle.
    Sync(SyncArgs),

    /// Show the stored repository inventory.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run => commands::run::run(),
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
