//! `repo-updater run`: foreground reconciliation loop.

use anyhow::{Context, Result};

use repo_updater_daemon::start_blocking;

pub fn run() -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    start_blocking(&home).context("daemon exited with error")
}
