use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use repo_updater_sync::{system_clock, JsonStore, ManifestSource, Source, Syncer};

use crate::config::{self, DaemonConfig, LogFormat};
use crate::error::{io_err, DaemonError};
use crate::paths::updater_root;

/// Load the config, start the runtime and block the current thread until the
/// daemon exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    let config = config::load_at(home)?;
    init_tracing(config.log_format);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), config))
}

/// Run the syncer until ctrl-c.
pub async fn run(home: PathBuf, config: DaemonConfig) -> Result<(), DaemonError> {
    let cancel = CancellationToken::new();

    let signal_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    // Stop the syncer whether or not the handler installed.
                    cancel.cancel();
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down");
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Task {
                            task: "signal_handler",
                            message: format!("ctrl-c handler failed: {err}"),
                        }),
                    }
                }
            }
        })
    };

    let result = run_until(home, config, cancel.clone()).await;
    cancel.cancel();
    handle_join("signal_handler", signal_handle.await)?;
    result
}

/// Run the syncer until `cancel` fires.
pub async fn run_until(
    home: PathBuf,
    config: DaemonConfig,
    cancel: CancellationToken,
) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;
    let syncer = build_syncer(&home, &config)?;

    tracing::info!(
        sources = config.sources.len(),
        store = %config.store_path(&home).display(),
        interval_secs = config.interval_secs,
        "repo-updater daemon started",
    );

    let syncer_handle = tokio::spawn(async move { syncer.run(cancel).await });
    match syncer_handle.await {
        Ok(cancelled) => {
            tracing::info!(reason = %cancelled, "repo-updater daemon stopped");
            Ok(())
        }
        Err(err) => Err(DaemonError::Task {
            task: "syncer",
            message: format!("join failure: {err}"),
        }),
    }
}

/// Wire the configured store and sources into a [`Syncer`].
pub fn build_syncer(home: &Path, config: &DaemonConfig) -> Result<Syncer, DaemonError> {
    let store = Arc::new(JsonStore::open(config.store_path(home))?);
    let sources: Vec<Arc<dyn Source>> = config
        .sources
        .iter()
        .map(|source| {
            Arc::new(ManifestSource::new(
                source.name.clone(),
                crate::paths::resolve(home, &source.manifest),
            )) as Arc<dyn Source>
        })
        .collect();

    Ok(
        Syncer::new(config.interval(), store, sources, system_clock())
            .with_max_concurrency(config.max_concurrency),
    )
}

/// Install the global tracing subscriber. Later calls are no-ops.
pub fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    let root = updater_root(home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    }
    Ok(())
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Task {
            task,
            message: format!("join failure: {err}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use repo_updater_core::manifest::{self, Manifest, ManifestEntry};
    use tempfile::TempDir;

    fn config() -> DaemonConfig {
        DaemonConfig {
            interval_secs: 60,
            store: None,
            max_concurrency: Some(4),
            log_format: LogFormat::Text,
            sources: vec![SourceConfig {
                name: "github".to_string(),
                manifest: PathBuf::from("sources/github.yaml"),
            }],
        }
    }

    fn write_manifest(home: &Path, ids: &[&str]) {
        let doc = Manifest {
            service_type: "github".to_string(),
            service_id: "https://github.com/".to_string(),
            repos: ids
                .iter()
                .map(|id| ManifestEntry {
                    id: id.to_string(),
                    name: format!("github.com/acme/{id}"),
                    description: String::new(),
                    language: String::new(),
                    enabled: true,
                    fork: false,
                    archived: false,
                })
                .collect(),
        };
        manifest::save(&crate::paths::sources_dir(home).join("github.yaml"), &doc).unwrap();
    }

    #[tokio::test]
    async fn built_syncer_reconciles_manifest_into_json_store() {
        let home = TempDir::new().unwrap();
        write_manifest(home.path(), &["r1", "r2"]);

        let syncer = build_syncer(home.path(), &config()).expect("build");
        let report = syncer.sync().await.expect("sync");
        assert_eq!(report.added, 2);

        let stored = repo_updater_sync::store::read_all(&config().store_path(home.path()))
            .expect("read store");
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|r| r.created_at.is_some()));
    }

    #[tokio::test]
    async fn run_until_returns_once_cancelled() {
        let home = TempDir::new().unwrap();
        write_manifest(home.path(), &["r1"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        run_until(home.path().to_path_buf(), config(), cancel)
            .await
            .expect("clean shutdown");
        assert!(updater_root(home.path()).exists());
    }

    #[test]
    fn init_tracing_twice_is_harmless() {
        init_tracing(LogFormat::Json);
        init_tracing(LogFormat::Text);
    }
}
