//! Error types for repo-updater-sync.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use repo_updater_core::{ExternalRepoSpec, ManifestError, Repo};

/// Errors raised by a [`Store`](crate::Store).
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (JSON store).
    #[error("store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend-specific failure that does not fit the other variants.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a [`Source`](crate::Source).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Backend-specific failure of a named source.
    #[error("source {name} failed: {message}")]
    Failed { name: String, message: String },

    /// One or more members of a [`Sources`](crate::Sources) fan-in failed.
    #[error("{} of {} sources failed: {}", .failures.len(), .total, summarize(.failures))]
    Sources {
        failures: Vec<(String, SourceError)>,
        total: usize,
    },
}

fn summarize(failures: &[(String, SourceError)]) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("{name}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a single repository could not be applied.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The apply task panicked or was cancelled before reporting back.
    #[error("apply task aborted: {0}")]
    Aborted(String),
}

/// Every apply failure of one reconciliation cycle, keyed by repository identity.
///
/// Only constructed when at least one apply failed.
#[derive(Debug)]
pub struct SyncError {
    errors: BTreeMap<ExternalRepoSpec, ApplyError>,
}

impl SyncError {
    /// Fold one cycle's outcomes into a single result.
    ///
    /// Returns the number of successfully applied repositories, or a
    /// `SyncError` naming every failure.
    pub fn aggregate<I>(outcomes: I) -> Result<usize, SyncError>
    where
        I: IntoIterator<Item = (Repo, Result<(), ApplyError>)>,
    {
        let mut applied = 0usize;
        let mut errors = BTreeMap::new();
        for (repo, outcome) in outcomes {
            match outcome {
                Ok(()) => applied += 1,
                Err(err) => {
                    errors.insert(repo.external_repo, err);
                }
            }
        }

        if errors.is_empty() {
            Ok(applied)
        } else {
            Err(SyncError { errors })
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, id: &ExternalRepoSpec) -> Option<&ApplyError> {
        self.errors.get(id)
    }

    pub fn contains(&self, id: &ExternalRepoSpec) -> bool {
        self.errors.contains_key(id)
    }

    /// Failures in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (&ExternalRepoSpec, &ApplyError)> {
        self.errors.iter()
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, err) in &self.errors {
            writeln!(f, "{id} sync error: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SyncError {}

/// Outcome of a failed reconciliation cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Listing the sources failed; nothing was applied.
    #[error("fetching sourced repos failed: {0}")]
    SourceFetch(#[source] SourceError),

    /// Listing the store failed; nothing was applied.
    #[error("fetching stored repos failed: {0}")]
    StoreFetch(#[source] StoreError),

    /// Some applies failed; every other change was applied.
    #[error("{} repos failed to sync:\n{}", .0.len(), .0)]
    Apply(#[from] SyncError),
}

/// Returned by [`Syncer::run`](crate::Syncer::run) once its cancellation token fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("syncer cancelled")]
pub struct Cancelled;

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
