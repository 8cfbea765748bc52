//! Sources of truth for the repository inventory.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use repo_updater_core::{manifest, Repo};

use crate::error::SourceError;

#[async_trait]
pub trait Source: Send + Sync {
    /// Short label used in logs and error messages.
    fn name(&self) -> &str;

    /// Every repository this source currently reports.
    async fn repos(&self) -> Result<Vec<Repo>, SourceError>;
}

/// Fan-in over any number of sources.
///
/// All members are listed concurrently. If any member fails the whole listing
/// fails: a partial list would make the diff retire every repository of the
/// failing source.
#[derive(Clone, Default)]
pub struct Sources {
    sources: Vec<Arc<dyn Source>>,
}

impl Sources {
    pub fn new(sources: Vec<Arc<dyn Source>>) -> Self {
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl Source for Sources {
    fn name(&self) -> &str {
        "sources"
    }

    async fn repos(&self) -> Result<Vec<Repo>, SourceError> {
        let listings = join_all(self.sources.iter().map(|source| async move {
            (source.name().to_string(), source.repos().await)
        }))
        .await;

        let mut repos = Vec::new();
        let mut failures = Vec::new();
        for (name, listing) in listings {
            match listing {
                Ok(mut listed) => {
                    tracing::debug!(source = %name, count = listed.len(), "listed repos");
                    repos.append(&mut listed);
                }
                Err(err) => failures.push((name, err)),
            }
        }

        if failures.is_empty() {
            Ok(repos)
        } else {
            Err(SourceError::Sources {
                failures,
                total: self.sources.len(),
            })
        }
    }
}

/// Source backed by a YAML manifest file, re-read on every listing.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    name: String,
    path: PathBuf,
}

impl ManifestSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl Source for ManifestSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn repos(&self) -> Result<Vec<Repo>, SourceError> {
        let path = self.path.clone();
        let loaded = tokio::task::spawn_blocking(move || manifest::load(&path))
            .await
            .map_err(|err| SourceError::Failed {
                name: self.name.clone(),
                message: format!("manifest read join error: {err}"),
            })??;
        Ok(loaded.to_repos())
    }
}
