//! Concurrent apply of a stamped batch.
//!
//! Every repository gets its own tokio task issuing one
//! [`Store::upsert_repo`] call. Tasks are independent: a failing or panicking
//! upsert only affects its own outcome. The caller gets exactly one outcome
//! per input repository, in batch order.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use repo_updater_core::Repo;

use crate::error::ApplyError;
use crate::store::Store;

/// One repository and the result of applying it.
pub type ApplyOutcome = (Repo, Result<(), ApplyError>);

/// Upsert every repository in `batch` concurrently.
///
/// `limit` caps the number of upserts in flight; `None` starts them all at
/// once. Limits above [`Semaphore::MAX_PERMITS`] are clamped to it.
pub async fn apply(
    store: Arc<dyn Store>,
    batch: Vec<Repo>,
    limit: Option<usize>,
) -> Vec<ApplyOutcome> {
    let permits = limit.map(|n| Arc::new(Semaphore::new(n.clamp(1, Semaphore::MAX_PERMITS))));
    let mut tasks = JoinSet::new();

    for (index, repo) in batch.iter().enumerate() {
        let store = store.clone();
        let permits = permits.clone();
        let repo = repo.clone();
        tasks.spawn(async move {
            let _permit = match permits {
                Some(permits) => match permits.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(err) => return (index, Err(ApplyError::Aborted(err.to_string()))),
                },
                None => None,
            };
            (index, store.upsert_repo(&repo).await.map_err(ApplyError::from))
        });
    }

    let mut slots: Vec<Option<Result<(), ApplyError>>> = batch.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(err) => tracing::error!(error = %err, "apply task failed to report"),
        }
    }

    batch
        .into_iter()
        .zip(slots)
        .map(|(repo, slot)| {
            let outcome = slot.unwrap_or_else(|| {
                Err(ApplyError::Aborted(format!(
                    "no outcome reported for {}",
                    repo.external_repo
                )))
            });
            (repo, outcome)
        })
        .collect()
}
