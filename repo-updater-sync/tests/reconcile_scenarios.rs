//! End-to-end reconciliation cycles against in-memory collaborators.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use repo_updater_core::{ExternalRepoSpec, Repo};
use repo_updater_sync::{
    CycleError, MemoryStore, Source, SourceError, Store, StoreError, Syncer,
};

fn spec(id: &str) -> ExternalRepoSpec {
    ExternalRepoSpec::new(id, "github", "https://github.com/")
}

/// Repo `id` with version `v` folded into its description.
fn repo(id: &str, v: u32) -> Repo {
    let mut r = Repo::new(format!("github.com/acme/{id}"), spec(id));
    r.description = format!("v{v}");
    r
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap()
}

struct Listed(Vec<Repo>);

#[async_trait]
impl Source for Listed {
    fn name(&self) -> &str {
        "listed"
    }

    async fn repos(&self) -> Result<Vec<Repo>, SourceError> {
        Ok(self.0.clone())
    }
}

struct Down;

#[async_trait]
impl Source for Down {
    fn name(&self) -> &str {
        "down"
    }

    async fn repos(&self) -> Result<Vec<Repo>, SourceError> {
        Err(SourceError::Failed {
            name: "down".to_string(),
            message: "connection refused".to_string(),
        })
    }
}

/// Memory store that counts upserts and rejects the listed ids.
#[derive(Default)]
struct Recording {
    inner: MemoryStore,
    reject: HashSet<String>,
    upserts: AtomicUsize,
    fail_listing: bool,
}

impl Recording {
    fn seeded(repos: Vec<Repo>) -> Self {
        Self {
            inner: MemoryStore::with_repos(repos),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Store for Recording {
    async fn repos(&self) -> Result<Vec<Repo>, StoreError> {
        if self.fail_listing {
            return Err(StoreError::Unavailable("database is down".to_string()));
        }
        self.inner.repos().await
    }

    async fn upsert_repo(&self, repo: &Repo) -> Result<(), StoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.reject.contains(&repo.external_repo.id) {
            return Err(StoreError::Unavailable(format!("rejected {}", repo.external_repo.id)));
        }
        self.inner.upsert_repo(repo).await
    }
}

fn syncer(store: Arc<Recording>, sources: Vec<Arc<dyn Source>>) -> Syncer {
    Syncer::new(Duration::from_secs(60), store, sources, Arc::new(now))
}

#[tokio::test]
async fn unchanged_repo_needs_no_upsert() {
    let store = Arc::new(Recording::seeded(vec![repo("a", 1)]));
    let report = syncer(store.clone(), vec![Arc::new(Listed(vec![repo("a", 1)]))])
        .sync()
        .await
        .expect("cycle succeeds");

    assert_eq!(report.changes(), 0);
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn modified_repo_is_upserted_with_updated_at() {
    let store = Arc::new(Recording::seeded(vec![repo("a", 1)]));
    let report = syncer(store.clone(), vec![Arc::new(Listed(vec![repo("a", 2)]))])
        .sync()
        .await
        .expect("cycle succeeds");

    assert_eq!(report.modified, 1);
    assert_eq!(store.upserts.load(Ordering::SeqCst), 1);
    let stored = store.inner.get(&spec("a")).expect("stored");
    assert_eq!(stored.description, "v2");
    assert_eq!(stored.updated_at, Some(now()));
}

#[tokio::test]
async fn new_repo_is_upserted_with_created_at() {
    let store = Arc::new(Recording::default());
    let report = syncer(store.clone(), vec![Arc::new(Listed(vec![repo("b", 1)]))])
        .sync()
        .await
        .expect("cycle succeeds");

    assert_eq!(report.added, 1);
    let stored = store.inner.get(&spec("b")).expect("stored");
    assert_eq!(stored.created_at, Some(now()));
    assert_eq!(stored.deleted_at, None);
}

#[tokio::test]
async fn vanished_repo_is_soft_deleted() {
    let store = Arc::new(Recording::seeded(vec![repo("a", 1), repo("b", 1)]));
    let report = syncer(store.clone(), vec![Arc::new(Listed(vec![repo("a", 1)]))])
        .sync()
        .await
        .expect("cycle succeeds");

    assert_eq!(report.deleted, 1);
    let gone = store.inner.get(&spec("b")).expect("still recorded");
    assert_eq!(gone.deleted_at, Some(now()));
    let live: Vec<_> = store.repos().await.expect("repos");
    assert_eq!(live.len(), 1);
}

#[tokio::test]
async fn one_failed_upsert_does_not_block_the_other() {
    let store = Arc::new(Recording {
        inner: MemoryStore::with_repos(vec![repo("a", 1), repo("b", 1)]),
        reject: ["a".to_string()].into_iter().collect(),
        ..Recording::default()
    });
    let err = syncer(
        store.clone(),
        vec![Arc::new(Listed(vec![repo("a", 2), repo("b", 2)]))],
    )
    .sync()
    .await
    .unwrap_err();

    match err {
        CycleError::Apply(sync_err) => {
            assert_eq!(sync_err.len(), 1);
            assert!(sync_err.contains(&spec("a")));
            assert!(sync_err.to_string().contains("github:a@https://github.com/ sync error"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.inner.get(&spec("b")).expect("b").description, "v2");
    assert_eq!(store.inner.get(&spec("a")).expect("a").description, "v1");
}

#[tokio::test]
async fn k_of_n_failures_are_all_reported() {
    let sourced: Vec<Repo> = (0..10).map(|i| repo(&format!("r{i}"), 1)).collect();
    let reject: HashSet<String> = ["r1", "r4", "r7"].iter().map(|s| s.to_string()).collect();
    let store = Arc::new(Recording {
        reject,
        ..Recording::default()
    });

    let err = syncer(store.clone(), vec![Arc::new(Listed(sourced))])
        .sync()
        .await
        .unwrap_err();

    let CycleError::Apply(sync_err) = err else {
        panic!("expected an apply error");
    };
    assert_eq!(sync_err.len(), 3);
    assert_eq!(store.upserts.load(Ordering::SeqCst), 10);
    assert_eq!(store.inner.all().len(), 7);
}

#[tokio::test]
async fn failing_source_performs_no_upserts() {
    let store = Arc::new(Recording::seeded(vec![repo("a", 1)]));
    let err = syncer(
        store.clone(),
        vec![Arc::new(Listed(vec![repo("b", 1)])), Arc::new(Down)],
    )
    .sync()
    .await
    .unwrap_err();

    assert!(matches!(err, CycleError::SourceFetch(_)), "got: {err}");
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
    assert!(!store.inner.get(&spec("a")).expect("a").is_deleted());
}

#[tokio::test]
async fn failing_store_listing_performs_no_upserts() {
    let store = Arc::new(Recording {
        fail_listing: true,
        ..Recording::default()
    });
    let err = syncer(store.clone(), vec![Arc::new(Listed(vec![repo("a", 1)]))])
        .sync()
        .await
        .unwrap_err();

    assert!(matches!(err, CycleError::StoreFetch(_)), "got: {err}");
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn second_cycle_after_convergence_is_a_no_op() {
    let store = Arc::new(Recording::seeded(vec![repo("old", 1)]));
    let s = syncer(
        store.clone(),
        vec![Arc::new(Listed(vec![repo("a", 1), repo("b", 1)]))],
    );

    let first = s.sync().await.expect("first");
    assert_eq!(first.changes(), 3);
    let second = s.sync().await.expect("second");
    assert_eq!(second.changes(), 0);
    assert_eq!(store.upserts.load(Ordering::SeqCst), 3);
}
