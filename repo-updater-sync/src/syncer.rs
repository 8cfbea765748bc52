//! The reconciliation loop.
//!
//! A [`Syncer`] periodically lists every source and the store, diffs the two,
//! stamps the changes and upserts them concurrently. One pass is a cycle:
//!
//! ```text
//! tick → fetch sourced ┐
//!        fetch stored  ┴→ diff → stamp → apply → aggregate → log
//! ```
//!
//! Cycles never overlap. A failed cycle is logged and the loop waits for the
//! next tick; only cancellation stops [`Syncer::run`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use repo_updater_core::{diff, Diff, Repo};

use crate::apply::apply;
use crate::error::{Cancelled, CycleError, SyncError};
use crate::source::{Source, Sources};
use crate::stamp::stamp;
use crate::store::Store;

/// Longest interval a [`Syncer`] will wait between cycles.
pub const MAX_INTERVAL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Injected time source; one reading per cycle.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall-clock [`Clock`].
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Summary of one successful cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// The cycle's `now`, as stamped on every change.
    pub started_at: DateTime<Utc>,
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub applied: usize,
    pub duration_ms: u128,
}

impl SyncReport {
    pub fn changes(&self) -> usize {
        self.added + self.modified + self.deleted
    }
}

/// Keeps a [`Store`] consistent with a set of [`Source`]s.
#[derive(Clone)]
pub struct Syncer {
    interval: Duration,
    source: Arc<dyn Source>,
    store: Arc<dyn Store>,
    now: Clock,
    max_concurrency: Option<usize>,
}

impl Syncer {
    pub fn new(
        interval: Duration,
        store: Arc<dyn Store>,
        sources: Vec<Arc<dyn Source>>,
        now: Clock,
    ) -> Self {
        Self {
            // tokio intervals must be non-zero, and the first deadline must fit in an Instant.
            interval: interval.clamp(Duration::from_millis(1), MAX_INTERVAL),
            source: Arc::new(Sources::new(sources)),
            store,
            now,
            max_concurrency: None,
        }
    }

    /// Cap the number of upserts in flight per cycle. `None` is unbounded.
    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.max_concurrency = limit;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a cycle every interval until `cancel` fires.
    ///
    /// The first cycle starts one interval after the call. Cancellation is
    /// only observed between cycles; a running cycle always completes.
    pub async fn run(&self, cancel: CancellationToken) -> Cancelled {
        let mut ticks = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "syncer started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("syncer stopping");
                    return Cancelled;
                }
                _ = ticks.tick() => {
                    match self.sync().await {
                        Ok(report) if report.changes() > 0 => tracing::info!(
                            added = report.added,
                            modified = report.modified,
                            deleted = report.deleted,
                            applied = report.applied,
                            duration_ms = report.duration_ms as u64,
                            "sync cycle completed",
                        ),
                        Ok(report) => tracing::debug!(
                            duration_ms = report.duration_ms as u64,
                            "sync cycle completed with no changes",
                        ),
                        Err(err) => tracing::error!(error = %err, "sync cycle failed"),
                    }
                }
            }
        }
    }

    /// Run exactly one cycle.
    pub async fn sync(&self) -> Result<SyncReport, CycleError> {
        let started = Instant::now();
        let planned = self.plan().await?;
        let (added, modified, deleted) = (
            planned.added.len(),
            planned.modified.len(),
            planned.deleted.len(),
        );

        let now = (self.now)();
        let batch = stamp(planned, now);
        let applied = if batch.is_empty() {
            0
        } else {
            let outcomes = apply(self.store.clone(), batch, self.max_concurrency).await;
            SyncError::aggregate(outcomes)?
        };

        Ok(SyncReport {
            started_at: now,
            added,
            modified,
            deleted,
            applied,
            duration_ms: started.elapsed().as_millis(),
        })
    }

    /// Fetch both sides and diff them without applying anything.
    pub async fn plan(&self) -> Result<Diff<Repo>, CycleError> {
        let (sourced, stored) = tokio::join!(self.source.repos(), self.store.repos());
        let sourced = sourced.map_err(CycleError::SourceFetch)?;
        let stored = stored.map_err(CycleError::StoreFetch)?;
        Ok(diff(sourced, stored, Repo::equal))
    }
}
