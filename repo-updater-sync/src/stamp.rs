//! Lifecycle stamping of a diff into an apply batch.

use chrono::{DateTime, Utc};

use repo_updater_core::{Diff, Lifecycle};

/// Flatten `diff` into the batch handed to the applier.
///
/// Added entities get `created_at`, modified ones `updated_at`, deleted ones
/// `deleted_at`, all set to the same `now`. The batch lists added, then
/// modified, then deleted.
pub fn stamp<T: Lifecycle>(diff: Diff<T>, now: DateTime<Utc>) -> Vec<T> {
    let Diff {
        added,
        modified,
        deleted,
    } = diff;

    let mut batch = Vec::with_capacity(added.len() + modified.len() + deleted.len());
    for mut entity in added {
        entity.mark_created(now);
        batch.push(entity);
    }
    for mut entity in modified {
        entity.mark_updated(now);
        batch.push(entity);
    }
    for mut entity in deleted {
        entity.mark_deleted(now);
        batch.push(entity);
    }
    batch
}
