//! Persisted repository inventory.
//!
//! A [`Store`] reports the live inventory and upserts single repositories
//! keyed by identity. Upserts are issued concurrently by the applier, so every
//! implementation serializes its own writes.
//!
//! Shared semantics of the bundled stores:
//! - [`Store::repos`] omits soft-deleted records (`deleted_at` set).
//! - [`Store::upsert_repo`] replaces the record for the repository's identity;
//!   an incoming repository without `created_at` keeps the stored one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use repo_updater_core::{ExternalRepoSpec, Repo};

use crate::error::{io_err, StoreError};

#[async_trait]
pub trait Store: Send + Sync {
    /// Live (not soft-deleted) repositories.
    async fn repos(&self) -> Result<Vec<Repo>, StoreError>;

    /// Create, update or mark deleted, as `repo` says, keyed by identity.
    async fn upsert_repo(&self, repo: &Repo) -> Result<(), StoreError>;
}

type Inventory = BTreeMap<ExternalRepoSpec, Repo>;

fn merge_upsert(inventory: &mut Inventory, repo: &Repo) {
    let mut next = repo.clone();
    if next.created_at.is_none() {
        next.created_at = inventory
            .get(&repo.external_repo)
            .and_then(|existing| existing.created_at);
    }
    inventory.insert(next.external_repo.clone(), next);
}

fn live(inventory: &Inventory) -> Vec<Repo> {
    inventory
        .values()
        .filter(|repo| !repo.is_deleted())
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inventory: Mutex<Inventory>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `repos`, as if each had been upserted.
    pub fn with_repos(repos: impl IntoIterator<Item = Repo>) -> Self {
        let mut inventory = Inventory::new();
        for repo in repos {
            merge_upsert(&mut inventory, &repo);
        }
        Self {
            inventory: Mutex::new(inventory),
        }
    }

    /// Every record, soft-deleted ones included, in identity order.
    pub fn all(&self) -> Vec<Repo> {
        self.lock().values().cloned().collect()
    }

    pub fn get(&self, id: &ExternalRepoSpec) -> Option<Repo> {
        self.lock().get(id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Inventory> {
        // A poisoned lock only means another upsert panicked mid-insert; the
        // map itself is still consistent.
        self.inventory
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn repos(&self) -> Result<Vec<Repo>, StoreError> {
        Ok(live(&self.lock()))
    }

    async fn upsert_repo(&self, repo: &Repo) -> Result<(), StoreError> {
        merge_upsert(&mut self.lock(), repo);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JsonStore
// ---------------------------------------------------------------------------

/// On-disk payload of a [`JsonStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    repos: Vec<Repo>,
}

/// Store backed by a single JSON document.
///
/// The document is loaded once at [`JsonStore::open`]. Every upsert rewrites
/// it atomically (`<path>.tmp` + rename) while holding the store lock, so a
/// cycle with C changes over N stored records writes O(C × N) bytes. The
/// in-memory record is updated in place and rolled back if the write fails.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    inventory: tokio::sync::Mutex<Inventory>,
}

impl JsonStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let inventory = load_file(&path)?;
        Ok(Self {
            path,
            inventory: tokio::sync::Mutex::new(inventory),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record, soft-deleted ones included, in identity order.
    pub async fn all(&self) -> Vec<Repo> {
        self.inventory.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn repos(&self) -> Result<Vec<Repo>, StoreError> {
        Ok(live(&*self.inventory.lock().await))
    }

    async fn upsert_repo(&self, repo: &Repo) -> Result<(), StoreError> {
        let mut guard = self.inventory.lock().await;
        let previous = guard.get(&repo.external_repo).cloned();
        merge_upsert(&mut guard, repo);

        let written = match encode(&guard) {
            Ok(json) => {
                let path = self.path.clone();
                tokio::task::spawn_blocking(move || write_file(&path, &json))
                    .await
                    .unwrap_or_else(|err| {
                        Err(StoreError::Unavailable(format!(
                            "store write join error: {err}"
                        )))
                    })
            }
            Err(err) => Err(err),
        };

        if written.is_err() {
            match previous {
                Some(previous) => {
                    guard.insert(previous.external_repo.clone(), previous);
                }
                None => {
                    guard.remove(&repo.external_repo);
                }
            }
        }
        written
    }
}

/// Read every record from the JSON document at `path`, soft-deleted ones included.
///
/// Returns an empty list if the file does not yet exist.
pub fn read_all(path: &Path) -> Result<Vec<Repo>, StoreError> {
    Ok(load_file(path)?.into_values().collect())
}

fn load_file(path: &Path) -> Result<Inventory, StoreError> {
    if !path.exists() {
        return Ok(Inventory::new());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let file: StoreFile = serde_json::from_str(&contents)?;
    let mut inventory = Inventory::new();
    for repo in file.repos {
        inventory.insert(repo.external_repo.clone(), repo);
    }
    Ok(inventory)
}

/// Borrowed view of a [`StoreFile`], serialized without cloning records.
#[derive(Serialize)]
struct StoreFileRef<'a> {
    repos: Vec<&'a Repo>,
}

fn encode(inventory: &Inventory) -> Result<String, StoreError> {
    let file = StoreFileRef {
        repos: inventory.values().collect(),
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

#[cfg(test)]
fn save_file(path: &Path, inventory: &Inventory) -> Result<(), StoreError> {
    write_file(path, &encode(inventory)?)
}

fn write_file(path: &Path, json: &str) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}
