//! Domain types for the repository inventory.
//!
//! A [`Repo`] is identified by its [`ExternalRepoSpec`] (the code host's own
//! identifier for it). Everything else is payload, except the three lifecycle
//! timestamps, which are bookkeeping owned by the reconciliation loop.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::Diffable;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifies a repository on the code host that exposes it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExternalRepoSpec {
    /// The code host's identifier for the repository.
    pub id: String,
    /// Kind of code host, e.g. `github` or `gitlab`.
    pub service_type: String,
    /// Base URL of the code host instance.
    pub service_id: String,
}

impl ExternalRepoSpec {
    pub fn new(
        id: impl Into<String>,
        service_type: impl Into<String>,
        service_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            service_type: service_type.into(),
            service_id: service_id.into(),
        }
    }
}

impl fmt::Display for ExternalRepoSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.service_type, self.id, self.service_id)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle capability
// ---------------------------------------------------------------------------

/// Something that carries creation, update and deletion timestamps.
pub trait Lifecycle {
    fn mark_created(&mut self, at: DateTime<Utc>);
    fn mark_updated(&mut self, at: DateTime<Utc>);
    fn mark_deleted(&mut self, at: DateTime<Utc>);
}

// ---------------------------------------------------------------------------
// Repo
// ---------------------------------------------------------------------------

fn enabled_default() -> bool {
    true
}

/// A repository record as seen by a source or held by a store.
///
/// The derived `PartialEq` compares every field, timestamps included. Use
/// [`Repo::equal`] to compare observable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    pub external_repo: ExternalRepoSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Repo {
    /// A new enabled repository with an empty payload and no timestamps.
    pub fn new(name: impl Into<String>, external_repo: ExternalRepoSpec) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            language: String::new(),
            enabled: true,
            fork: false,
            archived: false,
            external_repo,
            created_at: None,
            updated_at: None,
            deleted_at: None,
        }
    }

    pub fn id(&self) -> &ExternalRepoSpec {
        &self.external_repo
    }

    /// Payload equality. Lifecycle timestamps are ignored.
    pub fn equal(&self, other: &Repo) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.language == other.language
            && self.enabled == other.enabled
            && self.fork == other.fork
            && self.archived == other.archived
            && self.external_repo == other.external_repo
    }

    /// `true` once the repository has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Diffable for Repo {
    type Key = ExternalRepoSpec;

    fn key(&self) -> ExternalRepoSpec {
        self.external_repo.clone()
    }
}

impl Lifecycle for Repo {
    fn mark_created(&mut self, at: DateTime<Utc>) {
        self.created_at = Some(at);
    }

    fn mark_updated(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }

    fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
