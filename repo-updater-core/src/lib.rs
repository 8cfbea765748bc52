//! repo-updater core library: domain types, list diffing, repo manifests.
//!
//! Public API surface:
//! - [`types`]: [`Repo`], [`ExternalRepoSpec`] and the lifecycle capability
//! - [`diff`]: the identity-keyed list diff used by every reconciliation cycle
//! - [`manifest`]: YAML repo manifests (load / save)
//! - [`error`]: [`ManifestError`]

pub mod diff;
pub mod error;
pub mod manifest;
pub mod types;

pub use diff::{diff, Diff, Diffable};
pub use error::ManifestError;
pub use types::{ExternalRepoSpec, Lifecycle, Repo};
