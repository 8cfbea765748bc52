//! YAML repo manifests.
//!
//! A manifest lists the repositories one code host exposes:
//!
//! ```text
//! service_type: github
//! service_id: https://github.com/
//! repos:
//!   - id: MDEwOlJlcG9zaXRvcnkx
//!     name: github.com/acme/api
//!     language: Rust
//! ```
//!
//! Saves are atomic: serialize → `<name>.yaml.tmp` sibling → `chmod 0600` →
//! `rename`. The `.tmp` file always lives next to the target so the rename
//! never crosses filesystems.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ManifestError};
use crate::types::{ExternalRepoSpec, Repo};

fn enabled_default() -> bool {
    true
}

/// One repository entry inside a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
}

/// Root of a manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub service_type: String,
    pub service_id: String,
    #[serde(default)]
    pub repos: Vec<ManifestEntry>,
}

impl Manifest {
    /// Convert every entry into a [`Repo`] without lifecycle timestamps.
    pub fn to_repos(&self) -> Vec<Repo> {
        self.repos
            .iter()
            .map(|entry| Repo {
                name: entry.name.clone(),
                description: entry.description.clone(),
                language: entry.language.clone(),
                enabled: entry.enabled,
                fork: entry.fork,
                archived: entry.archived,
                external_repo: ExternalRepoSpec::new(
                    entry.id.clone(),
                    self.service_type.clone(),
                    self.service_id.clone(),
                ),
                created_at: None,
                updated_at: None,
                deleted_at: None,
            })
            .collect()
    }
}

/// Load a manifest from `path`.
///
/// Returns `ManifestError::NotFound` if absent,
/// `ManifestError::Parse` (with path + line context) if malformed YAML.
pub fn load(path: &Path) -> Result<Manifest, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| ManifestError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Atomically save `manifest` to `path`, creating parent directories.
pub fn save(path: &Path, manifest: &Manifest) -> Result<(), ManifestError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "manifest.yaml".to_string());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    let yaml = serde_yaml::to_string(manifest)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(path, e));
    }
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ManifestError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ManifestError> {
    Ok(())
}
