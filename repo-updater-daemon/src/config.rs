//! `~/.repo-updater/config.yaml`.
//!
//! ```text
//! interval_secs: 60
//! store: store.json            # optional, relative to ~/.repo-updater/
//! max_concurrency: 32          # optional
//! log_format: text             # text | json
//! sources:
//!   - name: github
//!     manifest: sources/github.yaml
//! ```
//!
//! Every function has an `_at(home)` form used by
//! tests and a wrapper that derives `home` from `dirs::home_dir()`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use repo_updater_sync::MAX_INTERVAL;

use crate::error::ConfigError;
use crate::paths;

pub const DEFAULT_INTERVAL_SECS: u64 = 60;

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// One configured source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// YAML repo manifest listed by this source.
    pub manifest: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl DaemonConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn store_path(&self, home: &Path) -> PathBuf {
        match &self.store {
            Some(path) => paths::resolve(home, path),
            None => paths::default_store_path(home),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.interval_secs > MAX_INTERVAL.as_secs() {
            return Err(ConfigError::Invalid(format!(
                "interval_secs must be at most {}",
                MAX_INTERVAL.as_secs()
            )));
        }
        match self.max_concurrency {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "max_concurrency must be greater than zero when set".to_string(),
                ))
            }
            Some(limit) if limit > Semaphore::MAX_PERMITS => {
                return Err(ConfigError::Invalid(format!(
                    "max_concurrency must be at most {}",
                    Semaphore::MAX_PERMITS
                )))
            }
            _ => {}
        }
        // An empty source set would retire the whole inventory on the first tick.
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("no sources configured".to_string()));
        }
        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Invalid("source name must not be empty".to_string()));
            }
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
        }
        Ok(())
    }
}

/// Load and validate `<home>/.repo-updater/config.yaml`.
pub fn load_at(home: &Path) -> Result<DaemonConfig, ConfigError> {
    let path = paths::config_path(home);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config: DaemonConfig =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;
    config.validate()?;
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<DaemonConfig, ConfigError> {
    load_at(&home()?)
}

/// Atomically write `config` to `<home>/.repo-updater/config.yaml`.
pub fn save_at(home: &Path, config: &DaemonConfig) -> Result<(), ConfigError> {
    let path = paths::config_path(home);
    let root = paths::updater_root(home);
    std::fs::create_dir_all(&root).map_err(|source| ConfigError::Io {
        path: root.clone(),
        source,
    })?;

    let yaml = serde_yaml::to_string(config)?;
    let tmp = path.with_file_name(format!("{}.tmp", paths::CONFIG_FILE));
    std::fs::write(&tmp, yaml).map_err(|source| ConfigError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, &path).map_err(|source| ConfigError::Io { path, source })
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(home: &Path, yaml: &str) {
        let root = paths::updater_root(home);
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(paths::config_path(home), yaml).unwrap();
    }

    fn github() -> SourceConfig {
        SourceConfig {
            name: "github".to_string(),
            manifest: PathBuf::from("sources/github.yaml"),
        }
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let home = TempDir::new().unwrap();
        write_config(
            home.path(),
            "sources:\n  - name: github\n    manifest: sources/github.yaml\n",
        );
        let config = load_at(home.path()).expect("load");
        assert_eq!(config.interval(), Duration::from_secs(DEFAULT_INTERVAL_SECS));
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.max_concurrency, None);
        assert_eq!(
            config.store_path(home.path()),
            paths::default_store_path(home.path())
        );
    }

    #[test]
    fn missing_config_names_the_path() {
        let home = TempDir::new().unwrap();
        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let home = TempDir::new().unwrap();
        write_config(home.path(), "interval: 5\nsources: []\n");
        assert!(matches!(
            load_at(home.path()).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let base = DaemonConfig {
            interval_secs: 30,
            store: None,
            max_concurrency: None,
            log_format: LogFormat::Json,
            sources: vec![github()],
        };
        assert!(base.validate().is_ok());

        let zero_interval = DaemonConfig {
            interval_secs: 0,
            ..base.clone()
        };
        assert!(zero_interval.validate().is_err());

        let huge_interval = DaemonConfig {
            interval_secs: u64::MAX,
            ..base.clone()
        };
        assert!(huge_interval
            .validate()
            .unwrap_err()
            .to_string()
            .contains("interval_secs must be at most"));

        let longest = DaemonConfig {
            interval_secs: MAX_INTERVAL.as_secs(),
            ..base.clone()
        };
        assert!(longest.validate().is_ok());

        let huge_cap = DaemonConfig {
            max_concurrency: Some(usize::MAX),
            ..base.clone()
        };
        assert!(huge_cap
            .validate()
            .unwrap_err()
            .to_string()
            .contains("max_concurrency must be at most"));

        let zero_cap = DaemonConfig {
            max_concurrency: Some(0),
            ..base.clone()
        };
        assert!(zero_cap.validate().is_err());

        let no_sources = DaemonConfig {
            sources: vec![],
            ..base.clone()
        };
        assert!(no_sources
            .validate()
            .unwrap_err()
            .to_string()
            .contains("no sources"));

        let duplicate = DaemonConfig {
            sources: vec![github(), github()],
            ..base
        };
        assert!(duplicate
            .validate()
            .unwrap_err()
            .to_string()
            .contains("duplicate source name 'github'"));
    }

    #[test]
    fn save_then_load_roundtrip() {
        let home = TempDir::new().unwrap();
        let config = DaemonConfig {
            interval_secs: 15,
            store: Some(PathBuf::from("/var/lib/repo-updater/store.json")),
            max_concurrency: Some(8),
            log_format: LogFormat::Json,
            sources: vec![github()],
        };
        save_at(home.path(), &config).expect("save");
        assert_eq!(load_at(home.path()).expect("load"), config);
        assert_eq!(
            config.store_path(home.path()),
            PathBuf::from("/var/lib/repo-updater/store.json")
        );
    }
}
