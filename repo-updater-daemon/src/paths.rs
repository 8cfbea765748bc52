use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.yaml";
pub const STORE_FILE: &str = "store.json";
pub const SOURCES_DIR: &str = "sources";

pub fn updater_root(home: &Path) -> PathBuf {
    home.join(".repo-updater")
}

pub fn config_path(home: &Path) -> PathBuf {
    updater_root(home).join(CONFIG_FILE)
}

pub fn default_store_path(home: &Path) -> PathBuf {
    updater_root(home).join(STORE_FILE)
}

pub fn sources_dir(home: &Path) -> PathBuf {
    updater_root(home).join(SOURCES_DIR)
}

/// Resolve a configured path: absolute paths are kept, relative ones are
/// taken relative to `~/.repo-updater/`.
pub fn resolve(home: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        updater_root(home).join(path)
    }
}
