//! JSON-based persistence for the layout file and the per-machine instance
//! identifier, under the platform-appropriate config directory:
//! - Windows: `%APPDATA%\konflikt\`
//! - Linux:   `~/.config/konflikt/` (or `$XDG_CONFIG_HOME/konflikt/`)
//! - macOS:   `~/Library/Application Support/konflikt/`
//!
//! Both documents are whole-file replaces: a write serializes the entire
//! value and overwrites the file in one go, there is no incremental/append
//! update. Reads tolerate a missing or corrupt file by falling back to a
//! default rather than failing startup — I/O failures here are logged and
//! the process continues with in-memory state.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use konflikt_core::LayoutFile;

use crate::application::coordinator_loop::LayoutPersistence;

/// Error type for config-directory and instance-id file operations. Layout
/// file I/O failures are deliberately *not* represented here — callers
/// handle them by falling back to [`LayoutFile::default`] and logging,
/// continuing with in-memory state rather than aborting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves the directory holding `layout.json` and `instance-id`: the
/// caller's `--config-dir` override if given, otherwise the platform config
/// directory with a `konflikt` subdirectory.
pub fn resolve_config_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(dir) => Ok(dir),
        None => platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir),
    }
}

fn layout_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join("layout.json")
}

fn instance_id_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join("instance-id")
}

/// Loads the persisted layout, tolerating a missing or corrupt file by
/// returning [`LayoutFile::default`]. Every `ScreenEntry.online` flag is
/// reset to `false` by [`konflikt_core::LayoutManager::from_file`] once the
/// caller rebuilds the manager from this value — clients only become
/// `online` again once they re-register.
pub fn load_layout(config_dir: &Path) -> LayoutFile {
    let path = layout_file_path(config_dir);
    match std::fs::read_to_string(&path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "layout file is corrupt, starting from an empty layout");
                LayoutFile::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => LayoutFile::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read layout file, starting from an empty layout");
            LayoutFile::default()
        }
    }
}

/// Persists the layout as a whole-file JSON replace. Failure is logged and
/// swallowed; the caller keeps running with the in-memory layout.
pub fn save_layout(config_dir: &Path, file: &LayoutFile) {
    let path = layout_file_path(config_dir);
    if let Err(e) = write_file_atomic(&path, file) {
        tracing::warn!(path = %path.display(), error = %e, "failed to persist layout file");
    }
}

fn write_file_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io { path: parent.to_path_buf(), source })?;
    }
    let json = serde_json::to_string_pretty(value).expect("wire types always serialize");
    std::fs::write(path, json).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
}

/// Loads the stable per-user-per-machine instance id, generating and
/// persisting a fresh UUID on first run. Unlike the layout file, a failure
/// to persist a freshly generated id is logged but does not stop the
/// process from using it for this run.
pub fn load_or_create_instance_id(config_dir: &Path) -> String {
    let path = instance_id_file_path(config_dir);
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let trimmed = content.trim();
            if Uuid::parse_str(trimmed).is_ok() {
                return trimmed.to_string();
            }
            tracing::warn!(path = %path.display(), "instance-id file is not a valid UUID, regenerating");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read instance-id file, regenerating");
        }
    }

    let fresh = Uuid::new_v4().to_string();
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(path = %parent.display(), error = %e, "failed to create config directory");
        }
    }
    if let Err(e) = std::fs::write(&path, &fresh) {
        tracing::warn!(path = %path.display(), error = %e, "failed to persist instance-id file");
    }
    fresh
}

/// [`LayoutPersistence`] adapter used by the coordinator loop so the
/// application layer never imports this infrastructure module directly.
pub struct FileLayoutPersistence {
    config_dir: PathBuf,
}

impl FileLayoutPersistence {
    pub fn new(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }
}

impl LayoutPersistence for FileLayoutPersistence {
    fn save(&self, file: &LayoutFile) {
        save_layout(&self.config_dir, file);
    }
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("konflikt"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("konflikt"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("konflikt")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_layout_returns_default_when_file_absent() {
        let dir = PathBuf::from("/nonexistent/path/that/cannot/exist");
        let file = load_layout(&dir);
        assert_eq!(file.version, LayoutFile::default().version);
        assert!(file.screens.is_empty());
    }

    #[test]
    fn load_layout_returns_default_on_corrupt_json() {
        let dir = tempdir();
        std::fs::write(layout_file_path(&dir), "{ not json").unwrap();
        let file = load_layout(&dir);
        assert!(file.screens.is_empty());
    }

    #[test]
    fn save_and_load_layout_round_trips() {
        let dir = tempdir();
        let mut manager = konflikt_core::LayoutManager::new();
        manager.set_server_screen("srv".into(), "Server".into(), "m0".into(), 1920, 1080);
        let file = manager.to_file();

        save_layout(&dir, &file);
        let loaded = load_layout(&dir);

        assert_eq!(loaded.screens.len(), 1);
        assert_eq!(loaded.screens[0].instance_id, "srv");
    }

    #[test]
    fn load_or_create_instance_id_persists_across_calls() {
        let dir = tempdir();
        let first = load_or_create_instance_id(&dir);
        let second = load_or_create_instance_id(&dir);
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn load_or_create_instance_id_regenerates_on_garbage_file() {
        let dir = tempdir();
        std::fs::write(instance_id_file_path(&dir), "not-a-uuid").unwrap();
        let id = load_or_create_instance_id(&dir);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("konflikt-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
