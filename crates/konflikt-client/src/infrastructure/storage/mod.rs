//! JSON-based persistence for the per-machine instance identifier, under
//! the platform-appropriate config directory. Mirrors
//! `konflikt-server`'s `storage::config`, minus the layout file — the
//! client has no layout of its own to persist — only the server persists
//! its view of the client entries.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,
}

/// Resolves the directory holding `instance-id`: the caller's
/// `--config-dir` override if given, otherwise the platform config
/// directory with a `konflikt` subdirectory.
pub fn resolve_config_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(dir) => Ok(dir),
        None => platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir),
    }
}

fn instance_id_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join("instance-id")
}

/// Loads the stable per-user-per-machine instance id, generating and
/// persisting a fresh UUID on first run. A failure to persist a freshly
/// generated id is logged but does not stop the process from using it for
/// this run.
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
        dir.push(format!("konflikt-client-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
