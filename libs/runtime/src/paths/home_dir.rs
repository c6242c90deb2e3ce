use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomeDirError {
    #[error("cannot determine the user home directory")]
    NoHomeDir,

    #[error("failed to create home directory '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to resolve current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// Base directory for the client home: roaming app data on Windows, the user
/// home elsewhere (falls back to the passwd entry when `$HOME` is unset).
fn platform_home() -> Result<PathBuf, HomeDirError> {
    let base = if cfg!(target_os = "windows") {
        dirs::config_dir()
    } else {
        dirs::home_dir()
    };
    base.ok_or(HomeDirError::NoHomeDir)
}

/// Expand a leading `~` into the platform home directory.
fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    if raw == "~" {
        return platform_home();
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return Ok(platform_home()?.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Resolve the client home directory into an absolute path.
///
/// - `None` resolves to `<platform home>/<default_subdir>`
///   (user home on Unix/macOS, `%APPDATA%` on Windows).
/// - A leading `~` is expanded; relative paths are anchored at the current directory.
/// - With `create`, the directory is created when missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let mut path = match configured {
        Some(raw) => expand_tilde(raw.trim())?,
        None => platform_home()?.join(default_subdir),
    };

    if path.is_relative() {
        path = env::current_dir()
            .map_err(HomeDirError::CurrentDir)?
            .join(path);
    }

    if create {
        ensure_dir(&path)?;
    }

    Ok(path)
}

fn ensure_dir(path: &Path) -> Result<(), HomeDirError> {
    std::fs::create_dir_all(path).map_err(|source| HomeDirError::Create {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absolute_path_is_kept_and_created() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("nested").join("home");

        let resolved =
            resolve_home_dir(Some(target.to_string_lossy().to_string()), ".obras", true).unwrap();

        assert_eq!(resolved, target);
        assert!(resolved.is_dir());
    }

    #[test]
    fn relative_path_is_anchored_at_cwd() {
        let resolved = resolve_home_dir(Some("some/relative".into()), ".obras", false).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some/relative"));
    }

    #[test]
    fn default_and_tilde_resolve_under_platform_home() {
        let base = platform_home().unwrap();

        let default = resolve_home_dir(None, ".obras", false).unwrap();
        assert_eq!(default, base.join(".obras"));

        let tilde = resolve_home_dir(Some("~/.obras-dev".into()), ".obras", false).unwrap();
        assert_eq!(tilde, base.join(".obras-dev"));
    }

    #[test]
    fn create_false_does_not_touch_disk() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("never-created");

        let resolved =
            resolve_home_dir(Some(target.to_string_lossy().to_string()), ".obras", false).unwrap();

        assert!(!resolved.exists());
    }
}
