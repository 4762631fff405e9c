// src/core/paths.rs

use crate::constants::{
    CONFIG_DIR_ENV_VAR, FEATURES_DIRNAME, PORTS_FILENAME, SYSTEM_CONFIG_DIR, USER_CONFIG_DIRNAME,
    USER_DEFAULTS_FILENAME,
};
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

lazy_static! {
    static ref USER_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find the user configuration directory.")]
    ConfigDirNotFound,
    #[error("Could not find the home directory of the current user.")]
    HomeDirNotFound,
}

/// Returns the host-wide configuration directory (`/etc/woost` unless overridden
/// through `WOOSTPROJECT_CONFIG_DIR`).
pub fn system_config_dir() -> PathBuf {
    match std::env::var_os(CONFIG_DIR_ENV_VAR) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(SYSTEM_CONFIG_DIR),
    }
}

pub fn ports_file(config_dir: &Path) -> PathBuf {
    config_dir.join(PORTS_FILENAME)
}

pub fn features_dir(config_dir: &Path) -> PathBuf {
    config_dir.join(FEATURES_DIRNAME)
}

/// The file holding the installed version of a feature.
pub fn feature_marker(config_dir: &Path, feature_id: &str) -> PathBuf {
    features_dir(config_dir).join(feature_id)
}

/// Returns the per-user configuration directory (`~/.config/woostproject`).
///
/// Memoized: the platform lookup only happens on the first call.
pub fn user_config_dir() -> Result<PathBuf, PathError> {
    let mut cached = USER_CONFIG_DIR
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(path) = &*cached {
        return Ok(path.clone());
    }

    let path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join(USER_CONFIG_DIRNAME);
    *cached = Some(path.clone());
    Ok(path)
}

/// Returns the path of the user defaults file. The file itself is optional.
pub fn user_defaults_file() -> Result<PathBuf, PathError> {
    user_config_dir().map(|dir| dir.join(USER_DEFAULTS_FILENAME))
}

/// Expands a leading `~` to the current user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf, PathError> {
    if path == "~" || path.starts_with("~/") {
        let home = dirs::home_dir().ok_or(PathError::HomeDirNotFound)?;
        let expanded = shellexpand::tilde_with_context(path, || Some(home.display().to_string()));
        return Ok(PathBuf::from(expanded.into_owned()));
    }
    Ok(PathBuf::from(path))
}

/// Lexically simplifies a path for display and comparison.
pub fn clean(path: &Path) -> PathBuf {
    dunce::simplified(path).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_layout() {
        let dir = Path::new("/etc/woost");
        assert_eq!(ports_file(dir), PathBuf::from("/etc/woost/ports"));
        assert_eq!(
            feature_marker(dir, "apache"),
            PathBuf::from("/etc/woost/features/apache")
        );
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home("~/.woost-ports").unwrap(), home.join(".woost-ports"));
        assert_eq!(expand_home("~").unwrap(), home);
        assert_eq!(expand_home("/tmp/x").unwrap(), PathBuf::from("/tmp/x"));
        assert_eq!(expand_home("~other/x").unwrap(), PathBuf::from("~other/x"));
    }

    #[test]
    fn test_user_defaults_file_is_inside_user_config_dir() {
        let file = user_defaults_file().unwrap();
        assert!(file.ends_with("woostproject/defaults.toml"));
        assert_eq!(file.parent().unwrap(), user_config_dir().unwrap());
    }
}
