//! # Config Loader
//!
//! Loads the optional user defaults file (`~/.config/woostproject/defaults.toml`).
//! The file is a flat table mapping setting names to strings, integers, booleans or
//! arrays of strings; it sits between the compiled-in defaults and the command line.
//!
//! ```toml
//! workspace = "/home/dev/projects"
//! admin_email = "dev@example.com"
//! languages = ["en", "es"]
//! ```
use crate::core::{
    namespace::{Overrides, Value},
    paths,
};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not parse '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Setting '{key}' in '{path}' must be a string, integer, boolean or array of strings.")]
    UnsupportedValue { path: String, key: String },
    #[error(transparent)]
    Path(#[from] paths::PathError),
}

/// Loads the user defaults file, returning no overrides if it does not exist.
pub fn load_user_defaults() -> Result<Overrides, ConfigError> {
    let path = paths::user_defaults_file()?;
    load_defaults_file(&path)
}

pub fn load_defaults_file(path: &Path) -> Result<Overrides, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("No user defaults at '{}'.", path.display());
            return Ok(Overrides::new());
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            });
        }
    };
    log::debug!("Loading user defaults from '{}'.", path.display());
    parse_defaults(&content, path)
}

fn parse_defaults(content: &str, path: &Path) -> Result<Overrides, ConfigError> {
    let table: toml::Table = toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut overrides = Overrides::new();
    for (key, raw) in table {
        let unsupported = || ConfigError::UnsupportedValue {
            path: path.display().to_string(),
            key: key.clone(),
        };
        let value = match raw {
            toml::Value::String(s) => Value::Str(s),
            toml::Value::Integer(i) => Value::Int(i),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Array(items) => Value::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        toml::Value::String(s) => Ok(s),
                        _ => Err(unsupported()),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            _ => return Err(unsupported()),
        };
        overrides.insert(key, value);
    }
    Ok(overrides)
}
