// src/core/ports.rs

//! Persistent allocation of TCP ports.
//!
//! The registry is a plain text file with one `<key> <port>` line per entry. It is
//! shared by every installation on the host, so a key is usually the installation
//! alias plus a role (`mysite-web`, `mysite-db`, `mysite-cache`).

use crate::constants::FIRST_AUTOMATIC_PORT;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortError {
    #[error("Could not read the port registry at '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not write the port registry at '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed entry on line {line} of the port registry at '{path}': '{content}'")]
    Malformed {
        path: String,
        line: usize,
        content: String,
    },
    #[error("No free port left after {0}.")]
    Exhausted(u16),
}

#[derive(Debug, Clone)]
pub struct PortRegistry {
    path: PathBuf,
}

impl PortRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every entry in file order. A missing file is an empty registry.
    pub fn entries(&self) -> Result<Vec<(String, u16)>, PortError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PortError::Read {
                    path: self.path.display().to_string(),
                    source: e,
                });
            }
        };

        let mut entries = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let malformed = || PortError::Malformed {
                path: self.path.display().to_string(),
                line: index + 1,
                content: line.to_string(),
            };
            let mut parts = line.split_whitespace();
            let (Some(key), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(malformed());
            };
            let port: u16 = port.parse().map_err(|_| malformed())?;
            entries.push((key.to_string(), port));
        }
        Ok(entries)
    }

    /// Returns the port stored for `key`, registering a new one if there is none.
    ///
    /// New ports default to one past the last registered port (or past
    /// [`FIRST_AUTOMATIC_PORT`] in an empty registry), skipping values already
    /// taken. An explicit `port` is registered as given.
    pub fn acquire(&self, key: &str, port: Option<u16>) -> Result<u16, PortError> {
        let entries = self.entries()?;

        if let Some((_, existing)) = entries.iter().find(|(k, _)| k == key) {
            log::debug!("Port for '{}' already registered: {}", key, existing);
            return Ok(*existing);
        }

        let port = match port {
            Some(port) => port,
            None => {
                let taken: HashSet<u16> = entries.iter().map(|(_, p)| *p).collect();
                let last = entries.last().map_or(FIRST_AUTOMATIC_PORT, |(_, p)| *p);
                let mut candidate = last.checked_add(1).ok_or(PortError::Exhausted(last))?;
                while taken.contains(&candidate) {
                    candidate = candidate
                        .checked_add(1)
                        .ok_or(PortError::Exhausted(candidate))?;
                }
                candidate
            }
        };

        let write_error = |e| PortError::Write {
            path: self.path.display().to_string(),
            source: e,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_error)?;
        writeln!(file, "{} {}", key, port).map_err(write_error)?;

        log::debug!("Registered port {} for '{}'.", port, key);
        Ok(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_first_port_follows_baseline() {
        let dir = tempdir().unwrap();
        let registry = PortRegistry::new(dir.path().join("ports"));
        assert_eq!(registry.acquire("site-web", None).unwrap(), FIRST_AUTOMATIC_PORT + 1);
        assert_eq!(
            fs::read_to_string(registry.path()).unwrap(),
            format!("site-web {}\n", FIRST_AUTOMATIC_PORT + 1)
        );
    }

    #[test]
    fn test_acquire_is_stable_and_unique() {
        let dir = tempdir().unwrap();
        let registry = PortRegistry::new(dir.path().join("ports"));

        let web = registry.acquire("site-web", None).unwrap();
        let db = registry.acquire("site-db", None).unwrap();
        assert_eq!(registry.acquire("site-web", None).unwrap(), web);
        assert_eq!(registry.acquire("site-db", Some(9999)).unwrap(), db);
        assert_ne!(web, db);

        let other = registry.acquire("other-web", None).unwrap();
        assert!(other != web && other != db);
        assert_eq!(registry.entries().unwrap().len(), 3);
    }

    #[test]
    fn test_explicit_port_and_collision_skipping() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ports");
        fs::write(&path, "a 15001\nb 15000\n").unwrap();
        let registry = PortRegistry::new(&path);

        // One past the last entry is already taken by `a`.
        assert_eq!(registry.acquire("c", None).unwrap(), 15002);
        assert_eq!(registry.acquire("d", Some(8080)).unwrap(), 8080);
        assert_eq!(registry.acquire("e", None).unwrap(), 8081);
    }

    #[test]
    fn test_malformed_registry_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ports");
        fs::write(&path, "a 15001\nbroken\n").unwrap();
        let err = PortRegistry::new(&path).acquire("x", None).unwrap_err();
        assert!(matches!(err, PortError::Malformed { line: 2, .. }));
    }
}
