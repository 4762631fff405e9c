// src/core/skeleton.rs

//! Copies a project skeleton, expanding template tokens in both the names and the
//! contents of what it copies. Compiled python files are left behind.

use crate::core::template::TemplateError;
use crate::system::host::{Host, HostError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SkeletonError {
    #[error("Could not walk the skeleton at '{path}': {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
    #[error("Could not read skeleton file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Host(#[from] HostError),
}

const SKIPPED_EXTENSION: &str = "pyc";

/// Copies `source` into `target` and returns the number of files written.
/// Existing files in `target` are overwritten; existing directories are reused.
pub fn copy_skeleton<P>(
    host: &dyn Host,
    source: &Path,
    target: &Path,
    processor: P,
) -> Result<usize, SkeletonError>
where
    P: Fn(&str) -> Result<String, TemplateError>,
{
    host.create_dir_all(target)?;
    let mut written = 0;

    for entry in WalkDir::new(source)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| SkeletonError::Walk {
            path: source.display().to_string(),
            source: e,
        })?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());

        let mut destination = PathBuf::from(target);
        for component in relative.components() {
            destination.push(processor(&component.as_os_str().to_string_lossy())?);
        }

        if entry.file_type().is_dir() {
            host.create_dir_all(&destination)?;
            continue;
        }

        if entry.path().extension().is_some_and(|ext| ext == SKIPPED_EXTENSION) {
            log::debug!("Skipping compiled file '{}'.", entry.path().display());
            continue;
        }

        let contents = fs::read_to_string(entry.path()).map_err(|e| SkeletonError::Read {
            path: entry.path().display().to_string(),
            source: e,
        })?;
        host.write_file(&destination, processor(&contents)?.as_bytes())?;
        written += 1;
    }

    log::debug!(
        "Copied {} skeleton files from '{}' to '{}'.",
        written,
        source.display(),
        target.display()
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::Namespace;
    use crate::core::template::expand_vars;
    use crate::system::host::testing::RecordingHost;
    use tempfile::tempdir;

    #[test]
    fn test_copy_expands_names_and_contents() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("skeleton");
        fs::create_dir_all(source.join("scripts")).unwrap();
        fs::create_dir_all(source.join("views").join("--SETUP-FLAT_WEBSITE_NAME--")).unwrap();
        fs::write(source.join("scripts").join("run.py"), "PORT = --SETUP-PORT--\n").unwrap();
        fs::write(source.join("scripts").join("run.pyc"), "compiled").unwrap();
        fs::write(
            source.join("views").join("--SETUP-FLAT_WEBSITE_NAME--").join("__init__.py"),
            "# --SETUP-FLAT_WEBSITE_NAME-- views\n",
        )
        .unwrap();

        let mut ns = Namespace::with_defaults();
        ns.set("port", 14001_i64);
        ns.set("flat_website_name", "my_site");

        let target = dir.path().join("project");
        let host = RecordingHost::new();
        let written = copy_skeleton(&host, &source, &target, |text| expand_vars(text, &ns)).unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            fs::read_to_string(target.join("scripts").join("run.py")).unwrap(),
            "PORT = 14001\n"
        );
        assert!(!target.join("scripts").join("run.pyc").exists());
        assert_eq!(
            fs::read_to_string(target.join("views").join("my_site").join("__init__.py")).unwrap(),
            "# my_site views\n"
        );
    }

    #[test]
    fn test_undefined_token_aborts_copy() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("skeleton");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("settings.py"), "--SETUP-NOT_A_SETTING--").unwrap();

        let ns = Namespace::with_defaults();
        let host = RecordingHost::new();
        let result = copy_skeleton(&host, &source, &dir.path().join("out"), |text| {
            expand_vars(text, &ns)
        });
        assert!(matches!(result, Err(SkeletonError::Template(_))));
    }
}
