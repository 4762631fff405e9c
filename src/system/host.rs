// src/system/host.rs

//! # Host
//!
//! Every side effect the install steps have on the machine goes through the [`Host`]
//! trait: running programs, writing files, creating directories and links, and
//! querying the user database.
//!
//! A host carries an optional *identity*. Once set (after switching to a dedicated
//! user), programs started with [`Host::run`] are spawned as that user and files or
//! directories created with the plain methods are handed over to them. The
//! `_elevated` variants always act with the privileges of the invoking user,
//! going through `sudo` when that user is not root.

use crate::system::console;
use crate::system::executor::{self, CommandLine, ExecutionError};
use crate::system::identity::{self, Identity, IdentityError};
use nix::unistd::chown;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Child;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum HostError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("Filesystem operation on '{path}' failed: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not change the owner of '{path}': {source}")]
    Ownership {
        path: String,
        #[source]
        source: nix::Error,
    },
    #[error("Could not walk '{path}': {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
}

impl HostError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Whether the error is a program that ran and reported failure.
    pub fn is_non_zero_exit(&self) -> bool {
        matches!(
            self,
            Self::Execution(ExecutionError::NonZeroExitStatus { .. })
        )
    }
}

/// A process running in the background until killed.
pub trait BackgroundProcess {
    fn kill(&mut self) -> Result<(), HostError>;
}

pub trait Host {
    fn is_root(&self) -> bool;
    fn identity(&self) -> Option<&Identity>;
    fn set_identity(&mut self, identity: Option<Identity>);
    fn lookup_user(&self, name: &str) -> Result<Option<Identity>, HostError>;
    /// The account the tool was started as.
    fn invoking_user(&self) -> Result<Identity, HostError>;
    fn hostname(&self) -> Result<String, HostError>;

    fn run(&self, command: &CommandLine) -> Result<(), HostError>;
    fn run_elevated(&self, command: &CommandLine) -> Result<(), HostError>;
    fn capture(&self, command: &CommandLine) -> Result<String, HostError>;
    fn spawn(&self, command: &CommandLine) -> Result<Box<dyn BackgroundProcess>, HostError>;

    fn exists(&self, path: &Path) -> bool;
    /// Reads a text file. `Ok(None)` if it does not exist.
    fn read_file(&self, path: &Path) -> Result<Option<String>, HostError>;
    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), HostError>;
    fn write_file_elevated(&self, path: &Path, contents: &[u8]) -> Result<(), HostError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), HostError>;
    fn remove_dir_all(&self, path: &Path) -> Result<(), HostError>;
    fn set_mode(&self, path: &Path, mode: u32) -> Result<(), HostError>;
    fn symlink(&self, target: &Path, link: &Path) -> Result<(), HostError>;
    /// Gives the current identity ownership of a whole tree.
    fn hand_over(&self, path: &Path) -> Result<(), HostError>;
}

// --- The real machine ---

#[derive(Debug, Default)]
pub struct SystemHost {
    identity: Option<Identity>,
}

impl SystemHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn give_to_identity(&self, path: &Path) -> Result<(), HostError> {
        let Some(identity) = &self.identity else {
            return Ok(());
        };
        if !identity::is_root() {
            return Ok(());
        }
        chown(path, Some(identity.uid()), Some(identity.gid())).map_err(|e| {
            HostError::Ownership {
                path: path.display().to_string(),
                source: e,
            }
        })
    }
}

struct ChildProcess(Child);

impl BackgroundProcess for ChildProcess {
    fn kill(&mut self) -> Result<(), HostError> {
        let pid = self.0.id();
        log::debug!("Killing background process {}.", pid);
        match self.0.kill() {
            Ok(()) => {}
            // Already exited.
            Err(e) if e.kind() == ErrorKind::InvalidInput => {}
            Err(e) => {
                return Err(HostError::Execution(ExecutionError::CommandFailed(
                    format!("kill {}", pid),
                    e,
                )));
            }
        }
        self.0
            .wait()
            .map(|_| ())
            .map_err(|e| HostError::Execution(ExecutionError::CommandFailed(format!("wait {}", pid), e)))
    }
}

impl Host for SystemHost {
    fn is_root(&self) -> bool {
        identity::is_root()
    }

    fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    fn set_identity(&mut self, identity: Option<Identity>) {
        self.identity = identity;
    }

    fn lookup_user(&self, name: &str) -> Result<Option<Identity>, HostError> {
        Ok(identity::lookup(name)?)
    }

    fn invoking_user(&self) -> Result<Identity, HostError> {
        Ok(identity::current()?)
    }

    fn hostname(&self) -> Result<String, HostError> {
        Ok(identity::hostname()?)
    }

    fn run(&self, command: &CommandLine) -> Result<(), HostError> {
        console::command(command);
        Ok(executor::execute_command(command, self.identity.as_ref())?)
    }

    fn run_elevated(&self, command: &CommandLine) -> Result<(), HostError> {
        let command = if self.is_root() {
            command.clone()
        } else {
            command.prefixed("sudo")
        };
        console::command(&command);
        Ok(executor::execute_command(&command, None)?)
    }

    fn capture(&self, command: &CommandLine) -> Result<String, HostError> {
        Ok(executor::execute_and_capture_output(
            command,
            self.identity.as_ref(),
        )?)
    }

    fn spawn(&self, command: &CommandLine) -> Result<Box<dyn BackgroundProcess>, HostError> {
        console::command(command);
        let child = executor::spawn_command(command, self.identity.as_ref())?;
        Ok(Box::new(ChildProcess(child)))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_file(&self, path: &Path) -> Result<Option<String>, HostError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HostError::io(path, e)),
        }
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), HostError> {
        fs::write(path, contents).map_err(|e| HostError::io(path, e))?;
        self.give_to_identity(path)
    }

    fn write_file_elevated(&self, path: &Path, contents: &[u8]) -> Result<(), HostError> {
        if self.is_root() {
            return fs::write(path, contents).map_err(|e| HostError::io(path, e));
        }
        let staging = tempfile::NamedTempFile::new().map_err(|e| HostError::io(path, e))?;
        fs::write(staging.path(), contents).map_err(|e| HostError::io(staging.path(), e))?;
        self.run_elevated(
            &CommandLine::new("cp")
                .arg(staging.path().display().to_string())
                .arg(path.display().to_string()),
        )
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), HostError> {
        let missing: Vec<PathBuf> = path
            .ancestors()
            .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
            .map(Path::to_path_buf)
            .collect();
        fs::create_dir_all(path).map_err(|e| HostError::io(path, e))?;
        for dir in missing.iter().rev() {
            self.give_to_identity(dir)?;
        }
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<(), HostError> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HostError::io(path, e)),
        }
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<(), HostError> {
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| HostError::io(path, e))
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<(), HostError> {
        std::os::unix::fs::symlink(target, link).map_err(|e| HostError::io(link, e))
    }

    fn hand_over(&self, path: &Path) -> Result<(), HostError> {
        if self.identity.is_none() || !identity::is_root() {
            return Ok(());
        }
        for entry in WalkDir::new(path).follow_links(false) {
            let entry = entry.map_err(|e| HostError::Walk {
                path: path.display().to_string(),
                source: e,
            })?;
            if entry.path_is_symlink() {
                continue;
            }
            self.give_to_identity(entry.path())?;
        }
        Ok(())
    }
}

/// An in-memory stand-in for the machine, used by unit tests.
///
/// Commands are recorded instead of run (elevated ones with a `sudo ` prefix) and
/// `capture` answers from a scripted table. Elevated writes are kept in memory, since
/// they usually target system locations; every other filesystem operation is real,
/// so tests point those paths at a temporary directory.
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::rc::Rc;

    #[derive(Debug, Default)]
    pub struct RecordingHost {
        pub root: bool,
        pub identity: Option<Identity>,
        pub users: HashMap<String, Identity>,
        pub hostname: String,
        /// Output for `capture`, keyed by the rendered command line.
        pub outputs: HashMap<String, String>,
        /// Paths reported as existing even though they are not on disk.
        pub present: HashSet<PathBuf>,
        /// Commands whose execution fails, keyed by the rendered command line.
        pub failing: HashSet<String>,
        pub commands: Rc<RefCell<Vec<String>>>,
        pub killed: Rc<RefCell<Vec<String>>>,
        pub elevated_files: Rc<RefCell<BTreeMap<PathBuf, String>>>,
    }

    impl RecordingHost {
        pub fn new() -> Self {
            Self {
                hostname: "testhost".to_string(),
                ..Self::default()
            }
        }

        pub fn with_user(mut self, name: &str, uid: u32) -> Self {
            self.users.insert(
                name.to_string(),
                Identity {
                    name: name.to_string(),
                    uid,
                    gid: uid,
                    home: PathBuf::from("/home").join(name),
                },
            );
            self
        }

        pub fn with_output(mut self, command: &str, output: &str) -> Self {
            self.outputs.insert(command.to_string(), output.to_string());
            self
        }

        pub fn commands(&self) -> Vec<String> {
            self.commands.borrow().clone()
        }

        pub fn clear_commands(&self) {
            self.commands.borrow_mut().clear();
        }

        /// Contents written to `path` with elevated privileges.
        pub fn elevated_file(&self, path: &Path) -> Option<String> {
            self.elevated_files.borrow().get(path).cloned()
        }

        fn record(&self, line: String) -> Result<(), HostError> {
            let failing = self.failing.contains(&line);
            self.commands.borrow_mut().push(line.clone());
            if failing {
                return Err(HostError::Execution(ExecutionError::NonZeroExitStatus {
                    command: line,
                    status: "exit status: 1".to_string(),
                }));
            }
            Ok(())
        }
    }

    struct RecordedProcess {
        line: String,
        killed: Rc<RefCell<Vec<String>>>,
    }

    impl BackgroundProcess for RecordedProcess {
        fn kill(&mut self) -> Result<(), HostError> {
            self.killed.borrow_mut().push(self.line.clone());
            Ok(())
        }
    }

    fn write_creating_parents(path: &Path, contents: &[u8]) -> Result<(), HostError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| HostError::io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| HostError::io(path, e))
    }

    impl Host for RecordingHost {
        fn is_root(&self) -> bool {
            self.root
        }

        fn identity(&self) -> Option<&Identity> {
            self.identity.as_ref()
        }

        fn set_identity(&mut self, identity: Option<Identity>) {
            self.identity = identity;
        }

        fn lookup_user(&self, name: &str) -> Result<Option<Identity>, HostError> {
            Ok(self.users.get(name).cloned())
        }

        fn invoking_user(&self) -> Result<Identity, HostError> {
            Ok(Identity {
                name: "tester".to_string(),
                uid: 1000,
                gid: 1000,
                home: PathBuf::from("/home/tester"),
            })
        }

        fn hostname(&self) -> Result<String, HostError> {
            Ok(self.hostname.clone())
        }

        fn run(&self, command: &CommandLine) -> Result<(), HostError> {
            self.record(command.to_string())
        }

        fn run_elevated(&self, command: &CommandLine) -> Result<(), HostError> {
            self.record(format!("sudo {}", command))
        }

        fn capture(&self, command: &CommandLine) -> Result<String, HostError> {
            let line = command.to_string();
            self.commands.borrow_mut().push(line.clone());
            self.outputs.get(&line).cloned().ok_or_else(|| {
                HostError::Execution(ExecutionError::NonZeroExitStatus {
                    command: line,
                    status: "exit status: 1".to_string(),
                })
            })
        }

        fn spawn(&self, command: &CommandLine) -> Result<Box<dyn BackgroundProcess>, HostError> {
            let line = command.to_string();
            self.record(format!("spawn {}", line))?;
            Ok(Box::new(RecordedProcess {
                line,
                killed: Rc::clone(&self.killed),
            }))
        }

        fn exists(&self, path: &Path) -> bool {
            self.present.contains(path)
                || self.elevated_files.borrow().contains_key(path)
                || path.exists()
        }

        fn read_file(&self, path: &Path) -> Result<Option<String>, HostError> {
            if let Some(content) = self.elevated_file(path) {
                return Ok(Some(content));
            }
            match fs::read_to_string(path) {
                Ok(content) => Ok(Some(content)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(HostError::io(path, e)),
            }
        }

        fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), HostError> {
            write_creating_parents(path, contents)
        }

        fn write_file_elevated(&self, path: &Path, contents: &[u8]) -> Result<(), HostError> {
            self.elevated_files.borrow_mut().insert(
                path.to_path_buf(),
                String::from_utf8_lossy(contents).into_owned(),
            );
            Ok(())
        }

        fn create_dir_all(&self, path: &Path) -> Result<(), HostError> {
            fs::create_dir_all(path).map_err(|e| HostError::io(path, e))
        }

        fn remove_dir_all(&self, path: &Path) -> Result<(), HostError> {
            match fs::remove_dir_all(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(HostError::io(path, e)),
            }
        }

        fn set_mode(&self, path: &Path, mode: u32) -> Result<(), HostError> {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))
                .map_err(|e| HostError::io(path, e))
        }

        fn symlink(&self, target: &Path, link: &Path) -> Result<(), HostError> {
            std::os::unix::fs::symlink(target, link).map_err(|e| HostError::io(link, e))
        }

        fn hand_over(&self, path: &Path) -> Result<(), HostError> {
            self.record(format!("hand_over {}", path.display()))
        }
    }
}
