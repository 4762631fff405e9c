// src/system/executor.rs

use crate::system::identity::Identity;
use std::fmt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Command '{command}' exited with a non-zero status ({status}).")]
    NonZeroExitStatus { command: String, status: String },
    #[error("Command '{command}' produced output that was not valid UTF-8")]
    InvalidUtf8Output {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// A program invocation: the program, its arguments and an optional working directory.
///
/// Shell command lines (pipes, redirections) are expressed with [`CommandLine::shell`],
/// which runs the script through `/bin/sh -c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("/bin/sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dunce::simplified(dir.as_ref()).to_path_buf());
        self
    }

    /// Returns the same invocation prefixed by another program (e.g. `sudo`).
    pub fn prefixed(&self, program: &str) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program.clone());
        args.extend(self.args.iter().cloned());
        Self {
            program: program.to_string(),
            args,
            cwd: self.cwd.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn to_std(&self, identity: Option<&Identity>) -> Result<StdCommand, ExecutionError> {
        if self.program.trim().is_empty() {
            return Err(ExecutionError::EmptyCommand);
        }
        let mut command = StdCommand::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        if let Some(identity) = identity {
            command
                .uid(identity.uid)
                .gid(identity.gid)
                .env("USER", &identity.name)
                .env("LOGNAME", &identity.name)
                .env("HOME", &identity.home);
        }
        Ok(command)
    }
}

/// Quoted, copy-pasteable rendering of the command.
impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted = std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| {
                shlex::try_quote(part)
                    .map(|q| q.into_owned())
                    .unwrap_or_else(|_| part.clone())
            })
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&quoted)
    }
}

/// Runs a command to completion, inheriting stdout and stderr.
///
/// When `identity` is given the process is spawned with that user's uid, gid,
/// `USER` and `HOME`.
pub fn execute_command(
    command: &CommandLine,
    identity: Option<&Identity>,
) -> Result<(), ExecutionError> {
    let rendered = command.to_string();
    log::debug!("Executing: {}", rendered);

    let status = command
        .to_std(identity)?
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| ExecutionError::CommandFailed(rendered.clone(), e))?;

    if !status.success() {
        return Err(ExecutionError::NonZeroExitStatus {
            command: rendered,
            status: status.to_string(),
        });
    }
    Ok(())
}

/// Executes a command and captures its standard output.
/// Stderr is passed through to the user's terminal.
pub fn execute_and_capture_output(
    command: &CommandLine,
    identity: Option<&Identity>,
) -> Result<String, ExecutionError> {
    let rendered = command.to_string();
    log::debug!("Capturing: {}", rendered);

    let output = command
        .to_std(identity)?
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|e| ExecutionError::CommandFailed(rendered.clone(), e))?;

    if !output.status.success() {
        return Err(ExecutionError::NonZeroExitStatus {
            command: rendered,
            status: output.status.to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|e| ExecutionError::InvalidUtf8Output {
        command: rendered,
        source: e,
    })
}

/// Starts a command without waiting for it.
pub fn spawn_command(
    command: &CommandLine,
    identity: Option<&Identity>,
) -> Result<Child, ExecutionError> {
    let rendered = command.to_string();
    log::debug!("Spawning: {}", rendered);

    command
        .to_std(identity)?
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| ExecutionError::CommandFailed(rendered, e))
}
