// src/system/identity.rs

use nix::unistd::{Gid, Uid, User, geteuid};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Could not query the user database for '{name}': {source}")]
    Lookup {
        name: String,
        #[source]
        source: nix::Error,
    },
    #[error("The current user (uid {0}) has no entry in the user database.")]
    UnknownCurrentUser(u32),
    #[error("Could not determine the host name: {0}")]
    Hostname(#[source] nix::Error),
}

/// An OS account that commands can be run as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

impl Identity {
    fn from_user(user: User) -> Self {
        Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
        }
    }

    pub fn uid(&self) -> Uid {
        Uid::from_raw(self.uid)
    }

    pub fn gid(&self) -> Gid {
        Gid::from_raw(self.gid)
    }
}

/// Looks up an account by name. `Ok(None)` means the account does not exist.
pub fn lookup(name: &str) -> Result<Option<Identity>, IdentityError> {
    User::from_name(name)
        .map(|user| user.map(Identity::from_user))
        .map_err(|e| IdentityError::Lookup {
            name: name.to_string(),
            source: e,
        })
}

/// The account the process is running as.
pub fn current() -> Result<Identity, IdentityError> {
    let uid = geteuid();
    User::from_uid(uid)
        .map_err(|e| IdentityError::Lookup {
            name: uid.to_string(),
            source: e,
        })?
        .map(Identity::from_user)
        .ok_or(IdentityError::UnknownCurrentUser(uid.as_raw()))
}

pub fn is_root() -> bool {
    geteuid().is_root()
}

pub fn hostname() -> Result<String, IdentityError> {
    nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .map_err(IdentityError::Hostname)
}
