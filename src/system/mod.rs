//! # System Interaction Layer
//!
//! Abstractions over the operating system. Install steps never touch the machine
//! directly; they go through a [`host::Host`].
//!
//! ## Modules
//!
//! - **`executor`**: `CommandLine` and blocking process execution, optionally as another
//!   OS account.
//! - **`identity`**: user database lookups (`Identity`), root detection and host name.
//! - **`host`**: the `Host` trait and its real implementation, `SystemHost`.
//! - **`ops`**: privileged helpers built on a host: apt packages, pip, apache modules,
//!   init services, cron jobs and the host-wide configuration directory.
//! - **`console`**: styled progress output.

pub mod console;
pub mod executor;
pub mod host;
pub mod identity;
pub mod ops;
