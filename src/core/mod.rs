//! # Core Logic
//!
//! Everything that decides *what* an installation looks like, independent of how
//! side effects reach the machine.
//!
//! ## Modules
//!
//! - **`namespace`**: the settings record (`Namespace`, `Value`) and its `DEFAULTS`.
//! - **`presets`**: development / production values for settings left unset.
//! - **`derivation`**: `HostFacts` and the ordered pass that fills the remaining settings.
//! - **`template`** / **`templates`**: the `--SETUP-KEY--` expander and every artifact text.
//! - **`pipeline`**: the preliminary / main / cleanup task scheduler.
//! - **`features`**: optional host capabilities with version markers.
//! - **`ports`**: the flat-file port allocator.
//! - **`skeleton`**: templated directory copy.
//! - **`bundle`**: self-extracting installers.
//! - **`config_loader`** / **`paths`**: user defaults file and well-known locations.

pub mod bundle;
pub mod config_loader;
pub mod derivation;
pub mod features;
pub mod namespace;
pub mod paths;
pub mod pipeline;
pub mod ports;
pub mod presets;
pub mod skeleton;
pub mod template;
pub mod templates;
