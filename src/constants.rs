// src/constants.rs

/// The system-wide configuration directory shared by every installation on the host.
pub const SYSTEM_CONFIG_DIR: &str = "/etc/woost";

/// Environment variable that overrides [`SYSTEM_CONFIG_DIR`].
pub const CONFIG_DIR_ENV_VAR: &str = "WOOSTPROJECT_CONFIG_DIR";

/// The name of the port registry file (inside the system config dir).
pub const PORTS_FILENAME: &str = "ports";

/// The name of the directory holding one version marker per feature (inside the system config dir).
pub const FEATURES_DIRNAME: &str = "features";

/// Location of the port registry used by older releases, migrated on first run.
pub const LEGACY_PORTS_FILE: &str = "~/.woost-ports";

/// Ports are handed out incrementally starting right after this value.
pub const FIRST_AUTOMATIC_PORT: u16 = 14000;

/// The name of the user configuration directory (inside the platform config dir).
pub const USER_CONFIG_DIRNAME: &str = "woostproject";

/// The name of the user defaults file (inside the user configuration directory).
pub const USER_DEFAULTS_FILENAME: &str = "defaults.toml";

// --- Environment variables consulted during derivation ---

pub const WORKSPACE_ENV_VAR: &str = "WORKSPACE";
pub const ROOT_HOST_ENV_VAR: &str = "WOOST_ROOT_HOST";
pub const INSTALLATION_ID_ENV_VAR: &str = "WOOST_INSTALLATION_ID";

// --- Bundles ---

/// Raw bytes encoded per base64 chunk. Must be a multiple of 3.
pub const ENCODE_CHUNK_SIZE: usize = 8190;

/// Base64 characters decoded per chunk. Must be a multiple of 4.
pub const DECODE_CHUNK_SIZE: usize = 10920;

/// Trailing marker identifying an executable that carries an embedded project.
pub const BUNDLE_MAGIC: &[u8; 8] = b"WOOSTBDL";

/// Prefix of the temporary directory a bundle is extracted into.
pub const BUNDLE_TEMP_DIR_PREFIX: &str = "woostproject-bundle";
