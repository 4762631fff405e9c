// src/core/namespace.rs

//! # Configuration Namespace
//!
//! A flat mapping of setting name to [`Value`]. Every command run builds a fresh
//! namespace from the immutable [`DEFAULTS`] table, overlays user defaults and
//! explicit values on top of it, and then lets presets and derivation fill in
//! whatever is still [`Value::Unset`].
//!
//! Templates read the namespace by name (see `core::template`), so the names used
//! here are part of the template contract: `--SETUP-ZEO_PORT--` reads `zeo_port`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NamespaceError {
    #[error("Setting '{key}' is not defined.")]
    Undefined { key: String },
    #[error("Setting '{key}' has not been resolved.")]
    Unresolved { key: String },
    #[error("Setting '{key}' should be {expected}, found {found}.")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Setting '{key}' has an invalid value: {message}")]
    InvalidValue { key: String, message: String },
}

pub type NamespaceResult<T> = Result<T, NamespaceError>;

/// The value of a single setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// Not set yet; presets or derivation may fill it in.
    Unset,
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl Value {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Str(_) => "a string",
            Self::Int(_) => "an integer",
            Self::Bool(_) => "a boolean",
            Self::List(_) => "a list",
        }
    }
}

/// How values are printed into generated artifacts. Most artifacts are Python
/// or shell sources, hence the Python-flavoured booleans and list literals.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("None"),
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::List(items) => {
                let quoted: Vec<String> = items.iter().map(|item| format!("{:?}", item)).collect();
                write!(f, "[{}]", quoted.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unset, Into::into)
    }
}

/// Explicitly supplied values (from the command line, a bundle, or a defaults file).
pub type Overrides = BTreeMap<String, Value>;

/// Shorthand used by the defaults table.
#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    Unset,
    Str(&'static str),
    Int(i64),
    Bool(bool),
    List(&'static [&'static str]),
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            Self::Unset => Value::Unset,
            Self::Str(s) => Value::Str(s.to_string()),
            Self::Int(i) => Value::Int(i),
            Self::Bool(b) => Value::Bool(b),
            Self::List(items) => Value::List(items.iter().map(|s| (*s).to_string()).collect()),
        }
    }
}

/// Default value of every user-facing setting. Settings that only derivation
/// produces are not listed here; they come into existence when derived.
pub static DEFAULTS: &[(&str, DefaultValue)] = &[
    // Project identity and location
    ("website", DefaultValue::Unset),
    ("environment", DefaultValue::Str("development")),
    ("alias", DefaultValue::Unset),
    ("package", DefaultValue::Unset),
    ("workspace", DefaultValue::Unset),
    ("root_host", DefaultValue::Unset),
    ("default_root_host", DefaultValue::Str("localhost")),
    ("installation_id", DefaultValue::Unset),
    ("dedicated_user", DefaultValue::Unset),
    ("dedicated_user_shell", DefaultValue::Str("/bin/bash")),
    ("useradd_script", DefaultValue::Str("/usr/sbin/useradd")),
    ("recreate_env", DefaultValue::Bool(false)),
    ("tasks", DefaultValue::Unset),
    ("skipped_tasks", DefaultValue::List(&[])),
    // Sources
    ("source_installation", DefaultValue::Unset),
    ("source_repository", DefaultValue::Unset),
    ("uploads_repository", DefaultValue::Unset),
    ("revision", DefaultValue::Unset),
    ("skip_database", DefaultValue::Bool(false)),
    ("skip_uploads", DefaultValue::Bool(false)),
    ("python_packages_url", DefaultValue::Str("https://woost.info/wheels")),
    ("woost_version", DefaultValue::Str("3.0.dev")),
    ("woost_release_number", DefaultValue::Unset),
    ("woost_dependency_specifier", DefaultValue::Unset),
    ("woost_repository", DefaultValue::Str("https://bitbucket.org/whads/woost")),
    ("cocktail_version", DefaultValue::Unset),
    ("cocktail_repository", DefaultValue::Str("https://bitbucket.org/whads/cocktail")),
    ("extensions", DefaultValue::List(&[])),
    (
        "default_extensions_repository",
        DefaultValue::Str("https://bitbucket.org/whads/woost.extensions.{name}"),
    ),
    // CMS
    ("languages", DefaultValue::List(&["en"])),
    ("admin_email", DefaultValue::Str("admin@localhost")),
    ("admin_password", DefaultValue::Unset),
    ("base_id", DefaultValue::Unset),
    // Directories
    ("root_dir", DefaultValue::Unset),
    ("virtual_env_dir", DefaultValue::Unset),
    ("project_env_script", DefaultValue::Unset),
    ("cocktail_outer_dir", DefaultValue::Unset),
    ("cocktail_dir", DefaultValue::Unset),
    ("woost_outer_dir", DefaultValue::Unset),
    ("woost_dir", DefaultValue::Unset),
    ("project_outer_dir", DefaultValue::Unset),
    ("project_dir", DefaultValue::Unset),
    ("project_scripts_dir", DefaultValue::Unset),
    ("static_dir", DefaultValue::Unset),
    ("launcher_dir", DefaultValue::Unset),
    ("python_bin", DefaultValue::Unset),
    // Deployment
    ("deployment_scheme", DefaultValue::Unset),
    ("hostname", DefaultValue::Unset),
    ("vhost_name", DefaultValue::Unset),
    ("vhost_macro_name", DefaultValue::Unset),
    ("modify_hosts_file", DefaultValue::Bool(false)),
    ("port", DefaultValue::Unset),
    ("cherrypy_env_global_config", DefaultValue::Unset),
    // Database
    ("zodb_deployment_scheme", DefaultValue::Unset),
    ("zeo_port", DefaultValue::Unset),
    ("zeo_service_user", DefaultValue::Unset),
    ("zeo_pack", DefaultValue::Unset),
    ("zeo_pack_days", DefaultValue::Int(2)),
    ("zeo_pack_frequency", DefaultValue::Str("00 04 * * *")),
    // Maintenance
    ("purge_temp_files", DefaultValue::Unset),
    ("purge_temp_files_frequency", DefaultValue::Str("00 05 * * *")),
    ("purge_temp_files_max_days", DefaultValue::Int(3)),
    ("backup", DefaultValue::Unset),
    ("backup_dir", DefaultValue::Unset),
    ("backup_frequency", DefaultValue::Str("30 04 * * *")),
    ("backup_max_days", DefaultValue::Int(3)),
    // Apache
    ("apache_access_log", DefaultValue::Unset),
    ("apache_error_log", DefaultValue::Unset),
    (
        "apache_log_format",
        DefaultValue::Str(r#"%v:%p %h %l %u %t \"%r\" %>s %O \"%{Referer}i\" \"%{User-Agent}i\" %T/%D"#),
    ),
    ("mod_wsgi_access_log", DefaultValue::Unset),
    ("mod_wsgi_error_log", DefaultValue::Unset),
    ("mod_wsgi_log_format", DefaultValue::Unset),
    ("vhost_ssl_private_key_file", DefaultValue::Unset),
    ("vhost_ssl_certificate_file", DefaultValue::Unset),
    ("lets_encrypt", DefaultValue::Bool(false)),
    // mod_wsgi
    ("mod_wsgi_daemon_name", DefaultValue::Unset),
    ("mod_wsgi_daemon_user", DefaultValue::Unset),
    ("mod_wsgi_daemon_group", DefaultValue::Unset),
    ("mod_wsgi_daemon_processes", DefaultValue::Int(1)),
    ("mod_wsgi_daemon_threads", DefaultValue::Int(10)),
    ("mod_wsgi_daemon_display_name", DefaultValue::Unset),
    ("mod_wsgi_daemon_python_eggs", DefaultValue::Unset),
    ("mod_wsgi_daemon_maximum_requests", DefaultValue::Int(5000)),
    ("mod_wsgi_process_group", DefaultValue::Unset),
    ("mod_wsgi_application_group", DefaultValue::Unset),
    // Cache server
    ("cache_enabled", DefaultValue::Bool(false)),
    ("cache_server_port", DefaultValue::Unset),
    ("cache_server_threads", DefaultValue::Int(20)),
    ("cache_server_memory_limit", DefaultValue::Str("128M")),
    // Launcher
    ("launcher", DefaultValue::Str("auto")),
    ("launcher_icons", DefaultValue::List(&[])),
    ("terminal_profile", DefaultValue::Unset),
    ("launcher_script", DefaultValue::Unset),
    ("launcher_tab_script", DefaultValue::Unset),
    ("desktop_file", DefaultValue::Unset),
    // Mercurial
    ("mercurial", DefaultValue::Bool(false)),
    ("mercurial_user", DefaultValue::Unset),
    ("first_commit_message", DefaultValue::Str("Created the project.")),
];

/// The mutable record of settings for one command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    values: BTreeMap<String, Value>,
}

impl Namespace {
    /// Creates a namespace holding only the compiled-in defaults.
    pub fn with_defaults() -> Self {
        let values = DEFAULTS
            .iter()
            .map(|(key, default)| ((*key).to_string(), default.to_value()))
            .collect();
        Self { values }
    }

    /// Creates a namespace from the defaults with each layer of overrides applied in order.
    pub fn from_layers<'a>(layers: impl IntoIterator<Item = &'a Overrides>) -> Self {
        let mut namespace = Self::with_defaults();
        for layer in layers {
            namespace.overlay(layer);
        }
        namespace
    }

    /// Applies explicit values on top of the current ones. `Unset` entries are ignored.
    pub fn overlay(&mut self, overrides: &Overrides) {
        for (key, value) in overrides {
            if !value.is_unset() {
                self.values.insert(key.clone(), value.clone());
            }
        }
    }

    /// Returns the raw value of a setting, `None` if the setting does not exist.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// True if the setting does not exist or is `Unset`.
    pub fn is_unset(&self, key: &str) -> bool {
        self.values.get(key).is_none_or(Value::is_unset)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Sets a setting only if it is still unset. Returns whether it was written.
    pub fn set_default(&mut self, key: &str, value: impl Into<Value>) -> bool {
        if self.is_unset(key) {
            self.set(key, value);
            true
        } else {
            false
        }
    }

    /// Like [`Namespace::set_default`], but the value is only computed when needed.
    pub fn set_default_with<V, F>(&mut self, key: &str, compute: F) -> NamespaceResult<bool>
    where
        V: Into<Value>,
        F: FnOnce(&Self) -> NamespaceResult<V>,
    {
        if self.is_unset(key) {
            let value = compute(self)?;
            self.set(key, value);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn resolved(&self, key: &str) -> NamespaceResult<&Value> {
        match self.values.get(key) {
            None => Err(NamespaceError::Undefined {
                key: key.to_string(),
            }),
            Some(Value::Unset) => Err(NamespaceError::Unresolved {
                key: key.to_string(),
            }),
            Some(value) => Ok(value),
        }
    }

    fn wrong_type(key: &str, expected: &'static str, found: &Value) -> NamespaceError {
        NamespaceError::WrongType {
            key: key.to_string(),
            expected,
            found: found.kind(),
        }
    }

    pub fn get_str(&self, key: &str) -> NamespaceResult<&str> {
        match self.resolved(key)? {
            Value::Str(s) => Ok(s),
            other => Err(Self::wrong_type(key, "a string", other)),
        }
    }

    /// Like [`Namespace::get_str`], but unset (or missing) settings yield `None`.
    pub fn get_opt_str(&self, key: &str) -> NamespaceResult<Option<&str>> {
        if self.is_unset(key) {
            return Ok(None);
        }
        self.get_str(key).map(Some)
    }

    pub fn get_int(&self, key: &str) -> NamespaceResult<i64> {
        match self.resolved(key)? {
            Value::Int(i) => Ok(*i),
            Value::Str(s) => s.trim().parse().map_err(|_| NamespaceError::InvalidValue {
                key: key.to_string(),
                message: format!("'{}' is not an integer", s),
            }),
            other => Err(Self::wrong_type(key, "an integer", other)),
        }
    }

    pub fn get_port(&self, key: &str) -> NamespaceResult<u16> {
        let raw = self.get_int(key)?;
        u16::try_from(raw).map_err(|_| NamespaceError::InvalidValue {
            key: key.to_string(),
            message: format!("{} is not a valid TCP port", raw),
        })
    }

    /// Reads a boolean; unset (or missing) settings count as `false`.
    pub fn get_bool(&self, key: &str) -> NamespaceResult<bool> {
        match self.values.get(key) {
            None | Some(Value::Unset) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(Self::wrong_type(key, "a boolean", other)),
        }
    }

    /// Reads a list; unset (or missing) settings count as empty.
    pub fn get_list(&self, key: &str) -> NamespaceResult<Vec<String>> {
        match self.values.get(key) {
            None | Some(Value::Unset) => Ok(Vec::new()),
            Some(Value::List(items)) => Ok(items.clone()),
            Some(Value::Str(s)) => Ok(vec![s.clone()]),
            Some(other) => Err(Self::wrong_type(key, "a list", other)),
        }
    }

    /// Parses a string setting into one of the closed-choice enums in `models`.
    pub fn get_enum<T>(&self, key: &str) -> NamespaceResult<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.get_str(key)?;
        raw.parse().map_err(|e: T::Err| NamespaceError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Like [`Namespace::get_enum`], but unset settings yield `None`.
    pub fn get_opt_enum<T>(&self, key: &str) -> NamespaceResult<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        if self.is_unset(key) {
            return Ok(None);
        }
        self.get_enum(key).map(Some)
    }

    /// Returns the printable form of a setting for template expansion.
    /// Unset settings are reported as unresolved rather than printed as `None`.
    pub fn render(&self, key: &str) -> NamespaceResult<String> {
        self.resolved(key).map(ToString::to_string)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::with_defaults()
    }
}
