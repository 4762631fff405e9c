// src/cli/args.rs

//! Argument groups shared by the install commands.
//!
//! Every field is optional: only flags given on the command line become explicit
//! values in the namespace. Everything else is left to the user defaults file,
//! the bundle manifest, presets and derivation. `bundle` relies on this to export
//! exactly what the user typed.

use crate::core::namespace::{Overrides, Value};
use crate::models::{DeploymentScheme, Environment, LauncherMode, ZodbDeploymentScheme};
use clap::Args;
use std::fmt;

/// Collects explicitly given arguments into [`Overrides`].
#[derive(Debug, Default)]
pub struct OverridesBuilder {
    overrides: Overrides,
}

impl OverridesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&mut self, key: &str, value: Option<impl Into<Value>>) -> &mut Self {
        if let Some(value) = value {
            self.overrides.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn text(&mut self, key: &str, value: &Option<String>) -> &mut Self {
        self.value(key, value.clone())
    }

    pub fn choice(&mut self, key: &str, value: Option<impl fmt::Display>) -> &mut Self {
        self.value(key, value.map(|v| v.to_string()))
    }

    /// A `store_true` flag: absent means "not given".
    pub fn flag(&mut self, key: &str, given: bool) -> &mut Self {
        self.value(key, given.then_some(true))
    }

    /// A `--x` / `--no-x` pair.
    pub fn toggle(&mut self, key: &str, on: bool, off: bool) -> &mut Self {
        let value = match (on, off) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        };
        self.value(key, value)
    }

    pub fn list(&mut self, key: &str, values: &Option<Vec<String>>) -> &mut Self {
        self.value(key, values.clone())
    }

    pub fn build(&mut self) -> Overrides {
        std::mem::take(&mut self.overrides)
    }
}

/// Main task selection. Not offered by `bundle`.
#[derive(Args, Debug, Default)]
pub struct TaskArgs {
    /// The tasks to execute, replacing the default sequence. Useful to amend or
    /// fix a previous installation.
    #[arg(long, value_name = "TASK", num_args = 1..)]
    pub tasks: Option<Vec<String>>,

    /// Delete and recreate the project's virtual environment if it already exists.
    #[arg(long)]
    pub recreate_env: bool,
}

impl TaskArgs {
    pub fn collect(&self, builder: &mut OverridesBuilder) {
        builder
            .list("tasks", &self.tasks)
            .flag("recreate_env", self.recreate_env);
    }
}

/// Options shared by `make`, `copy`, `bundle` and the unbundler.
#[derive(Args, Debug, Default)]
pub struct InstallArgs {
    /// Choose between a development or a production environment. Changes the
    /// defaults of several settings.
    #[arg(long, value_enum)]
    pub environment: Option<Environment>,

    /// Specific tasks to exclude.
    #[arg(long, value_name = "TASK", num_args = 1..)]
    pub skip_tasks: Option<Vec<String>>,

    // --- Location ---
    /// The directory containing the project. Defaults to the dedicated user's home, else $WORKSPACE.
    #[arg(long, help_heading = "Location")]
    pub workspace: Option<String>,

    /// Name of the project folder. Defaults to the website name.
    #[arg(long, help_heading = "Location")]
    pub alias: Option<String>,

    /// Name of the project's python package. Defaults to the lowercased website name.
    #[arg(long, help_heading = "Location")]
    pub package: Option<String>,

    /// Run the project as this user, creating it if needed. Requires root.
    #[arg(long, help_heading = "Location")]
    pub dedicated_user: Option<String>,

    /// Login shell for a newly created dedicated user.
    #[arg(long, help_heading = "Location")]
    pub dedicated_user_shell: Option<String>,

    /// Identifier of this installation. Defaults to $WOOST_INSTALLATION_ID or the hostname.
    #[arg(long, help_heading = "Location")]
    pub installation_id: Option<String>,

    // --- CMS ---
    #[arg(long, help_heading = "CMS")]
    pub woost_version: Option<String>,

    /// Requirement specifier for woost in the generated setup.py.
    #[arg(long, help_heading = "CMS")]
    pub woost_dependency_specifier: Option<String>,

    #[arg(long, help_heading = "CMS")]
    pub cocktail_version: Option<String>,

    /// Extensions to install, as `name` or `name:revision`.
    #[arg(long, value_name = "EXTENSION", num_args = 1.., help_heading = "CMS")]
    pub extensions: Option<Vec<String>>,

    // --- Deployment ---
    #[arg(long, value_enum, help_heading = "Deployment")]
    pub deployment_scheme: Option<DeploymentScheme>,

    /// The hostname of the website. Defaults to `<alias>.<root host>`.
    #[arg(long, help_heading = "Deployment")]
    pub hostname: Option<String>,

    /// Add the hostname to /etc/hosts.
    #[arg(long, help_heading = "Deployment")]
    pub modify_hosts_file: bool,

    /// The port of the application server. Allocated incrementally if not given.
    #[arg(long, help_heading = "Deployment")]
    pub port: Option<u16>,

    // --- Database ---
    #[arg(long, value_enum, help_heading = "DB")]
    pub zodb_deployment_scheme: Option<ZodbDeploymentScheme>,

    /// The user running the ZEO service. Defaults to the dedicated user, or the current one.
    #[arg(long, help_heading = "DB")]
    pub zeo_service_user: Option<String>,

    #[arg(long, help_heading = "DB")]
    pub zeo_port: Option<u16>,

    /// Enable periodic packing of the database.
    #[arg(long, overrides_with = "no_zeo_pack", help_heading = "DB")]
    pub zeo_pack: bool,

    #[arg(long, overrides_with = "zeo_pack", help_heading = "DB")]
    pub no_zeo_pack: bool,

    /// Crontab schedule of database packing.
    #[arg(long, help_heading = "DB")]
    pub zeo_pack_frequency: Option<String>,

    /// Days of history kept by a pack.
    #[arg(long, help_heading = "DB")]
    pub zeo_pack_days: Option<i64>,

    // --- Purge temporary files ---
    /// Enable purging of old sessions and uploads.
    #[arg(long, overrides_with = "no_purge_temp_files", help_heading = "Purge temporary files")]
    pub purge_temp_files: bool,

    #[arg(long, overrides_with = "purge_temp_files", help_heading = "Purge temporary files")]
    pub no_purge_temp_files: bool,

    #[arg(long, help_heading = "Purge temporary files")]
    pub purge_temp_files_frequency: Option<String>,

    #[arg(long, help_heading = "Purge temporary files")]
    pub purge_temp_files_max_days: Option<i64>,

    // --- Backup ---
    /// Enable database and upload backups.
    #[arg(long, overrides_with = "no_backup", help_heading = "Backup")]
    pub backup: bool,

    #[arg(long, overrides_with = "backup", help_heading = "Backup")]
    pub no_backup: bool,

    #[arg(long, help_heading = "Backup")]
    pub backup_dir: Option<String>,

    #[arg(long, help_heading = "Backup")]
    pub backup_frequency: Option<String>,

    #[arg(long, help_heading = "Backup")]
    pub backup_max_days: Option<i64>,

    // --- Logging ---
    #[arg(long, help_heading = "Logging")]
    pub apache_access_log: Option<String>,

    #[arg(long, help_heading = "Logging")]
    pub apache_log_format: Option<String>,

    #[arg(long, help_heading = "Logging")]
    pub apache_error_log: Option<String>,

    #[arg(long, help_heading = "Logging")]
    pub mod_wsgi_access_log: Option<String>,

    #[arg(long, help_heading = "Logging")]
    pub mod_wsgi_log_format: Option<String>,

    #[arg(long, help_heading = "Logging")]
    pub mod_wsgi_error_log: Option<String>,

    // --- Launcher ---
    /// Create a desktop launcher. `auto` creates it when the desktop supports it.
    #[arg(long, value_enum, help_heading = "Launcher")]
    pub launcher: Option<LauncherMode>,

    /// PNG icons for the launcher (16, 32, 48, 128 or 256 pixels square).
    #[arg(long = "launcher-icon", value_name = "ICON", num_args = 1.., help_heading = "Launcher")]
    pub launcher_icons: Option<Vec<String>>,

    // --- Mercurial ---
    /// Create a mercurial repository for the new project.
    #[arg(long, help_heading = "Mercurial")]
    pub mercurial: bool,

    /// The author of the project's first commit.
    #[arg(long, help_heading = "Mercurial")]
    pub mercurial_user: Option<String>,

    // --- mod_wsgi ---
    #[arg(long, help_heading = "mod_wsgi")]
    pub mod_wsgi_daemon_name: Option<String>,

    #[arg(long, help_heading = "mod_wsgi")]
    pub mod_wsgi_daemon_user: Option<String>,

    #[arg(long, help_heading = "mod_wsgi")]
    pub mod_wsgi_daemon_group: Option<String>,

    #[arg(long, help_heading = "mod_wsgi")]
    pub mod_wsgi_daemon_processes: Option<i64>,

    #[arg(long, help_heading = "mod_wsgi")]
    pub mod_wsgi_daemon_threads: Option<i64>,

    #[arg(long, help_heading = "mod_wsgi")]
    pub mod_wsgi_daemon_display_name: Option<String>,

    #[arg(long, help_heading = "mod_wsgi")]
    pub mod_wsgi_daemon_python_eggs: Option<String>,

    #[arg(long, help_heading = "mod_wsgi")]
    pub mod_wsgi_daemon_maximum_requests: Option<i64>,

    #[arg(long, help_heading = "mod_wsgi")]
    pub mod_wsgi_process_group: Option<String>,

    #[arg(long, help_heading = "mod_wsgi")]
    pub mod_wsgi_application_group: Option<String>,

    // --- Lets Encrypt ---
    /// Obtain an SSL certificate from Lets Encrypt.
    #[arg(long, overrides_with = "no_lets_encrypt", help_heading = "Lets Encrypt")]
    pub lets_encrypt: bool,

    #[arg(long, overrides_with = "lets_encrypt", help_heading = "Lets Encrypt")]
    pub no_lets_encrypt: bool,

    // --- Cache ---
    /// Enable content caching.
    #[arg(long, help_heading = "Cache")]
    pub cache_enabled: bool,

    #[arg(long, help_heading = "Cache")]
    pub cache_server_port: Option<u16>,

    #[arg(long, help_heading = "Cache")]
    pub cache_server_threads: Option<i64>,

    /// Memory limit of the cache server, e.g. `128M`.
    #[arg(long, help_heading = "Cache")]
    pub cache_server_memory_limit: Option<String>,
}

impl InstallArgs {
    pub fn collect(&self, b: &mut OverridesBuilder) {
        b.choice("environment", self.environment)
            .list("skipped_tasks", &self.skip_tasks)
            .text("workspace", &self.workspace)
            .text("alias", &self.alias)
            .text("package", &self.package)
            .text("dedicated_user", &self.dedicated_user)
            .text("dedicated_user_shell", &self.dedicated_user_shell)
            .text("installation_id", &self.installation_id)
            .text("woost_version", &self.woost_version)
            .text("woost_dependency_specifier", &self.woost_dependency_specifier)
            .text("cocktail_version", &self.cocktail_version)
            .list("extensions", &self.extensions)
            .choice("deployment_scheme", self.deployment_scheme)
            .text("hostname", &self.hostname)
            .flag("modify_hosts_file", self.modify_hosts_file)
            .value("port", self.port)
            .choice("zodb_deployment_scheme", self.zodb_deployment_scheme)
            .text("zeo_service_user", &self.zeo_service_user)
            .value("zeo_port", self.zeo_port)
            .toggle("zeo_pack", self.zeo_pack, self.no_zeo_pack)
            .text("zeo_pack_frequency", &self.zeo_pack_frequency)
            .value("zeo_pack_days", self.zeo_pack_days)
            .toggle("purge_temp_files", self.purge_temp_files, self.no_purge_temp_files)
            .text("purge_temp_files_frequency", &self.purge_temp_files_frequency)
            .value("purge_temp_files_max_days", self.purge_temp_files_max_days)
            .toggle("backup", self.backup, self.no_backup)
            .text("backup_dir", &self.backup_dir)
            .text("backup_frequency", &self.backup_frequency)
            .value("backup_max_days", self.backup_max_days)
            .text("apache_access_log", &self.apache_access_log)
            .text("apache_log_format", &self.apache_log_format)
            .text("apache_error_log", &self.apache_error_log)
            .text("mod_wsgi_access_log", &self.mod_wsgi_access_log)
            .text("mod_wsgi_log_format", &self.mod_wsgi_log_format)
            .text("mod_wsgi_error_log", &self.mod_wsgi_error_log)
            .choice("launcher", self.launcher)
            .list("launcher_icons", &self.launcher_icons)
            .flag("mercurial", self.mercurial)
            .text("mercurial_user", &self.mercurial_user)
            .text("mod_wsgi_daemon_name", &self.mod_wsgi_daemon_name)
            .text("mod_wsgi_daemon_user", &self.mod_wsgi_daemon_user)
            .text("mod_wsgi_daemon_group", &self.mod_wsgi_daemon_group)
            .value("mod_wsgi_daemon_processes", self.mod_wsgi_daemon_processes)
            .value("mod_wsgi_daemon_threads", self.mod_wsgi_daemon_threads)
            .text("mod_wsgi_daemon_display_name", &self.mod_wsgi_daemon_display_name)
            .text("mod_wsgi_daemon_python_eggs", &self.mod_wsgi_daemon_python_eggs)
            .value("mod_wsgi_daemon_maximum_requests", self.mod_wsgi_daemon_maximum_requests)
            .text("mod_wsgi_process_group", &self.mod_wsgi_process_group)
            .text("mod_wsgi_application_group", &self.mod_wsgi_application_group)
            .toggle("lets_encrypt", self.lets_encrypt, self.no_lets_encrypt)
            .flag("cache_enabled", self.cache_enabled)
            .value("cache_server_port", self.cache_server_port)
            .value("cache_server_threads", self.cache_server_threads)
            .text("cache_server_memory_limit", &self.cache_server_memory_limit);
    }
}

/// Options controlling how an existing installation is copied.
#[derive(Args, Debug, Default)]
pub struct CopyArgs {
    /// The revision (or branch, bookmark or tag) of the project to clone.
    #[arg(long, help_heading = "Copy")]
    pub revision: Option<String>,

    /// Don't copy the database.
    #[arg(long, help_heading = "Copy")]
    pub skip_database: bool,

    /// Don't copy uploaded files.
    #[arg(long, help_heading = "Copy")]
    pub skip_uploads: bool,

    /// Link file uploads from this folder instead of copying them.
    #[arg(long, help_heading = "Copy")]
    pub uploads_repository: Option<String>,
}

impl CopyArgs {
    pub fn collect(&self, builder: &mut OverridesBuilder) {
        builder
            .text("revision", &self.revision)
            .flag("skip_database", self.skip_database)
            .flag("skip_uploads", self.skip_uploads)
            .text("uploads_repository", &self.uploads_repository);
    }
}
