// src/steps/mod.rs

//! # Install Steps
//!
//! The tasks behind `make`, `copy` and the embedded unbundler, and the
//! [`InstallContext`] they share.
//!
//! Every variant runs the same pipeline. What differs is injected through
//! [`InstallVariant`]: how the database is obtained, and for bundles, the extra
//! extraction and clean-up tasks.
//!
//! ## Modules
//!
//! - **`identity`**: switching to (and back from) the dedicated user.
//! - **`environment`**: directories, virtual environment, libraries and extensions.
//! - **`project`**: skeleton, settings, package install, hosts file, mercurial repository.
//! - **`database`**: database creation or copy, uploads, the ZEO service.
//! - **`maintenance`**: cron driven packing, purging and backups.
//! - **`apache`**: virtual hosts, certificates and mod_wsgi_express servers.
//! - **`launcher`**: the desktop launcher and its terminal profile.
//! - **`unbundle`**: extraction of an embedded project.

pub mod apache;
pub mod database;
pub mod environment;
pub mod identity;
pub mod launcher;
pub mod maintenance;
pub mod project;
pub mod unbundle;

use crate::core::bundle::EmbeddedBundle;
use crate::core::derivation::{self, HostFacts};
use crate::core::features;
use crate::core::namespace::{Namespace, NamespaceError};
use crate::core::paths;
use crate::core::pipeline::{Phase, Pipeline, PipelineError, Task, TaskFn};
use crate::core::ports::PortRegistry;
use crate::core::presets;
use crate::core::template::{self, TemplateError};
use crate::system::executor::CommandLine;
use crate::system::host::{Host, HostError};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

const HOSTS_FILE: &str = "/etc/hosts";
const LOGROTATE_DIR: &str = "/etc/logrotate.d";

/// The command variants sharing the install pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallVariant {
    /// A brand new project.
    Make,
    /// A new installation of an existing project.
    Copy,
    /// A [`InstallVariant::Copy`] whose source is a project embedded in the executable.
    Unbundle,
}

impl InstallVariant {
    /// How `setup_database` obtains the database.
    pub fn obtain_database(self) -> TaskFn<InstallContext> {
        match self {
            Self::Make => database::init_database,
            Self::Copy | Self::Unbundle => database::copy_database,
        }
    }
}

/// State shared by the tasks of one run.
pub struct InstallContext {
    pub namespace: Namespace,
    pub host: Box<dyn Host>,
    pub variant: InstallVariant,
    pub config_dir: PathBuf,
    pub ports: PortRegistry,
    /// Probed by `init_config` unless supplied beforehand.
    pub facts: Option<HostFacts>,
    /// The main phase selected for this run.
    pub main_tasks: Vec<&'static str>,
    pub hosts_file: PathBuf,
    pub logrotate_dir: PathBuf,
    /// The project carried by the executable (unbundle only).
    pub bundle: Option<EmbeddedBundle>,
}

impl fmt::Debug for InstallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallContext")
            .field("variant", &self.variant)
            .field("config_dir", &self.config_dir)
            .field("main_tasks", &self.main_tasks)
            .field("identity", &self.host.identity())
            .finish_non_exhaustive()
    }
}

impl InstallContext {
    pub fn new(namespace: Namespace, host: Box<dyn Host>, variant: InstallVariant) -> Self {
        let config_dir = paths::system_config_dir();
        let ports = PortRegistry::new(paths::ports_file(&config_dir));
        Self {
            namespace,
            host,
            variant,
            config_dir,
            ports,
            facts: None,
            main_tasks: Vec::new(),
            hosts_file: PathBuf::from(HOSTS_FILE),
            logrotate_dir: PathBuf::from(LOGROTATE_DIR),
            bundle: None,
        }
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    /// A path setting.
    pub fn path(&self, key: &str) -> Result<PathBuf, NamespaceError> {
        self.namespace.get_str(key).map(PathBuf::from)
    }

    pub fn render(&self, text: &str) -> Result<String, TemplateError> {
        template::process_template(text, &self.namespace)
    }

    /// Renders a template into a file and sets its mode.
    pub fn write_template(&self, path: &Path, text: &str, mode: Option<u32>) -> Result<()> {
        let contents = self.render(text)?;
        self.host
            .write_file(path, contents.as_bytes())
            .with_context(|| format!("Could not write '{}'", path.display()))?;
        if let Some(mode) = mode {
            self.host.set_mode(path, mode)?;
        }
        Ok(())
    }

    /// Runs a mercurial command.
    pub fn hg<I, S>(&self, args: I, cwd: Option<&Path>) -> Result<(), HostError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut command = CommandLine::new("hg").args(args);
        if let Some(cwd) = cwd {
            command = command.cwd(cwd);
        }
        self.host.run(&command)
    }

    /// Runs the virtual environment's pip.
    pub fn pip_install<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pip = self.path("virtual_env_dir")?.join("bin").join("pip");
        self.host
            .run(&CommandLine::new(pip.display().to_string()).arg("install").args(args))?;
        Ok(())
    }

    /// Installs a source checkout into the virtual environment in development mode.
    pub fn setup_python_package(&self, package_root: &Path) -> Result<()> {
        let python = self.namespace.get_str("python_bin")?;
        let find_links = format!(
            "--find-links={}",
            self.namespace.get_str("python_packages_url")?
        );
        self.host.run(
            &CommandLine::new(python)
                .arg(package_root.join("setup.py").display().to_string())
                .arg("develop")
                .arg(find_links)
                .cwd(package_root),
        )?;
        Ok(())
    }

    /// Runs a python snippet (a template) with the project's interpreter.
    pub fn run_python(&self, source: &str) -> Result<()> {
        let dir = tempfile::Builder::new()
            .prefix("woostproject")
            .tempdir()
            .context("Could not create a temporary directory for a python script")?;
        let module = dir.path().join("module.py");
        self.host
            .write_file(&module, self.render(source)?.as_bytes())?;
        self.host.hand_over(dir.path())?;

        let python = self.namespace.get_str("python_bin")?;
        self.host
            .run(&CommandLine::new(python).arg(module.display().to_string()))?;
        Ok(())
    }
}

// --- Preliminary tasks ---

fn apply_environment_presets(ctx: &mut InstallContext) -> Result<()> {
    presets::apply_presets(&mut ctx.namespace)?;
    Ok(())
}

fn update_features(ctx: &mut InstallContext) -> Result<()> {
    let required = features::required_features(&ctx.namespace, &ctx.main_tasks, ctx.host())?;
    let updated = features::update_features(ctx.host(), &ctx.config_dir, &required)?;
    log::debug!("Checked features: {:?}", updated);
    Ok(())
}

fn init_config(ctx: &mut InstallContext) -> Result<()> {
    let facts = match ctx.facts.take() {
        Some(facts) => facts,
        None => HostFacts::probe(ctx.host())?,
    };
    derivation::derive(&mut ctx.namespace, &facts, &ctx.ports)?;
    ctx.facts = Some(facts);
    Ok(())
}

// --- The pipeline ---

pub static PRELIMINARY_TASKS: &[Task<InstallContext>] = &[
    Task::new("apply_environment_presets", apply_environment_presets),
    Task::new("update_features", update_features),
    Task::new("init_config", init_config),
    Task::new("become_dedicated_user", identity::become_dedicated_user),
];

pub static MAIN_TASKS: &[Task<InstallContext>] = &[
    Task::new("create_project_directories", environment::create_project_directories),
    Task::new("create_virtual_environment", environment::create_virtual_environment),
    Task::new("install_libs", environment::install_libs),
    Task::new("install_extensions", environment::install_extensions),
    Task::new("create_project_skeleton", project::create_project_skeleton),
    Task::new("write_project_settings", project::write_project_settings),
    Task::new("install_website", project::install_website),
    Task::new("setup_database", database::setup_database),
    Task::new("copy_uploads", database::copy_uploads),
    Task::new("configure_zeo_service", database::configure_zeo_service),
    Task::new("configure_zeo_pack", maintenance::configure_zeo_pack),
    Task::new("configure_temp_files_purging", maintenance::configure_temp_files_purging),
    Task::new("configure_backup", maintenance::configure_backup),
    Task::new("configure_apache", apache::configure_apache),
    Task::new("obtain_lets_encrypt_certificate", apache::obtain_lets_encrypt_certificate),
    Task::new("configure_apache_https", apache::configure_apache_https),
    Task::new("configure_mod_wsgi_express", apache::configure_mod_wsgi_express),
    Task::new(
        "configure_mod_wsgi_express_cache_server",
        apache::configure_mod_wsgi_express_cache_server,
    ),
    Task::new("add_hostname_to_hosts_file", project::add_hostname_to_hosts_file),
    Task::new("create_mercurial_repository", project::create_mercurial_repository),
    Task::new("create_launcher", launcher::create_launcher),
];

pub static CLEANUP_TASKS: &[Task<InstallContext>] = &[Task::new(
    "restore_original_user",
    identity::restore_original_user,
)];

/// Names of the main tasks, in order.
pub fn main_task_names() -> Vec<&'static str> {
    MAIN_TASKS.iter().map(|task| task.name).collect()
}

pub fn build_pipeline(variant: InstallVariant) -> Result<Pipeline<InstallContext>, PipelineError> {
    let mut pipeline = Pipeline::new();
    for (phase, tasks) in [
        (Phase::Preliminary, PRELIMINARY_TASKS),
        (Phase::Main, MAIN_TASKS),
        (Phase::Cleanup, CLEANUP_TASKS),
    ] {
        for task in tasks {
            pipeline.push(phase, *task)?;
        }
    }

    if variant == InstallVariant::Unbundle {
        pipeline.add_task(
            Phase::Preliminary,
            Task::new("extract_bundle_to_temp_dir", unbundle::extract_bundle_to_temp_dir),
            Some("become_dedicated_user"),
            None,
        )?;
        pipeline.push(
            Phase::Cleanup,
            Task::new("delete_bundle_temp_dir", unbundle::delete_bundle_temp_dir),
        )?;
    }
    Ok(pipeline)
}

/// Runs the install pipeline. The `tasks` setting, when given, replaces the main
/// phase; `skipped_tasks` names main tasks to leave out.
pub fn run_install(mut context: InstallContext) -> Result<()> {
    let mut pipeline = build_pipeline(context.variant)?;

    let selected = context.namespace.get_list("tasks")?;
    if !selected.is_empty() {
        pipeline.select_main(&selected)?;
    }

    let skipped: HashSet<String> = context
        .namespace
        .get_list("skipped_tasks")?
        .into_iter()
        .collect();
    for name in &skipped {
        if !main_task_names().contains(&name.as_str()) {
            return Err(PipelineError::UnknownTask { task: name.clone() }.into());
        }
    }

    context.main_tasks = pipeline.task_names(Phase::Main);
    log::debug!("Running {:?} with tasks {:?}", context.variant, context.main_tasks);
    pipeline.run(&mut context, &skipped)
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::core::namespace::Value;
    use crate::system::host::testing::RecordingHost;

    #[test]
    fn test_pipeline_layout() {
        let pipeline = build_pipeline(InstallVariant::Copy).unwrap();
        assert_eq!(
            pipeline.task_names(Phase::Preliminary),
            vec![
                "apply_environment_presets",
                "update_features",
                "init_config",
                "become_dedicated_user"
            ]
        );
        assert_eq!(pipeline.task_names(Phase::Main).len(), 21);
        assert_eq!(pipeline.task_names(Phase::Cleanup), vec!["restore_original_user"]);
    }

    #[test]
    fn test_unbundle_adds_extraction_and_removal() {
        let pipeline = build_pipeline(InstallVariant::Unbundle).unwrap();
        assert_eq!(
            pipeline.task_names(Phase::Preliminary).last(),
            Some(&"extract_bundle_to_temp_dir")
        );
        assert_eq!(
            pipeline.task_names(Phase::Cleanup),
            vec!["restore_original_user", "delete_bundle_temp_dir"]
        );
        assert_eq!(pipeline.task_names(Phase::Main), main_task_names());
    }

    #[test]
    fn test_unknown_skipped_task_is_rejected() {
        let mut namespace = Namespace::with_defaults();
        namespace.set("website", "Acme");
        namespace.set("skipped_tasks", vec!["make_coffee".to_string()]);
        let context = InstallContext::new(
            namespace,
            Box::new(RecordingHost::new()),
            InstallVariant::Make,
        );
        let err = run_install(context).unwrap_err();
        assert!(err.to_string().contains("make_coffee"));
    }

    #[test]
    fn test_fixture_derives_the_namespace() {
        let fx = fixture(&[("deployment_scheme", Value::from("cherrypy"))]);
        assert_eq!(fx.ns().get_str("alias").unwrap(), "Acme");
        assert!(fx.path("project_dir").starts_with(fx.dir.path()));
        assert_eq!(fx.ns().get_str("hostname").unwrap(), "acme.localhost");
    }

    #[test]
    fn test_run_python_writes_a_rendered_module() {
        let fx = fixture(&[]);
        fx.context.run_python("print('--SETUP-ALIAS--')").unwrap();
        let commands = fx.commands();
        let run = commands.last().unwrap();
        assert!(run.starts_with(&format!(
            "{} ",
            fx.ns().get_str("python_bin").unwrap()
        )));
        assert!(run.ends_with("module.py"));
    }
}
