// src/steps/database.rs

//! Obtaining the project's database (fresh or copied), its uploads, and the ZEO
//! service that serves it in production.

use super::InstallContext;
use crate::core::templates::{COPY_MIGRATION_SCRIPT, STATIC_PUBLICATION_SCRIPT, ZEO_SERVICE_SCRIPT};
use crate::models::ZodbDeploymentScheme;
use crate::system::console;
use crate::system::executor::CommandLine;
use crate::system::ops;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

fn database_file(ctx: &InstallContext) -> Result<PathBuf> {
    Ok(ctx.path("project_dir")?.join("data").join("database.fs"))
}

/// The project folder of the installation being copied.
fn source_project_dir(ctx: &InstallContext, source: &str) -> Result<PathBuf> {
    let mut dir = PathBuf::from(source).join(ctx.namespace.get_str("website")?.to_lowercase());
    for part in ctx.namespace.get_str("package")?.split('.') {
        dir.push(part);
    }
    Ok(dir)
}

/// Runs `body` with a ZEO server for the project's database running in the
/// background. The server is killed on the way out, whatever `body` returns.
pub fn with_zeo_process<T>(
    ctx: &InstallContext,
    body: impl FnOnce(&InstallContext) -> Result<T>,
) -> Result<T> {
    let runzeo = ctx.path("virtual_env_dir")?.join("bin").join("runzeo");
    let address = format!("127.0.0.1:{}", ctx.namespace.get_port("zeo_port")?);
    let command = CommandLine::new(ctx.namespace.get_str("python_bin")?)
        .arg(runzeo.display().to_string())
        .arg("-f")
        .arg(database_file(ctx)?.display().to_string())
        .arg("-a")
        .arg(address);

    let process = ctx
        .host
        .spawn(&command)
        .context("Could not start the ZEO server")?;
    let _server = scopeguard::guard(process, |mut process| {
        if let Err(e) = process.kill() {
            log::warn!("Could not stop the ZEO server: {}", e);
        }
    });
    body(ctx)
}

pub fn setup_database(ctx: &mut InstallContext) -> Result<()> {
    let obtain = ctx.variant.obtain_database();
    obtain(ctx)
}

pub fn init_database(ctx: &mut InstallContext) -> Result<()> {
    console::heading("Initializing the database");

    let ns = &ctx.namespace;
    let init_script = ctx.path("project_dir")?.join("scripts").join("initsite.py");
    let mut command = CommandLine::new(ns.get_str("python_bin")?).arg(init_script.display().to_string());

    if let Some(email) = ns.get_opt_str("admin_email")? {
        command = command.args(["--user", email]);
    }
    if let Some(password) = ns.get_opt_str("admin_password")? {
        command = command.args(["--password", password]);
    }
    let languages = ns.get_list("languages")?;
    if !languages.is_empty() {
        command = command.arg(format!("--languages={}", languages.join(",")));
    }
    if let Some(id) = ns.get_opt_str("installation_id")? {
        command = command.args(["--installation-id", id]);
    }
    if let Some(hostname) = ns.get_opt_str("hostname")? {
        command = command.args(["--hostname", hostname]);
    }
    if ns.get_bool("lets_encrypt")? {
        command = command.args(["--https", "always"]);
    }
    if !ns.is_unset("base_id") {
        command = command.arg("--base-id").arg(ns.render("base_id")?);
    }

    with_zeo_process(ctx, |ctx| Ok(ctx.host.run(&command)?))
}

pub fn copy_database(ctx: &mut InstallContext) -> Result<()> {
    if ctx.namespace.get_bool("skip_database")? {
        return Ok(());
    }
    let Some(source) = ctx.namespace.get_opt_str("source_installation")?.map(str::to_string) else {
        return Ok(());
    };

    console::heading("Copying database");
    let source_file = source_project_dir(ctx, &source)?.join("data").join("database.fs");
    ctx.host.run(
        &CommandLine::new("rsync")
            .args(["-P", "--update"])
            .arg(source_file.display().to_string())
            .arg(database_file(ctx)?.display().to_string()),
    )?;

    with_zeo_process(ctx, |ctx| ctx.run_python(COPY_MIGRATION_SCRIPT))
}

pub fn copy_uploads(ctx: &mut InstallContext) -> Result<()> {
    let Some(source) = ctx.namespace.get_opt_str("source_installation")?.map(str::to_string) else {
        return Ok(());
    };
    if ctx.namespace.get_bool("skip_uploads")? {
        return Ok(());
    }

    let dest = ctx.path("project_dir")?.join("upload");
    if let Some(repository) = ctx.namespace.get_opt_str("uploads_repository")?.map(PathBuf::from) {
        console::heading("Linking uploads");
        let entries = fs::read_dir(&repository)
            .with_context(|| format!("Could not list '{}'", repository.display()))?;
        for entry in entries {
            let file = entry?.path();
            if !file.is_file() {
                continue;
            }
            if let Some(name) = file.file_name() {
                let link = dest.join(name);
                if !ctx.host.exists(&link) {
                    ctx.host.symlink(&file, &link)?;
                }
            }
        }
    } else {
        console::heading("Copying uploads");
        let src = source_project_dir(ctx, &source)?.join("upload");
        ctx.host.run(
            &CommandLine::new("rsync")
                .arg("-r")
                .arg(format!("{}/", src.display().to_string().trim_end_matches('/')))
                .arg(dest.display().to_string())
                .args(["--exclude", "temp"]),
        )?;
    }

    with_zeo_process(ctx, |ctx| ctx.run_python(STATIC_PUBLICATION_SCRIPT))
}

pub fn configure_zeo_service(ctx: &mut InstallContext) -> Result<()> {
    let scheme: ZodbDeploymentScheme = ctx.namespace.get_enum("zodb_deployment_scheme")?;
    if scheme != ZodbDeploymentScheme::ZeoService {
        return Ok(());
    }

    console::heading("Installing a service for the ZEO database");

    if ctx.namespace.is_unset("zeo_service_user") {
        let user = match ctx.namespace.get_opt_str("dedicated_user")? {
            Some(user) => user.to_string(),
            None => ctx.host.invoking_user()?.name,
        };
        ctx.namespace.set("zeo_service_user", user);
    }

    let name = ctx.namespace.get_str("zeo_service_name")?.to_string();
    match ops::stop_service(ctx.host(), &name) {
        Ok(()) => {}
        Err(e) if e.is_non_zero_exit() => log::warn!("Could not stop service '{}': {}", name, e),
        Err(e) => return Err(e.into()),
    }

    ops::create_service(ctx.host(), &name, &ctx.render(ZEO_SERVICE_SCRIPT)?)?;
    ops::start_service(ctx.host(), &name)?;
    Ok(())
}
