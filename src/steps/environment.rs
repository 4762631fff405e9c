// src/steps/environment.rs

//! The project's directories, its python virtual environment, and the libraries and
//! extensions installed into it.

use super::InstallContext;
use crate::core::templates::PROJECT_ENV;
use crate::system::console;
use crate::system::executor::CommandLine;
use crate::system::ops;
use anyhow::{Context, Result};
use std::path::Path;

const ENV_SUBFOLDERS: &[&str] = &["bin", "include", "lib", "local", "share"];

pub fn create_project_directories(ctx: &mut InstallContext) -> Result<()> {
    for key in ["workspace", "root_dir"] {
        let dir = ctx.path(key)?;
        if !ctx.host.exists(&dir) {
            ctx.host.create_dir_all(&dir)?;
        }
    }
    Ok(())
}

pub fn create_virtual_environment(ctx: &mut InstallContext) -> Result<()> {
    console::heading("Creating the project's virtual environment");

    let probe = CommandLine::new("python3").args(["-c", "import virtualenv"]);
    match ctx.host.run(&probe) {
        Ok(()) => {}
        Err(e) if e.is_non_zero_exit() => ops::install_python_package(ctx.host(), "virtualenv")?,
        Err(e) => return Err(e.into()),
    }

    let env_dir = ctx.path("virtual_env_dir")?;
    let existing: Vec<_> = ENV_SUBFOLDERS
        .iter()
        .map(|name| env_dir.join(name))
        .filter(|dir| ctx.host.exists(dir))
        .collect();

    let mut preserved = false;
    if !existing.is_empty() {
        if ctx.namespace.get_bool("recreate_env")? {
            console::message("Deleting the current environment");
            for dir in &existing {
                ctx.host.remove_dir_all(dir)?;
            }
        } else {
            console::message("Preserving the existing environment");
            preserved = true;
        }
    }

    if !preserved {
        ctx.host.run(
            &CommandLine::new("python3")
                .args(["-m", "virtualenv"])
                .arg(env_dir.display().to_string()),
        )?;
    }

    ctx.pip_install(["--upgrade", "setuptools"])?;
    ctx.pip_install(["--upgrade", "pip"])?;
    ctx.pip_install(["ipython"])?;

    let env_script = ctx.path("project_env_script")?;
    ctx.write_template(&env_script, PROJECT_ENV, None)
}

/// Clones a repository at `revision`, or brings an existing clone up to it.
fn checkout(ctx: &InstallContext, repository: &str, dir: &Path, revision: &str) -> Result<()> {
    if !ctx.host.exists(&dir.join(".hg")) {
        let target = dir.display().to_string();
        ctx.hg(["clone", repository, target.as_str(), "-u", revision], None)?;
    } else {
        ctx.hg(["pull"], Some(dir))?;
        ctx.hg(["update", "--rev", revision], Some(dir))?;
    }
    Ok(())
}

pub fn install_libs(ctx: &mut InstallContext) -> Result<()> {
    for (name, repository, outer_dir, version) in [
        ("cocktail", "cocktail_repository", "cocktail_outer_dir", "cocktail_version"),
        ("woost", "woost_repository", "woost_outer_dir", "woost_version"),
    ] {
        console::heading(&format!("Installing {}", name));
        let dir = ctx.path(outer_dir)?;
        checkout(
            ctx,
            ctx.namespace.get_str(repository)?,
            &dir,
            ctx.namespace.get_str(version)?,
        )?;
        ctx.setup_python_package(&dir)
            .with_context(|| format!("Could not install {}", name))?;
    }
    Ok(())
}

/// Splits an `extensions` entry into its name and repository. Entries without an
/// explicit `name:repository` form use the default extensions repository.
pub fn extension_source(entry: &str, default_repository: &str) -> (String, String) {
    match entry.split_once(':') {
        Some((name, repository)) => (name.to_string(), repository.to_string()),
        None => (entry.to_string(), default_repository.replace("{name}", entry)),
    }
}

pub fn install_extensions(ctx: &mut InstallContext) -> Result<()> {
    let default_repository = ctx.namespace.get_str("default_extensions_repository")?.to_string();
    let root_dir = ctx.path("root_dir")?;

    for entry in ctx.namespace.get_list("extensions")? {
        let (name, repository) = extension_source(&entry, &default_repository);
        console::heading(&format!("Installing woost.extensions.{}", name));

        let dir = root_dir.join(format!("woost-{}", name));
        if !ctx.host.exists(&dir) {
            let target = dir.display().to_string();
            ctx.hg(["clone", repository.as_str(), target.as_str()], None)?;
        } else {
            ctx.hg(["pull", "-u"], Some(&dir))?;
        }
        ctx.setup_python_package(&dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::Value;
    use crate::steps::testing::fixture;
    use std::fs;

    #[test]
    fn test_extension_source() {
        let default = "https://example.org/woost.extensions.{name}";
        assert_eq!(
            extension_source("forms", default),
            ("forms".to_string(), "https://example.org/woost.extensions.forms".to_string())
        );
        assert_eq!(
            extension_source("shop:ssh://hg@example.org/shop", default),
            ("shop".to_string(), "ssh://hg@example.org/shop".to_string())
        );
    }

    #[test]
    fn test_project_directories_are_created() {
        let mut fx = fixture(&[]);
        create_project_directories(&mut fx.context).unwrap();
        assert!(fx.path("root_dir").is_dir());
        assert!(fx.path("workspace").is_dir());
    }

    #[test]
    fn test_new_virtual_environment() {
        let mut fx = fixture(&[]);
        create_project_directories(&mut fx.context).unwrap();
        create_virtual_environment(&mut fx.context).unwrap();

        let env = fx.path("virtual_env_dir").display().to_string();
        let commands = fx.commands();
        assert!(commands[0].starts_with("python3 -c "));
        assert_eq!(commands[1], format!("python3 -m virtualenv {}", env));
        assert_eq!(commands[2], format!("{}/bin/pip install --upgrade setuptools", env));
        assert_eq!(commands[4], format!("{}/bin/pip install ipython", env));

        let env_script = fs::read_to_string(fx.path("project_env_script")).unwrap();
        assert!(env_script.starts_with(&format!("source {}/bin/activate", env)));
    }

    #[test]
    fn test_existing_environment_is_preserved_unless_recreated() {
        let mut fx = fixture(&[]);
        let bin = fx.path("virtual_env_dir").join("bin");
        fs::create_dir_all(&bin).unwrap();

        create_virtual_environment(&mut fx.context).unwrap();
        assert!(bin.exists());
        assert!(!fx.commands().iter().any(|c| c.contains("-m virtualenv")));

        fx.clear_commands();
        fx.context.namespace.set("recreate_env", true);
        create_virtual_environment(&mut fx.context).unwrap();
        assert!(!bin.exists());
        assert!(fx.commands().iter().any(|c| c.contains("-m virtualenv")));
    }

    #[test]
    fn test_install_libs_clones_then_updates() {
        let mut fx = fixture(&[]);
        install_libs(&mut fx.context).unwrap();
        let cocktail = fx.path("cocktail_outer_dir").display().to_string();
        assert_eq!(
            fx.commands()[0],
            format!("hg clone https://bitbucket.org/whads/cocktail {} -u 2.0.dev", cocktail)
        );
        assert!(fx.commands()[1].contains("setup.py develop"));

        fs::create_dir_all(fx.path("woost_outer_dir").join(".hg")).unwrap();
        fx.clear_commands();
        install_libs(&mut fx.context).unwrap();
        assert_eq!(fx.commands()[2], "hg pull");
        assert_eq!(fx.commands()[3], "hg update --rev 3.0.dev");
    }

    #[test]
    fn test_install_extensions() {
        let mut fx = fixture(&[(
            "extensions",
            Value::from(vec!["forms".to_string()]),
        )]);
        install_extensions(&mut fx.context).unwrap();
        let dir = fx.path("root_dir").join("woost-forms");
        assert_eq!(
            fx.commands()[0],
            format!(
                "hg clone https://bitbucket.org/whads/woost.extensions.forms {}",
                dir.display()
            )
        );
    }
}
