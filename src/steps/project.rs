// src/steps/project.rs

//! The project's own package: its skeleton, settings and installation, plus the
//! optional mercurial repository and hosts file entry.

use super::InstallContext;
use crate::core::skeleton;
use crate::core::templates::{self, NAMESPACE_PACKAGE_INIT, SETUP_PY};
use crate::system::console;
use crate::system::ops;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const EMPTY_PROJECT_FOLDERS: &[&[&str]] = &[
    &["data"],
    &["static", "images"],
    &["image-cache"],
    &["views", "resources"],
    &["upload"],
    &["sessions"],
    &["static", "resources"],
];

/// Static resource folders published under `static/resources`, as (link name, target).
fn resource_links(ctx: &InstallContext) -> Result<Vec<(String, PathBuf)>> {
    let cocktail = ctx.path("cocktail_dir")?;
    let woost = ctx.path("woost_dir")?;
    let project = ctx.path("project_dir")?;
    Ok(vec![
        ("cocktail".to_string(), cocktail.join("html").join("resources")),
        ("cocktail.ui".to_string(), cocktail.join("ui").join("resources")),
        ("woost".to_string(), woost.join("views").join("resources")),
        (
            "woost.admin.ui".to_string(),
            woost.join("admin").join("ui").join("resources"),
        ),
        (
            ctx.namespace.get_str("flat_website_name")?.to_string(),
            project.join("views").join("resources"),
        ),
    ])
}

fn fetch_project_sources(ctx: &InstallContext, repository: &str, outer_dir: &Path) -> Result<()> {
    let revision = ctx.namespace.get_opt_str("revision")?;
    if !ctx.host.exists(&outer_dir.join(".hg")) {
        let mut args = vec![
            "clone".to_string(),
            repository.to_string(),
            outer_dir.display().to_string(),
        ];
        if let Some(revision) = revision {
            args.extend(["--rev".to_string(), revision.to_string()]);
        }
        ctx.hg(args, None)?;
    } else {
        ctx.hg(["pull"], Some(outer_dir))?;
        let mut args = vec!["update".to_string()];
        if let Some(revision) = revision {
            args.extend(["--rev".to_string(), revision.to_string()]);
        }
        ctx.hg(args, Some(outer_dir))?;
    }
    Ok(())
}

pub fn create_project_skeleton(ctx: &mut InstallContext) -> Result<()> {
    console::heading("Creating the project skeleton");

    let outer_dir = ctx.path("project_outer_dir")?;
    let project_dir = ctx.path("project_dir")?;
    let source_repository = ctx.namespace.get_opt_str("source_repository")?.map(str::to_string);

    if let Some(repository) = &source_repository {
        fetch_project_sources(ctx, repository, &outer_dir)?;
    }

    // Namespace packages
    ctx.host.create_dir_all(&outer_dir)?;
    let mut package_path = outer_dir.clone();
    for package in ctx.namespace.get_list("namespace_packages")? {
        package_path.push(package);
        if !ctx.host.exists(&package_path) {
            ctx.host.create_dir_all(&package_path)?;
            ctx.host
                .write_file(&package_path.join("__init__.py"), NAMESPACE_PACKAGE_INIT.as_bytes())?;
        }
    }
    ctx.host.create_dir_all(&project_dir)?;

    let skeleton_dir = ctx.path("woost_dir")?.join("scripts").join("project_skeleton");
    skeleton::copy_skeleton(ctx.host(), &skeleton_dir, &project_dir, |text| {
        crate::core::template::expand_vars(text, &ctx.namespace)
    })?;

    for components in EMPTY_PROJECT_FOLDERS {
        let dir = components.iter().fold(project_dir.clone(), |path, c| path.join(c));
        ctx.host.create_dir_all(&dir)?;
    }

    let scripts_dir = ctx.path("project_scripts_dir")?;
    let entries = fs::read_dir(&scripts_dir)
        .with_context(|| format!("Could not list '{}'", scripts_dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.file_name().is_some_and(|name| name != "__init__.py") {
            ctx.host.set_mode(&path, 0o774)?;
        }
    }

    let resources_dir = ctx.path("static_dir")?.join("resources");
    for (name, target) in resource_links(ctx)? {
        let link = resources_dir.join(name);
        if !ctx.host.exists(&link) && !link.is_symlink() {
            ctx.host.symlink(&target, &link)?;
        }
    }

    ctx.write_template(&outer_dir.join("setup.py"), SETUP_PY, None)?;

    // Generated files that are under version control go back to their committed state.
    if source_repository.is_some() {
        let target = outer_dir.display().to_string();
        ctx.hg(["revert", "--all", "--no-backup", "-R", target.as_str()], None)?;
    }
    Ok(())
}

pub fn write_project_settings(ctx: &mut InstallContext) -> Result<()> {
    console::heading("Writing project settings");
    let path = ctx.path("project_dir")?.join("settings.py");
    let settings = templates::render_settings(&ctx.namespace)?;
    ctx.host
        .write_file(&path, settings.as_bytes())
        .with_context(|| format!("Could not write '{}'", path.display()))?;
    Ok(())
}

pub fn install_website(ctx: &mut InstallContext) -> Result<()> {
    console::heading("Configuring the website's Python package");
    let outer_dir = ctx.path("project_outer_dir")?;
    ctx.setup_python_package(&outer_dir)
}

/// The `.hgignore` of a new project repository.
pub fn mercurial_ignore_file(ctx: &InstallContext) -> Result<String> {
    let outer_dir = ctx.path("project_outer_dir")?;
    let project_dir = ctx.path("project_dir")?;
    let ignored = [
        project_dir.join("settings.py"),
        ctx.path("project_scripts_dir")?.join("rundb.*"),
        project_dir.join("data"),
        project_dir.join("upload"),
        ctx.path("static_dir")?,
        project_dir.join("image-cache"),
        project_dir.join(".session_key"),
        project_dir.join("sessions"),
    ];

    let mut lines = vec!["syntax: glob".to_string(), "*.egg-info".to_string()];
    for path in &ignored {
        let relative = path.strip_prefix(&outer_dir).unwrap_or(path);
        lines.push(relative.display().to_string());
    }
    Ok(lines.join("\n"))
}

pub fn create_mercurial_repository(ctx: &mut InstallContext) -> Result<()> {
    if !ctx.namespace.get_bool("mercurial")? {
        return Ok(());
    }
    let outer_dir = ctx.path("project_outer_dir")?;
    if ctx.host.exists(&outer_dir.join(".hg")) {
        return Ok(());
    }

    console::heading("Creating the project's mercurial repository");
    let target = outer_dir.display().to_string();
    ctx.hg(["init", target.as_str()], None)?;

    let ignore = mercurial_ignore_file(ctx)?;
    ctx.host.write_file(&outer_dir.join(".hgignore"), ignore.as_bytes())?;

    ctx.hg(["addremove"], Some(&outer_dir))?;

    let message = ctx.render(ctx.namespace.get_str("first_commit_message")?)?;
    let mut commit = vec!["commit".to_string(), "-m".to_string(), message];
    if let Some(user) = ctx.namespace.get_opt_str("mercurial_user")? {
        commit.extend(["--user".to_string(), user.to_string()]);
    }
    ctx.hg(commit, Some(&outer_dir))?;
    Ok(())
}

/// Whether a hosts file already maps `hostname`. Comments are ignored.
pub fn hosts_file_defines(contents: &str, hostname: &str) -> bool {
    contents.lines().any(|line| {
        let line = line.split('#').next().unwrap_or_default();
        line.split_whitespace().nth(1) == Some(hostname)
    })
}

pub fn add_hostname_to_hosts_file(ctx: &mut InstallContext) -> Result<()> {
    if !ctx.namespace.get_bool("modify_hosts_file")? {
        return Ok(());
    }

    console::heading("Modifying the system hosts file");
    let hostname = ctx.namespace.get_str("hostname")?;
    let mut contents = ctx.host.read_file(&ctx.hosts_file)?.unwrap_or_default();
    if hosts_file_defines(&contents, hostname) {
        log::debug!("'{}' is already in the hosts file.", hostname);
        return Ok(());
    }

    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(&format!(
        "127.0.0.1\t{} # {} - Woost website\n",
        hostname,
        ctx.namespace.get_str("website")?
    ));
    ops::sudo_write(ctx.host(), &ctx.hosts_file, &contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::Value;
    use crate::steps::testing::{fixture, Fixture};

    fn fixture_with_skeleton(settings: &[(&str, Value)]) -> Fixture {
        let fx = fixture(settings);
        let skeleton = fx.path("woost_dir").join("scripts").join("project_skeleton");
        fs::create_dir_all(skeleton.join("scripts")).unwrap();
        fs::write(skeleton.join("scripts").join("__init__.py"), "").unwrap();
        fs::write(
            skeleton.join("scripts").join("initsite.py"),
            "PACKAGE = '--SETUP-PACKAGE--'\n",
        )
        .unwrap();
        fx
    }

    #[test]
    fn test_skeleton_layout() {
        let mut fx = fixture_with_skeleton(&[("package", Value::from("acme.site"))]);
        create_project_skeleton(&mut fx.context).unwrap();

        let outer = fx.path("project_outer_dir");
        let project = fx.path("project_dir");
        assert_eq!(project, outer.join("acme").join("site"));
        assert_eq!(
            fs::read_to_string(outer.join("acme").join("__init__.py")).unwrap(),
            NAMESPACE_PACKAGE_INIT
        );
        assert_eq!(
            fs::read_to_string(project.join("scripts").join("initsite.py")).unwrap(),
            "PACKAGE = 'acme.site'\n"
        );
        for folder in ["data", "image-cache", "sessions", "upload"] {
            assert!(project.join(folder).is_dir(), "{} is missing", folder);
        }

        let resources = fx.path("static_dir").join("resources");
        assert!(resources.join("cocktail.ui").is_symlink());
        assert_eq!(
            fs::read_link(resources.join("acme")).unwrap(),
            project.join("views").join("resources")
        );

        let setup = fs::read_to_string(outer.join("setup.py")).unwrap();
        assert!(setup.contains("name = \"Acme\""));
        assert!(setup.contains(r#"namespace_packages = ["acme"]"#));
        assert!(fx.commands().is_empty());
    }

    #[test]
    fn test_skeleton_from_source_repository() {
        let mut fx = fixture_with_skeleton(&[
            ("source_repository", Value::from("ssh://prod/acme")),
            ("revision", Value::from("42")),
        ]);
        create_project_skeleton(&mut fx.context).unwrap();

        let outer = fx.path("project_outer_dir").display().to_string();
        let commands = fx.commands();
        assert_eq!(commands[0], format!("hg clone ssh://prod/acme {} --rev 42", outer));
        assert_eq!(
            commands.last().unwrap(),
            &format!("hg revert --all --no-backup -R {}", outer)
        );
    }

    #[test]
    fn test_mercurial_ignore_file_is_relative() {
        let fx = fixture(&[]);
        let ignore = mercurial_ignore_file(&fx.context).unwrap();
        let lines: Vec<&str> = ignore.lines().collect();
        assert_eq!(lines[0], "syntax: glob");
        assert_eq!(lines[1], "*.egg-info");
        assert_eq!(lines[2], "acme/settings.py");
        assert_eq!(lines[3], "acme/scripts/rundb.*");
        assert_eq!(lines[6], "acme/static");
    }

    #[test]
    fn test_mercurial_repository() {
        let mut fx = fixture(&[
            ("mercurial", Value::from(true)),
            ("mercurial_user", Value::from("dev")),
        ]);
        create_mercurial_repository(&mut fx.context).unwrap();

        let outer = fx.path("project_outer_dir");
        assert!(outer.join(".hgignore").exists());
        let commands = fx.commands();
        assert_eq!(commands[0], format!("hg init {}", outer.display()));
        assert_eq!(commands[1], "hg addremove");
        assert!(commands[2].ends_with("--user dev"));
    }

    #[test]
    fn test_hosts_file_defines() {
        let hosts = "127.0.0.1\tlocalhost\n# 127.0.0.1 acme.localhost\n";
        assert!(hosts_file_defines(hosts, "localhost"));
        assert!(!hosts_file_defines(hosts, "acme.localhost"));
    }

    #[test]
    fn test_hostname_is_appended_once() {
        let mut fx = fixture(&[("modify_hosts_file", Value::from(true))]);
        fs::write(&fx.context.hosts_file, "127.0.0.1\tlocalhost").unwrap();

        add_hostname_to_hosts_file(&mut fx.context).unwrap();
        let hosts_file = fx.context.hosts_file.clone();
        assert_eq!(
            fx.elevated_file(&hosts_file).unwrap(),
            "127.0.0.1\tlocalhost\n127.0.0.1\tacme.localhost # Acme - Woost website\n"
        );

        add_hostname_to_hosts_file(&mut fx.context).unwrap();
        assert_eq!(fx.elevated_file(&hosts_file).unwrap().lines().count(), 2);
    }
}
