// src/system/ops.rs

//! Privileged building blocks shared by features and install steps.

use crate::constants::LEGACY_PORTS_FILE;
use crate::core::paths;
use crate::system::executor::CommandLine;
use crate::system::host::{Host, HostError};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref PACKAGE_VERSION_RE: Regex = Regex::new(r"Version: (\d+(\.\d+)*)").unwrap();
}

pub fn sudo<I, S>(host: &dyn Host, program: &str, args: I) -> Result<(), HostError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    host.run_elevated(&CommandLine::new(program).args(args))
}

pub fn sudo_write(host: &dyn Host, path: &Path, contents: &str) -> Result<(), HostError> {
    log::debug!("Writing '{}' with elevated privileges.", path.display());
    host.write_file_elevated(path, contents.as_bytes())
}

pub fn install_packages(host: &dyn Host, packages: &[&str]) -> Result<(), HostError> {
    if packages.is_empty() {
        return Ok(());
    }
    sudo(
        host,
        "apt-get",
        ["install", "-y"].into_iter().chain(packages.iter().copied()),
    )
}

pub fn install_repository(host: &dyn Host, repository: &str) -> Result<(), HostError> {
    sudo(host, "add-apt-repository", ["-y", "-u", repository])
}

pub fn install_python_package(host: &dyn Host, package: &str) -> Result<(), HostError> {
    sudo(host, "pip3", ["install", package])
}

pub fn enable_apache_module(host: &dyn Host, module: &str) -> Result<(), HostError> {
    sudo(host, "a2enmod", [module])
}

pub fn restart_apache(host: &dyn Host) -> Result<(), HostError> {
    sudo(host, "service", ["apache2", "restart"])
}

pub fn reload_apache(host: &dyn Host) -> Result<(), HostError> {
    sudo(host, "service", ["apache2", "reload"])
}

/// Appends a line to a user's crontab (the invoking user's if `user` is `None`).
/// Editing another user's crontab needs root.
pub fn install_cronjob(host: &dyn Host, cronjob: &str, user: Option<&str>) -> Result<(), HostError> {
    match user {
        Some(user) => host.run_elevated(&CommandLine::shell(format!(
            "(crontab -l -u {user}; echo '{cronjob}') | crontab -u {user} -",
            user = user,
            cronjob = cronjob
        ))),
        None => host.run(&CommandLine::shell(format!(
            "(crontab -l; echo '{}') | crontab -",
            cronjob
        ))),
    }
}

pub fn service_script_path(name: &str) -> PathBuf {
    Path::new("/etc/init.d").join(name)
}

/// Installs an init script and registers it with the default runlevels.
pub fn create_service(host: &dyn Host, name: &str, script: &str) -> Result<(), HostError> {
    let path = service_script_path(name);
    sudo_write(host, &path, script)?;
    sudo(host, "/bin/chmod", ["744".to_string(), path.display().to_string()])?;
    sudo(host, "update-rc.d", [name, "defaults"])
}

pub fn start_service(host: &dyn Host, name: &str) -> Result<(), HostError> {
    host.run_elevated(&CommandLine::new(service_script_path(name).display().to_string()).arg("start"))
}

pub fn stop_service(host: &dyn Host, name: &str) -> Result<(), HostError> {
    host.run_elevated(&CommandLine::new(service_script_path(name).display().to_string()).arg("stop"))
}

/// Returns the numeric components of an installed Debian package's version,
/// or `None` if the package is not installed.
pub fn get_package_version(host: &dyn Host, package: &str) -> Result<Option<Vec<u32>>, HostError> {
    let output = match host.capture(&CommandLine::new("dpkg").args(["-s", package])) {
        Ok(output) => output,
        Err(e) if e.is_non_zero_exit() => return Ok(None),
        Err(e) => return Err(e),
    };
    Ok(parse_package_version(&output))
}

fn parse_package_version(dpkg_output: &str) -> Option<Vec<u32>> {
    let captures = PACKAGE_VERSION_RE.captures(dpkg_output)?;
    captures
        .get(1)?
        .as_str()
        .split('.')
        .map(|part| part.parse().ok())
        .collect()
}

/// Makes sure the host-wide configuration directory exists.
///
/// On first use this creates the directory and its `features` folder, and seeds the
/// port registry, migrating the per-user registry of older releases if present.
pub fn require_config_dir(host: &dyn Host, config_dir: &Path) -> Result<(), HostError> {
    if host.exists(config_dir) {
        return Ok(());
    }

    let dir = config_dir.display().to_string();
    let ports = paths::ports_file(config_dir).display().to_string();
    sudo(host, "mkdir", ["-p".to_string(), dir])?;
    sudo(
        host,
        "mkdir",
        [
            "-p".to_string(),
            paths::features_dir(config_dir).display().to_string(),
        ],
    )?;

    let legacy = paths::expand_home(LEGACY_PORTS_FILE).ok();
    match legacy {
        Some(legacy) if host.exists(&legacy) => {
            sudo(host, "cp", [legacy.display().to_string(), ports.clone()])?;
            sudo(host, "chown", ["root:root".to_string(), ports.clone()])?;
        }
        _ => sudo(host, "touch", [ports.clone()])?,
    }

    sudo(host, "chmod", ["777".to_string(), ports])
}
