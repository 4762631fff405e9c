// src/core/derivation.rs

//! # Derivation
//!
//! Computes every setting the user did not supply from the ones they did, from a
//! handful of facts about the host, and from the port registry.
//!
//! The pass is a flat, ordered sequence of "set if still unset" assignments: each
//! rule only reads settings resolved by the rules above it. Running it again on a
//! derived namespace changes nothing.

use crate::constants::{INSTALLATION_ID_ENV_VAR, ROOT_HOST_ENV_VAR, WORKSPACE_ENV_VAR};
use crate::core::namespace::{Namespace, NamespaceError};
use crate::core::ports::{PortError, PortRegistry};
use crate::core::templates;
use crate::models::DeploymentScheme;
use crate::system::executor::CommandLine;
use crate::system::host::{Host, HostError};
use crate::system::ops;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Woost release → cocktail version it requires.
pub const COCKTAIL_VERSIONS: &[(&str, &str)] = &[("3.0", "2.0.dev")];

const DEFAULT_PYTHON_VERSION: &str = "3";

#[derive(Error, Debug)]
pub enum DerivationError {
    #[error(
        "Must specify either --workspace or --dedicated-user, or set the WORKSPACE environment variable."
    )]
    MissingWorkspace,
    #[error(
        "Couldn't determine the required cocktail version for woost {0}. Check your --woost-version parameter, or set --cocktail-version manually."
    )]
    UnknownCocktailVersion(String),
    #[error("Deployment with Apache requires Apache 2.4")]
    ApacheRequired,
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    #[error(transparent)]
    Port(#[from] PortError),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Facts about the host that derivation depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFacts {
    pub hostname: String,
    /// Name and home of the user running the tool.
    pub user: String,
    pub home: PathBuf,
    /// Numeric components of the installed `apache2` package, if any.
    pub apache_version: Option<Vec<u32>>,
    /// `major.minor` of the system python.
    pub python_version: String,
    pub workspace_env: Option<String>,
    pub root_host_env: Option<String>,
    pub installation_id_env: Option<String>,
}

impl HostFacts {
    pub fn probe(host: &dyn Host) -> Result<Self, DerivationError> {
        let user = host.invoking_user()?;
        let python_version = match host.capture(&CommandLine::new("python3").args([
            "-c",
            "import sys; print('%d.%d' % sys.version_info[:2])",
        ])) {
            Ok(output) => output.trim().to_string(),
            Err(e) => {
                log::warn!("Could not determine the python version: {}", e);
                DEFAULT_PYTHON_VERSION.to_string()
            }
        };

        let facts = Self {
            hostname: host.hostname()?,
            user: user.name,
            home: user.home,
            apache_version: ops::get_package_version(host, "apache2")?,
            python_version,
            workspace_env: non_empty_env(WORKSPACE_ENV_VAR),
            root_host_env: non_empty_env(ROOT_HOST_ENV_VAR),
            installation_id_env: non_empty_env(INSTALLATION_ID_ENV_VAR),
        };
        log::debug!("Host facts: {:?}", facts);
        Ok(facts)
    }

    fn has_apache_2_4(&self) -> bool {
        matches!(self.apache_version.as_deref(), Some([2, 4, ..]))
    }

    fn apache_patch_level(&self) -> u32 {
        self.apache_version
            .as_deref()
            .and_then(|parts| parts.get(2))
            .copied()
            .unwrap_or(0)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn join(base: &str, parts: &[&str]) -> String {
    let mut path = PathBuf::from(base);
    for part in parts {
        path.push(part);
    }
    path.display().to_string()
}

fn dir_of(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

/// Rewrites a `host:path` or `user@host:path` location as an ssh URL.
pub fn source_repository_for(source_installation: &str, website: &str) -> String {
    let repository = format!(
        "{}/{}",
        source_installation.trim_end_matches('/'),
        website.to_lowercase()
    );
    if repository.contains(':') || repository.contains('@') {
        format!("ssh://{}", repository.replacen(':', "/", 1))
    } else {
        repository
    }
}

/// `3.0.dev` → `3.0`; anything else is returned unchanged.
pub fn release_number(version: &str) -> String {
    match version.strip_suffix(".dev") {
        Some(release) => release.to_string(),
        None => version.to_string(),
    }
}

/// Finds the cocktail version for the longest known prefix of a woost release.
pub fn cocktail_version_for(release: &str) -> Option<&'static str> {
    let mut parts: Vec<&str> = release.split('.').collect();
    while !parts.is_empty() {
        let prefix = parts.join(".");
        if let Some((_, cocktail)) = COCKTAIL_VERSIONS.iter().find(|(woost, _)| *woost == prefix) {
            return Some(cocktail);
        }
        parts.pop();
    }
    None
}

pub fn derive(
    ns: &mut Namespace,
    facts: &HostFacts,
    ports: &PortRegistry,
) -> Result<(), DerivationError> {
    let website = ns.get_str("website")?.to_string();
    let dedicated_user = ns.get_opt_str("dedicated_user")?.map(str::to_string);
    let scheme: DeploymentScheme = ns.get_enum("deployment_scheme")?;

    // --- Sources ---
    if let Some(source) = ns.get_opt_str("source_installation")?.map(str::to_string) {
        ns.set_default("source_repository", source_repository_for(&source, &website));
    }
    ns.set_default_with("woost_release_number", |ns| {
        ns.get_str("woost_version").map(release_number)
    })?;
    ns.set_default_with("woost_dependency_specifier", |ns| {
        Ok(format!("=={}.*", ns.get_str("woost_release_number")?))
    })?;

    // --- Names ---
    ns.set_default("alias", website.clone());
    let alias = ns.get_str("alias")?.to_string();
    ns.set_default("flat_website_name", website.to_lowercase().replace('.', "_"));
    ns.set_default("flat_website_alias", alias.to_lowercase().replace('.', "_"));

    if ns.is_unset("workspace") {
        let workspace = match &dedicated_user {
            Some(user) => Some(join("/home", &[user.as_str()])),
            None => facts.workspace_env.clone(),
        };
        ns.set("workspace", workspace.ok_or(DerivationError::MissingWorkspace)?);
    }
    let workspace = ns.get_str("workspace")?.to_string();

    ns.set_default_with("root_host", |ns| {
        Ok::<_, NamespaceError>(match &facts.root_host_env {
            Some(host) => host.clone(),
            None => ns.get_str("default_root_host")?.to_string(),
        })
    })?;
    ns.set_default(
        "installation_id",
        facts
            .installation_id_env
            .clone()
            .unwrap_or_else(|| facts.hostname.clone()),
    );

    ns.set_default("package", website.to_lowercase());
    let package = ns.get_str("package")?.to_string();
    let package_parts: Vec<&str> = package.split('.').collect();
    let namespace_packages: Vec<String> = package_parts
        .iter()
        .take(package_parts.len().saturating_sub(1))
        .map(|part| (*part).to_string())
        .collect();
    let namespace_package_list: Vec<String> = (1..=namespace_packages.len())
        .map(|n| namespace_packages.iter().take(n).cloned().collect::<Vec<_>>().join("."))
        .collect();
    ns.set_default("namespace_packages", namespace_packages);
    ns.set_default("namespace_package_list", namespace_package_list);

    let flat_alias = ns.get_str("flat_website_alias")?.to_string();
    ns.set_default("vhost_name", flat_alias.clone());
    ns.set_default_with("vhost_macro_name", |ns| {
        Ok(format!("{}_vhost", ns.get_str("vhost_name")?))
    })?;

    // --- Environment ---
    let root_dir_name = if dedicated_user.is_some() {
        "src".to_string()
    } else {
        alias.to_lowercase()
    };
    ns.set_default("root_dir", join(&workspace, &[root_dir_name.as_str()]));
    let root_dir = ns.get_str("root_dir")?.to_string();

    ns.set_default(
        "virtual_env_dir",
        if dedicated_user.is_some() {
            join(&workspace, &["vpython"])
        } else {
            root_dir.clone()
        },
    );
    let venv = ns.get_str("virtual_env_dir")?.to_string();

    ns.set_default("python_version", facts.python_version.clone());
    ns.set_default_with("python_lib_path", |ns| {
        let lib = format!("python{}", ns.get_str("python_version")?);
        Ok::<_, NamespaceError>(join(&venv, &["lib", lib.as_str(), "site-packages"]))
    })?;
    ns.set_default("project_env_script", join(&root_dir, &["project-env"]));
    ns.set_default("python_bin", join(&venv, &["bin", "python"]));

    // --- Network ---
    let root_host = ns.get_str("root_host")?.to_string();
    ns.set_default("hostname", format!("{}.{}", flat_alias, root_host));
    let hostname = ns.get_str("hostname")?.to_string();
    ns.set_default(
        "app_server_hostname",
        if scheme == DeploymentScheme::Cherrypy {
            hostname.clone()
        } else {
            "127.0.0.1".to_string()
        },
    );

    if ns.is_unset("port") {
        ns.set("port", ports.acquire(&format!("{}-web", alias), None)?);
    }
    if ns.is_unset("zeo_port") {
        ns.set("zeo_port", ports.acquire(&format!("{}-db", alias), None)?);
    }
    if ns.get_bool("cache_enabled")? && ns.is_unset("cache_server_port") {
        ns.set(
            "cache_server_port",
            ports.acquire(&format!("{}-cache", alias), None)?,
        );
    }
    ns.set_default_with("app_server_host", |ns| {
        Ok(format!(
            "{}:{}",
            ns.get_str("app_server_hostname")?,
            ns.get_port("port")?
        ))
    })?;

    // --- Libraries ---
    if ns.is_unset("cocktail_version") {
        let release = ns.get_str("woost_release_number")?.to_string();
        let cocktail = cocktail_version_for(&release)
            .ok_or(DerivationError::UnknownCocktailVersion(release))?;
        ns.set("cocktail_version", cocktail);
    }

    ns.set_default("cocktail_outer_dir", join(&root_dir, &["cocktail"]));
    ns.set_default_with("cocktail_dir", |ns| {
        Ok(join(ns.get_str("cocktail_outer_dir")?, &["cocktail"]))
    })?;
    ns.set_default("woost_outer_dir", join(&root_dir, &["woost"]));
    ns.set_default_with("woost_dir", |ns| {
        Ok(join(ns.get_str("woost_outer_dir")?, &["woost"]))
    })?;

    // --- Project ---
    ns.set_default("project_outer_dir", join(&root_dir, &[website.to_lowercase().as_str()]));
    ns.set_default_with("project_dir", |ns| {
        Ok(join(ns.get_str("project_outer_dir")?, &package_parts))
    })?;
    let project_dir = ns.get_str("project_dir")?.to_string();
    ns.set_default("project_scripts_dir", join(&project_dir, &["scripts"]));
    ns.set_default("static_dir", join(&project_dir, &["static"]));

    // --- Database and maintenance ---
    ns.set_default("zeo_service_name", format!("{}-zeo", alias));
    ns.set_default(
        "backup_dir",
        match &dedicated_user {
            Some(user) => join("/home", &[user.as_str(), "backups"]),
            None => join(&root_dir, &["backups"]),
        },
    );

    // --- Apache ---
    let vhost_file = join("/etc/apache2/sites-available", &[ns.get_str("vhost_name")?]);
    if facts.has_apache_2_4() {
        ns.set_default("apache_vhost_file", format!("{}.conf", vhost_file));

        if ns.get_bool("lets_encrypt")? {
            let (key, certificate) = if facts.apache_patch_level() >= 8 {
                ("privkey.pem", "fullchain.pem")
            } else {
                ("cert.pem", "chain.pem")
            };
            let live = join("/etc/letsencrypt/live", &[hostname.as_str()]);
            ns.set_default("vhost_ssl_private_key_file", join(&live, &[key]));
            ns.set_default("vhost_ssl_certificate_file", join(&live, &[certificate]));
        }
    } else if scheme == DeploymentScheme::Cherrypy {
        ns.set_default("apache_vhost_file", vhost_file);
    } else {
        return Err(DerivationError::ApacheRequired);
    }

    let log_path = |name: &str| match &dedicated_user {
        Some(user) => join("/home", &[user.as_str(), "logs", "apache2", format!("{}.log", name).as_str()]),
        None => join("/var/log/apache2", &[format!("{}-{}.log", alias, name).as_str()]),
    };
    ns.set_default("apache_access_log", log_path("access"));
    ns.set_default("apache_error_log", log_path("error"));
    ns.set_default("mod_wsgi_access_log", log_path("app-access"));
    ns.set_default("mod_wsgi_error_log", log_path("app-error"));
    ns.set_default_with("mod_wsgi_log_format", |ns| {
        ns.get_str("apache_log_format").map(str::to_string)
    })?;

    // --- mod_wsgi ---
    if scheme.is_wsgi() {
        ns.set_default("mod_wsgi_daemon_name", alias.clone());
        ns.set_default("mod_wsgi_daemon_display_name", alias.clone());
        ns.set_default(
            "mod_wsgi_daemon_user",
            dedicated_user.clone().unwrap_or_else(|| facts.user.clone()),
        );
        let daemon_user = ns.get_str("mod_wsgi_daemon_user")?.to_string();
        ns.set_default("mod_wsgi_daemon_group", daemon_user.clone());
        ns.set_default(
            "mod_wsgi_daemon_python_eggs",
            join("/home", &[daemon_user.as_str(), ".python-eggs"]),
        );
        ns.set_default("mod_wsgi_process_group", alias.clone());
        ns.set_default("mod_wsgi_application_group", alias.clone());

        if scheme == DeploymentScheme::ModWsgiExpress {
            let server_base = if dedicated_user.is_some() {
                workspace.clone()
            } else {
                root_dir.clone()
            };
            ns.set_default("mod_wsgi_express_service_name", format!("{}-httpd", alias));
            ns.set_default("mod_wsgi_express_root", join(&server_base, &["httpd"]));

            if ns.get_bool("cache_enabled")? {
                ns.set_default(
                    "mod_wsgi_express_cacheserver_service_name",
                    format!("{}-cache-httpd", alias),
                );
                ns.set_default(
                    "mod_wsgi_express_cacheserver_root",
                    join(&server_base, &["cache-httpd"]),
                );
            }
        }
    }

    // --- Launcher ---
    ns.set_default("terminal_profile", alias.clone());
    ns.set_default("launcher_dir", join(&root_dir, &["launcher"]));
    let launcher_dir = ns.get_str("launcher_dir")?.to_string();
    ns.set_default("launcher_script", join(&launcher_dir, &["launch"]));
    ns.set_default("launcher_tab_script", join(&launcher_dir, &["tab"]));

    ns.set_default_with("launcher_terminal_tab_parameters", |ns| {
        let profile = ns.get_str("terminal_profile")?;
        let parameters: Vec<String> = templates::launcher_tabs(ns)?
            .iter()
            .map(|tab| {
                format!(
                    "--tab --profile {} --command=\"$LAUNCHER/tab-{}\"",
                    profile, tab.key
                )
            })
            .collect();
        Ok(parameters.join("\\\n\t"))
    })?;

    let desktop_home = match &dedicated_user {
        Some(user) => join("/home", &[user.as_str()]),
        None => facts.home.display().to_string(),
    };
    ns.set_default(
        "desktop_file",
        join(
            &desktop_home,
            &[".local", "share", "applications", format!("{}.desktop", flat_alias).as_str()],
        ),
    );

    log::debug!(
        "Derived settings for '{}': project at '{}', log dir '{}'.",
        alias,
        project_dir,
        dir_of(ns.get_str("apache_access_log")?)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::presets::apply_presets;
    use std::fs;
    use tempfile::tempdir;

    fn facts() -> HostFacts {
        HostFacts {
            hostname: "devbox".to_string(),
            user: "tester".to_string(),
            home: PathBuf::from("/home/tester"),
            apache_version: Some(vec![2, 4, 41]),
            python_version: "3.8".to_string(),
            workspace_env: Some("/home/tester/projects".to_string()),
            root_host_env: None,
            installation_id_env: None,
        }
    }

    fn namespace(website: &str, environment: &str) -> Namespace {
        let mut ns = Namespace::with_defaults();
        ns.set("website", website);
        ns.set("environment", environment);
        apply_presets(&mut ns).unwrap();
        ns
    }

    #[test]
    fn test_derive_development_defaults() {
        let dir = tempdir().unwrap();
        let ports = PortRegistry::new(dir.path().join("ports"));
        let mut ns = namespace("Acme.Site", "development");
        derive(&mut ns, &facts(), &ports).unwrap();

        assert_eq!(ns.get_str("alias").unwrap(), "Acme.Site");
        assert_eq!(ns.get_str("package").unwrap(), "acme.site");
        assert_eq!(ns.get_str("flat_website_alias").unwrap(), "acme_site");
        assert_eq!(ns.get_str("hostname").unwrap(), "acme_site.localhost");
        assert_eq!(ns.get_str("root_dir").unwrap(), "/home/tester/projects/acme.site");
        assert_eq!(ns.get_str("virtual_env_dir").unwrap(), "/home/tester/projects/acme.site");
        assert_eq!(
            ns.get_str("project_dir").unwrap(),
            "/home/tester/projects/acme.site/acme.site/acme/site"
        );
        assert_eq!(
            ns.get_str("python_lib_path").unwrap(),
            "/home/tester/projects/acme.site/lib/python3.8/site-packages"
        );
        assert_eq!(ns.get_list("namespace_package_list").unwrap(), vec!["acme".to_string()]);
        assert_eq!(ns.get_str("installation_id").unwrap(), "devbox");
        assert_eq!(ns.get_str("woost_dependency_specifier").unwrap(), "==3.0.*");
        assert_eq!(ns.get_str("cocktail_version").unwrap(), "2.0.dev");
        assert_eq!(ns.get_port("port").unwrap(), 14001);
        assert_eq!(ns.get_port("zeo_port").unwrap(), 14002);
        assert_eq!(ns.get_str("app_server_host").unwrap(), "127.0.0.1:14001");
        assert_eq!(
            ns.get_str("apache_vhost_file").unwrap(),
            "/etc/apache2/sites-available/acme_site.conf"
        );
        assert_eq!(
            ns.get_str("apache_access_log").unwrap(),
            "/var/log/apache2/Acme.Site-access.log"
        );
        assert_eq!(
            ns.get_str("desktop_file").unwrap(),
            "/home/tester/.local/share/applications/acme_site.desktop"
        );
        assert!(ns.is_unset("mod_wsgi_daemon_user"));
    }

    #[test]
    fn test_derive_is_idempotent() {
        let dir = tempdir().unwrap();
        let ports = PortRegistry::new(dir.path().join("ports"));
        let mut ns = namespace("shop", "production");
        ns.set("cache_enabled", true);
        ns.set("lets_encrypt", true);

        derive(&mut ns, &facts(), &ports).unwrap();
        let once = ns.clone();
        derive(&mut ns, &facts(), &ports).unwrap();
        assert_eq!(ns, once);

        // Ports were acquired only once.
        assert_eq!(ports.entries().unwrap().len(), 3);
    }

    #[test]
    fn test_derive_for_dedicated_user_in_production() {
        let dir = tempdir().unwrap();
        let ports = PortRegistry::new(dir.path().join("ports"));
        let mut ns = namespace("shop", "production");
        ns.set("dedicated_user", "shopweb");
        ns.set("lets_encrypt", true);
        ns.set("root_host", "example.com");
        derive(&mut ns, &facts(), &ports).unwrap();

        assert_eq!(ns.get_str("workspace").unwrap(), "/home/shopweb");
        assert_eq!(ns.get_str("root_dir").unwrap(), "/home/shopweb/src");
        assert_eq!(ns.get_str("virtual_env_dir").unwrap(), "/home/shopweb/vpython");
        assert_eq!(ns.get_str("backup_dir").unwrap(), "/home/shopweb/backups");
        assert_eq!(ns.get_str("mod_wsgi_daemon_user").unwrap(), "shopweb");
        assert_eq!(ns.get_str("mod_wsgi_express_root").unwrap(), "/home/shopweb/httpd");
        assert_eq!(ns.get_str("mod_wsgi_express_service_name").unwrap(), "shop-httpd");
        assert_eq!(
            ns.get_str("apache_error_log").unwrap(),
            "/home/shopweb/logs/apache2/error.log"
        );
        assert_eq!(
            ns.get_str("vhost_ssl_certificate_file").unwrap(),
            "/etc/letsencrypt/live/shop.example.com/fullchain.pem"
        );
        assert_eq!(
            ns.get_str("desktop_file").unwrap(),
            "/home/shopweb/.local/share/applications/shop.desktop"
        );
    }

    #[test]
    fn test_explicit_values_are_kept() {
        let dir = tempdir().unwrap();
        let ports_file = dir.path().join("ports");
        fs::write(&ports_file, "other-web 14500\n").unwrap();
        let ports = PortRegistry::new(&ports_file);

        let mut ns = namespace("blog", "development");
        ns.set("port", 8080_i64);
        ns.set("hostname", "blog.test");
        ns.set("alias", "myblog");
        derive(&mut ns, &facts(), &ports).unwrap();

        assert_eq!(ns.get_port("port").unwrap(), 8080);
        assert_eq!(ns.get_port("zeo_port").unwrap(), 14501);
        assert_eq!(ns.get_str("hostname").unwrap(), "blog.test");
        assert_eq!(ns.get_str("zeo_service_name").unwrap(), "myblog-zeo");
    }

    #[test]
    fn test_missing_workspace_is_fatal() {
        let dir = tempdir().unwrap();
        let ports = PortRegistry::new(dir.path().join("ports"));
        let mut ns = namespace("blog", "development");
        let facts = HostFacts {
            workspace_env: None,
            ..facts()
        };
        assert!(matches!(
            derive(&mut ns, &facts, &ports),
            Err(DerivationError::MissingWorkspace)
        ));
    }

    #[test]
    fn test_apache_2_4_is_required_unless_cherrypy() {
        let dir = tempdir().unwrap();
        let ports = PortRegistry::new(dir.path().join("ports"));
        let facts = HostFacts {
            apache_version: None,
            ..facts()
        };

        let mut ns = namespace("blog", "development");
        assert!(matches!(
            derive(&mut ns, &facts, &ports),
            Err(DerivationError::ApacheRequired)
        ));

        let mut ns = namespace("blog", "development");
        ns.set("deployment_scheme", "cherrypy");
        derive(&mut ns, &facts, &ports).unwrap();
        assert_eq!(
            ns.get_str("apache_vhost_file").unwrap(),
            "/etc/apache2/sites-available/blog"
        );
        assert_eq!(ns.get_str("app_server_hostname").unwrap(), "blog.localhost");
    }

    #[test]
    fn test_source_repository_rewrites_remote_locations() {
        assert_eq!(
            source_repository_for("/srv/sites/", "Blog"),
            "/srv/sites/blog"
        );
        assert_eq!(
            source_repository_for("deploy@server:/srv/sites", "Blog"),
            "ssh://deploy@server//srv/sites/blog"
        );
    }

    #[test]
    fn test_cocktail_version_lookup() {
        assert_eq!(cocktail_version_for("3.0"), Some("2.0.dev"));
        assert_eq!(cocktail_version_for("3.0.4"), Some("2.0.dev"));
        assert_eq!(cocktail_version_for("2.1"), None);
        assert_eq!(release_number("3.0.dev"), "3.0");
        assert_eq!(release_number("3.0.4"), "3.0.4");
    }
}
