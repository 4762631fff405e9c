// src/core/features.rs

//! # Feature Registry
//!
//! Optional, versioned OS-level capabilities (package sets, apache modules, repository
//! sources). Each feature persists its installed version in a marker file under the
//! host-wide configuration directory:
//!
//! | Marker | Meaning |
//! |---|---|
//! | absent, unreadable or `0` | never installed |
//! | `N` | installed at version `N` |
//! | `-1` | disabled: never installed automatically |

use crate::core::namespace::{Namespace, NamespaceError};
use crate::core::paths;
use crate::models::{DeploymentScheme, LauncherMode};
use crate::system::console;
use crate::system::host::{Host, HostError};
use crate::system::ops;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Marker value of a disabled feature.
pub const DISABLED: i32 = -1;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("Unknown feature '{0}'.")]
    Unknown(String),
    #[error("Could not install feature '{id}': {source}")]
    Install {
        id: &'static str,
        #[source]
        source: HostError,
    },
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
}

/// Extra work a feature does after its packages are installed.
pub type PostInstall = fn(&dyn Host) -> Result<(), HostError>;

#[derive(Debug)]
pub struct Feature {
    pub id: &'static str,
    pub description: &'static str,
    pub installed_by_default: bool,
    pub version: i32,
    pub packages: &'static [&'static str],
    pub python_packages: &'static [&'static str],
    pub repositories: &'static [&'static str],
    pub apache_modules: &'static [&'static str],
    pub post_install: Option<PostInstall>,
    /// A path that must exist for the feature to be usable on this host.
    pub requires_path: Option<&'static str>,
}

impl Feature {
    const BASE: Self = Self {
        id: "",
        description: "",
        installed_by_default: false,
        version: 1,
        packages: &[],
        python_packages: &[],
        repositories: &[],
        apache_modules: &[],
        post_install: None,
        requires_path: None,
    };

    pub fn is_supported(&self, host: &dyn Host) -> bool {
        self.requires_path
            .is_none_or(|path| host.exists(Path::new(path)))
    }

    /// Reads the marker file. Anything unreadable counts as never installed.
    pub fn installed_version(&self, host: &dyn Host, config_dir: &Path) -> i32 {
        let marker = paths::feature_marker(config_dir, self.id);
        match host.read_file(&marker) {
            Ok(Some(content)) => content.trim().parse().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                log::warn!("Could not read '{}': {}", marker.display(), e);
                0
            }
        }
    }

    pub fn is_disabled(&self, host: &dyn Host, config_dir: &Path) -> bool {
        self.installed_version(host, config_dir) == DISABLED
    }

    pub fn needs_update(&self, host: &dyn Host, config_dir: &Path) -> bool {
        let installed = self.installed_version(host, config_dir);
        installed != DISABLED && installed < self.version
    }

    /// Installs the feature if it is neither disabled nor current.
    /// Returns the previously installed version and, if installed now, the new one.
    pub fn update(&self, host: &dyn Host, config_dir: &Path) -> Result<(i32, Option<i32>), FeatureError> {
        ops::require_config_dir(host, config_dir)?;

        let installed = self.installed_version(host, config_dir);
        if installed == DISABLED || installed >= self.version {
            log::debug!("Feature '{}' is up to date (marker {}).", self.id, installed);
            return Ok((installed, None));
        }

        self.install(host).map_err(|e| FeatureError::Install {
            id: self.id,
            source: e,
        })?;
        self.write_marker(host, config_dir, self.version)?;
        Ok((installed, Some(self.version)))
    }

    /// Clears a disabled marker, then installs the feature if it is not current.
    pub fn enable(&self, host: &dyn Host, config_dir: &Path) -> Result<(i32, Option<i32>), FeatureError> {
        ops::require_config_dir(host, config_dir)?;
        if self.is_disabled(host, config_dir) {
            log::info!("Re-enabling feature '{}'.", self.id);
            self.write_marker(host, config_dir, 0)?;
        }
        self.update(host, config_dir)
    }

    pub fn disable(&self, host: &dyn Host, config_dir: &Path) -> Result<(), FeatureError> {
        ops::require_config_dir(host, config_dir)?;
        self.write_marker(host, config_dir, DISABLED)
    }

    fn write_marker(&self, host: &dyn Host, config_dir: &Path, value: i32) -> Result<(), FeatureError> {
        let marker = paths::feature_marker(config_dir, self.id);
        ops::sudo_write(host, &marker, &value.to_string())?;
        Ok(())
    }

    fn install(&self, host: &dyn Host) -> Result<(), HostError> {
        console::heading(&format!("Installing feature {}", self.id));

        if !self.repositories.is_empty() {
            ops::install_packages(host, &["software-properties-common"])?;
            for repository in self.repositories {
                ops::install_repository(host, repository)?;
            }
        }

        ops::install_packages(host, self.packages)?;

        for package in self.python_packages {
            ops::install_python_package(host, package)?;
        }

        if !self.apache_modules.is_empty() {
            for module in self.apache_modules {
                ops::enable_apache_module(host, module)?;
            }
            ops::restart_apache(host)?;
        }

        if let Some(post_install) = self.post_install {
            post_install(host)?;
        }
        Ok(())
    }
}

// --- Post-install hooks ---

fn secure_eggs_folder(host: &dyn Host) -> Result<(), HostError> {
    let home = match host.identity() {
        Some(identity) => identity.home.clone(),
        None => host.invoking_user()?.home,
    };
    let eggs = home.join(".python-eggs");
    if host.exists(&eggs) {
        host.set_mode(&eggs, 0o744)?;
    }
    Ok(())
}

const LETS_ENCRYPT_ARCHIVE: &str = "/etc/letsencrypt/archive";
const LETS_ENCRYPT_RENEWAL_SCRIPT: &str = "/etc/cron.weekly/lets-encrypt-renewal";

fn configure_lets_encrypt(host: &dyn Host) -> Result<(), HostError> {
    // Apache fails to start if it can't traverse the certificate archive.
    ops::sudo(host, "mkdir", ["-p", LETS_ENCRYPT_ARCHIVE])?;
    ops::sudo(host, "chmod", ["755", LETS_ENCRYPT_ARCHIVE])?;

    ops::sudo_write(
        host,
        Path::new(LETS_ENCRYPT_RENEWAL_SCRIPT),
        "#!/bin/bash\n/usr/bin/certbot renew\n",
    )?;
    ops::sudo(host, "chmod", ["755", LETS_ENCRYPT_RENEWAL_SCRIPT])
}

// --- The registry ---

pub static FEATURES: &[Feature] = &[
    Feature {
        id: "core3",
        description: "Basic packages required to install Woost projects.",
        installed_by_default: true,
        packages: &[
            "build-essential",
            "python3-dev",
            "python3-pip",
            "python3-setuptools",
            "python3-pil",
            "libxml2-dev",
            "libxslt1-dev",
            "lib32z1-dev",
        ],
        post_install: Some(secure_eggs_folder),
        ..Feature::BASE
    },
    Feature {
        id: "pdfrenderer",
        description: "Generate thumbnails for PDF files.",
        installed_by_default: true,
        packages: &["ghostscript"],
        ..Feature::BASE
    },
    Feature {
        id: "apache",
        description: "Serve Woost websites with the Apache webserver.",
        packages: &["apache2"],
        apache_modules: &["rewrite", "proxy", "proxy_http", "macro", "expires"],
        ..Feature::BASE
    },
    Feature {
        id: "modwsgi",
        description: "Deploy using mod_wsgi",
        packages: &["libapache2-mod-wsgi"],
        apache_modules: &["wsgi"],
        ..Feature::BASE
    },
    Feature {
        id: "modwsgiexpress",
        description: "Deploy using mod_wsgi_express",
        packages: &["apache2-dev"],
        ..Feature::BASE
    },
    Feature {
        id: "letsencrypt",
        description: "Obtain and renew free SSL certificates",
        repositories: &["ppa:certbot/certbot"],
        packages: &["python-certbot-apache"],
        apache_modules: &["headers", "ssl"],
        post_install: Some(configure_lets_encrypt),
        ..Feature::BASE
    },
    Feature {
        id: "mercurial",
        description: "Create Mercurial repositories for Woost projects",
        packages: &["mercurial"],
        ..Feature::BASE
    },
    Feature {
        id: "launcher",
        description: "Create desktop launchers for Woost projects",
        packages: &["xtitle", "gnome-terminal"],
        requires_path: Some("/usr/bin/X"),
        ..Feature::BASE
    },
];

pub fn find_feature(id: &str) -> Result<&'static Feature, FeatureError> {
    FEATURES
        .iter()
        .find(|f| f.id == id)
        .ok_or_else(|| FeatureError::Unknown(id.to_string()))
}

/// The features needed by an installation described by `namespace`, whose main
/// phase is `tasks`.
pub fn required_features(
    namespace: &Namespace,
    tasks: &[&str],
    host: &dyn Host,
) -> Result<Vec<&'static str>, FeatureError> {
    let mut required = vec!["core3"];

    let scheme: DeploymentScheme = namespace.get_enum("deployment_scheme")?;
    if scheme != DeploymentScheme::Cherrypy {
        required.push("apache");
        match scheme {
            DeploymentScheme::ModWsgi => required.push("modwsgi"),
            DeploymentScheme::ModWsgiExpress => required.push("modwsgiexpress"),
            _ => {}
        }
    }

    if namespace.get_bool("lets_encrypt")? {
        required.push("letsencrypt");
    }

    if tasks.contains(&"install_libs") || tasks.contains(&"create_mercurial_repository") {
        required.push("mercurial");
    }

    let launcher: LauncherMode = namespace.get_enum("launcher")?;
    let wants_launcher = match launcher {
        LauncherMode::Yes => true,
        LauncherMode::Auto => find_feature("launcher")?.is_supported(host),
        LauncherMode::No => false,
    };
    if wants_launcher {
        required.push("launcher");
    }

    Ok(required)
}

/// Updates the default features and then the required ones, each at most once.
pub fn update_features(
    host: &dyn Host,
    config_dir: &Path,
    required: &[&str],
) -> Result<Vec<&'static str>, FeatureError> {
    let mut updated: HashSet<&'static str> = HashSet::new();
    let mut order = Vec::new();

    let defaults = FEATURES.iter().filter(|f| f.installed_by_default);
    let requested = required
        .iter()
        .map(|id| find_feature(id))
        .collect::<Result<Vec<_>, _>>()?;

    for feature in defaults.chain(requested) {
        if updated.insert(feature.id) {
            feature.update(host, config_dir)?;
            order.push(feature.id);
        }
    }
    Ok(order)
}

/// The help text listing every feature, defaults marked with `*`.
pub fn describe_features() -> String {
    let mut text = String::from("Available features:\n\n");
    for feature in FEATURES {
        let label = format!(
            "{}{}:",
            feature.id,
            if feature.installed_by_default { "*" } else { "" }
        );
        text.push_str(&format!("  {:<22}{}\n", label, feature.description));
    }
    text.push_str(
        "\nFeatures marked with a * character are installed by default; other features will\nbe installed if needed.",
    );
    text
}
