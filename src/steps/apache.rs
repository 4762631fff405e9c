// src/steps/apache.rs

//! Apache virtual hosts, their logs and certificates, and the standalone
//! mod_wsgi_express servers.

use super::InstallContext;
use crate::core::templates::{
    self, MOD_WSGI_EXPRESS_CACHESERVER_SERVICE, MOD_WSGI_EXPRESS_SERVICE,
};
use crate::models::DeploymentScheme;
use crate::system::console;
use crate::system::executor::CommandLine;
use crate::system::ops;
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::Path;

/// Apache's own log directory, already rotated by the distribution.
const APACHE_LOG_DIR: &str = "/var/log/apache2";

fn deployment_scheme(ctx: &InstallContext) -> Result<DeploymentScheme> {
    Ok(ctx.namespace.get_enum("deployment_scheme")?)
}

/// Directories holding the site's log files.
fn log_dirs(ctx: &InstallContext, scheme: DeploymentScheme) -> Result<BTreeSet<String>> {
    let mut keys = vec!["apache_access_log", "apache_error_log"];
    if scheme == DeploymentScheme::ModWsgi {
        keys.extend(["mod_wsgi_access_log", "mod_wsgi_error_log"]);
    }

    let mut dirs = BTreeSet::new();
    for key in keys {
        if let Some(dir) = Path::new(ctx.namespace.get_str(key)?).parent() {
            dirs.insert(dir.display().to_string());
        }
    }
    Ok(dirs)
}

pub fn configure_apache(ctx: &mut InstallContext) -> Result<()> {
    let scheme = deployment_scheme(ctx)?;
    if scheme == DeploymentScheme::Cherrypy {
        return Ok(());
    }
    let host = ctx.host();

    if scheme == DeploymentScheme::ModWsgi {
        let eggs = ctx.path("mod_wsgi_daemon_python_eggs")?;
        if !host.exists(&eggs) {
            console::heading("Creating and securing the eggs folder for mod_wsgi");
            host.create_dir_all(&eggs)?;
            host.set_mode(&eggs, 0o755)?;
        }
    }

    console::heading("Configuring Apache logs");
    let dirs = log_dirs(ctx, scheme)?;
    for dir in &dirs {
        ops::sudo(host, "mkdir", ["-p", dir.as_str()])?;
        ops::sudo(host, "chown", ["root:root", dir.as_str()])?;
        ops::sudo(host, "chmod", ["755", dir.as_str()])?;
    }

    let rotated: Vec<&String> = dirs.iter().filter(|dir| *dir != APACHE_LOG_DIR).collect();
    let alias = ctx.namespace.get_str("alias")?;
    ops::sudo_write(
        host,
        &ctx.logrotate_dir.join(alias),
        &templates::render_logrotate(&rotated),
    )?;

    console::heading("Configuring the site's Apache virtual host");
    ops::sudo_write(
        host,
        &ctx.path("apache_vhost_file")?,
        &templates::render_vhost(&ctx.namespace, false)?,
    )?;
    ops::sudo(host, "a2ensite", [ctx.namespace.get_str("vhost_name")?])?;
    ops::reload_apache(host)?;
    Ok(())
}

pub fn obtain_lets_encrypt_certificate(ctx: &mut InstallContext) -> Result<()> {
    if !ctx.namespace.get_bool("lets_encrypt")? {
        return Ok(());
    }
    console::heading("Obtaining Lets Encrypt SSL certificate");
    ops::sudo(
        ctx.host(),
        "certbot",
        [
            "certonly",
            "--webroot",
            "-d",
            ctx.namespace.get_str("hostname")?,
            "-w",
            ctx.namespace.get_str("static_dir")?,
        ],
    )?;
    Ok(())
}

pub fn configure_apache_https(ctx: &mut InstallContext) -> Result<()> {
    if ctx.namespace.is_unset("vhost_ssl_private_key_file")
        || ctx.namespace.is_unset("vhost_ssl_certificate_file")
    {
        return Ok(());
    }
    console::heading("Configuring the site's Apache virtual host for HTTPS");
    ops::sudo_write(
        ctx.host(),
        &ctx.path("apache_vhost_file")?,
        &templates::render_vhost(&ctx.namespace, true)?,
    )?;
    ops::reload_apache(ctx.host())?;
    Ok(())
}

/// A `mod_wsgi-express` server installed as an init service.
struct ExpressServer {
    script: &'static str,
    root: &'static str,
    port: &'static str,
    service_name: &'static str,
    service_template: &'static str,
}

const APP_SERVER: ExpressServer = ExpressServer {
    script: "wsgiapp.py",
    root: "mod_wsgi_express_root",
    port: "port",
    service_name: "mod_wsgi_express_service_name",
    service_template: MOD_WSGI_EXPRESS_SERVICE,
};

const CACHE_SERVER: ExpressServer = ExpressServer {
    script: "cacheserver.py",
    root: "mod_wsgi_express_cacheserver_root",
    port: "cache_server_port",
    service_name: "mod_wsgi_express_cacheserver_service_name",
    service_template: MOD_WSGI_EXPRESS_CACHESERVER_SERVICE,
};

fn setup_express_server(
    ctx: &InstallContext,
    server: &ExpressServer,
    processes: String,
    threads: String,
    maximum_requests: Option<String>,
) -> Result<()> {
    let ns = &ctx.namespace;
    ctx.pip_install(["mod_wsgi"])?;

    let express = ctx.path("virtual_env_dir")?.join("bin").join("mod_wsgi-express");
    let script = ctx.path("project_scripts_dir")?.join(server.script);
    let static_dir = ns.get_str("static_dir")?;
    let user = ns.get_str("mod_wsgi_daemon_user")?;

    let mut command = CommandLine::new(express.display().to_string())
        .arg("setup-server")
        .arg(script.display().to_string())
        .args(["--server-name", ns.get_str("hostname")?])
        .arg("--allow-localhost")
        .args(["--server-root", ns.get_str(server.root)?])
        .args(["--working-directory", static_dir])
        .args(["--document-root", static_dir])
        .arg("--port")
        .arg(ns.get_port(server.port)?.to_string())
        .args(["--user", user, "--group", user])
        .arg("--processes")
        .arg(processes)
        .arg("--threads")
        .arg(threads)
        .args(["--python-path", ns.get_str("python_lib_path")?]);
    if let Some(maximum_requests) = maximum_requests {
        command = command.arg("--maximum-requests").arg(maximum_requests);
    }
    ctx.host.run(&command.arg("--setup-only"))?;

    let name = ns.get_str(server.service_name)?;
    ops::create_service(ctx.host(), name, &ctx.render(server.service_template)?)?;
    ops::start_service(ctx.host(), name)?;
    Ok(())
}

pub fn configure_mod_wsgi_express(ctx: &mut InstallContext) -> Result<()> {
    if deployment_scheme(ctx)? != DeploymentScheme::ModWsgiExpress {
        return Ok(());
    }
    console::heading("Setting up a mod-wsgi-express server");
    let ns = &ctx.namespace;
    setup_express_server(
        ctx,
        &APP_SERVER,
        ns.get_int("mod_wsgi_daemon_processes")?.to_string(),
        ns.get_int("mod_wsgi_daemon_threads")?.to_string(),
        Some(ns.get_int("mod_wsgi_daemon_maximum_requests")?.to_string()),
    )
}

pub fn configure_mod_wsgi_express_cache_server(ctx: &mut InstallContext) -> Result<()> {
    if !ctx.namespace.get_bool("cache_enabled")?
        || deployment_scheme(ctx)? != DeploymentScheme::ModWsgiExpress
    {
        return Ok(());
    }
    console::heading("Setting up a mod-wsgi-express cache server");
    setup_express_server(
        ctx,
        &CACHE_SERVER,
        "1".to_string(),
        ctx.namespace.get_int("cache_server_threads")?.to_string(),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::Value;
    use crate::steps::testing::fixture;

    #[test]
    fn test_cherrypy_needs_no_apache() {
        let mut fx = fixture(&[("deployment_scheme", Value::from("cherrypy"))]);
        configure_apache(&mut fx.context).unwrap();
        assert!(fx.commands().is_empty());
    }

    #[test]
    fn test_configure_apache_for_mod_rewrite() {
        let mut fx = fixture(&[]);
        configure_apache(&mut fx.context).unwrap();

        assert_eq!(
            fx.commands(),
            vec![
                "sudo mkdir -p /var/log/apache2",
                "sudo chown root:root /var/log/apache2",
                "sudo chmod 755 /var/log/apache2",
                "sudo a2ensite acme",
                "sudo service apache2 reload",
            ]
        );
        let logrotate = fx.context.logrotate_dir.join("Acme");
        assert_eq!(fx.elevated_file(&logrotate).unwrap(), "");

        let vhost = fx
            .elevated_file(Path::new("/etc/apache2/sites-available/acme.conf"))
            .unwrap();
        assert!(vhost.contains("ServerName acme.localhost"));
        assert!(!vhost.contains(":443"));
    }

    #[test]
    fn test_dedicated_user_logs_are_rotated() {
        let mut fx = fixture(&[]);
        fx.context.namespace.set("apache_access_log", "/home/acme/logs/apache2/access.log");
        fx.context.namespace.set("apache_error_log", "/home/acme/logs/apache2/error.log");
        configure_apache(&mut fx.context).unwrap();

        let logrotate = fx.elevated_file(&fx.context.logrotate_dir.join("Acme")).unwrap();
        assert!(logrotate.starts_with("/home/acme/logs/apache2/*.log {"));
        assert_eq!(fx.commands()[0], "sudo mkdir -p /home/acme/logs/apache2");
    }

    #[test]
    fn test_https_vhost_requires_certificate_settings() {
        let mut fx = fixture(&[]);
        configure_apache_https(&mut fx.context).unwrap();
        assert!(fx.commands().is_empty());

        let mut fx = fixture(&[("lets_encrypt", Value::from(true))]);
        obtain_lets_encrypt_certificate(&mut fx.context).unwrap();
        configure_apache_https(&mut fx.context).unwrap();

        let static_dir = fx.path("static_dir").display().to_string();
        assert_eq!(
            fx.commands(),
            vec![
                format!("sudo certbot certonly --webroot -d acme.localhost -w {}", static_dir),
                "sudo service apache2 reload".to_string(),
            ]
        );
        let vhost = fx
            .elevated_file(Path::new("/etc/apache2/sites-available/acme.conf"))
            .unwrap();
        assert!(vhost.contains("/etc/letsencrypt/live/acme.localhost/fullchain.pem"));
    }

    #[test]
    fn test_mod_wsgi_express_servers() {
        let mut fx = fixture(&[
            ("deployment_scheme", Value::from("mod_wsgi_express")),
            ("cache_enabled", Value::from(true)),
        ]);
        configure_mod_wsgi_express(&mut fx.context).unwrap();
        let commands = fx.commands();
        assert!(commands[0].ends_with("/bin/pip install mod_wsgi"));
        assert!(commands[1].contains("setup-server"));
        assert!(commands[1].contains("--port 14001 --user tester --group tester"));
        assert!(commands[1].ends_with("--maximum-requests 5000 --setup-only"));
        assert_eq!(commands.last().unwrap(), "sudo /etc/init.d/Acme-httpd start");

        fx.clear_commands();
        configure_mod_wsgi_express_cache_server(&mut fx.context).unwrap();
        let commands = fx.commands();
        assert!(commands[1].contains("cacheserver.py"));
        assert!(commands[1].contains("--processes 1 --threads 20"));
        assert!(!commands[1].contains("--maximum-requests"));
        let service = fx
            .elevated_file(Path::new("/etc/init.d/Acme-cache-httpd"))
            .unwrap();
        assert!(service.ends_with("cache-httpd/apachectl $1"));
    }

    #[test]
    fn test_cache_server_needs_mod_wsgi_express() {
        let mut fx = fixture(&[("cache_enabled", Value::from(true))]);
        configure_mod_wsgi_express_cache_server(&mut fx.context).unwrap();
        configure_mod_wsgi_express(&mut fx.context).unwrap();
        assert!(fx.commands().is_empty());
    }
}
