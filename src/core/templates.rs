// src/core/templates.rs

//! The texts of every generated artifact, and the few compositions that stitch
//! several of them together (settings tail, virtual host variants, logrotate).
//!
//! Templates are written indented, like the code around them; see
//! [`normalize_indent`](crate::core::template::normalize_indent).

use crate::core::namespace::{Namespace, NamespaceError};
use crate::core::template::{
    self, always, include, normalize_indent, render_snippets, Snippet, TemplateError,
};
use crate::models::{DeploymentScheme, Environment, ZodbDeploymentScheme};

// --- Guards ---

fn is_development(ns: &Namespace) -> Result<bool, NamespaceError> {
    Ok(ns.get_enum::<Environment>("environment")? == Environment::Development)
}

fn is_production(ns: &Namespace) -> Result<bool, NamespaceError> {
    Ok(ns.get_enum::<Environment>("environment")? == Environment::Production)
}

fn cache_enabled(ns: &Namespace) -> Result<bool, NamespaceError> {
    ns.get_bool("cache_enabled")
}

fn uses_zeo_process(ns: &Namespace) -> Result<bool, NamespaceError> {
    Ok(ns.get_enum::<ZodbDeploymentScheme>("zodb_deployment_scheme")? == ZodbDeploymentScheme::Zeo)
}

fn serves_through_python(ns: &Namespace) -> Result<bool, NamespaceError> {
    Ok(!ns.get_enum::<DeploymentScheme>("deployment_scheme")?.is_wsgi())
}

fn runs_cache_server_manually(ns: &Namespace) -> Result<bool, NamespaceError> {
    Ok(cache_enabled(ns)? && serves_through_python(ns)?)
}

// --- Shell environment ---

pub const DEDICATED_USER_BASH_ALIASES: &str = r#"
    export WORKSPACE="--SETUP-WORKSPACE--"
    export WOOST_INSTALLATION_ID="--SETUP-INSTALLATION_ID--"
    source --SETUP-PROJECT_ENV_SCRIPT--
    "#;

pub const PROJECT_ENV: &str = r#"
    source --SETUP-VIRTUAL_ENV_DIR--/bin/activate
    export COCKTAIL=--SETUP-COCKTAIL_DIR--
    export WOOST=--SETUP-WOOST_DIR--
    export SITE=--SETUP-PROJECT_DIR--
    alias "site-shell=ipython --no-term-title -i --SETUP-PROJECT_DIR--/scripts/shell.py"
    alias "cml=python -m cocktail.html.templates.loader"
    "#;

// --- Python package ---

pub const SETUP_PY: &str = r#"
    from setuptools import setup, find_packages

    setup(
        name = "--SETUP-WEBSITE--",
        install_requires = [
            "woost--SETUP-WOOST_DEPENDENCY_SPECIFIER--"
        ],
        packages = find_packages(),
        include_package_data = True,
        namespace_packages = --SETUP-NAMESPACE_PACKAGE_LIST--,
        zip_safe = False
    )
    "#;

pub const NAMESPACE_PACKAGE_INIT: &str = "__import__('pkg_resources').declare_namespace(__name__)";

const SETTINGS: &str = r#"
    from woost import app
    app.package = "--SETUP-PACKAGE--"
    app.installation_id = "--SETUP-INSTALLATION_ID--"

    # Application server configuration
    import cherrypy
    cherrypy.config.update({
        "global": {
            ==SETUP-INCLUDE_CHERRYPY_GLOBAL_CONFIG==
        }
    })

    # Object store provider
    from cocktail.persistence import datastore
    from ZEO.ClientStorage import ClientStorage
    db_host = "127.0.0.1"
    db_port = --SETUP-ZEO_PORT--
    datastore.storage = lambda: ClientStorage((db_host, db_port))

    # Use file based sessions
    from cocktail.controllers import session
    session.config["session.type"] = "file"
    "#;

const CHERRYPY_GLOBAL_CONFIG: &[&str] = &[
    r#""server.socket_host": "--SETUP-APP_SERVER_HOSTNAME--""#,
    r#""server.socket_port": --SETUP-PORT--"#,
    r#""tools.encode.on": True"#,
    r#""tools.encode.encoding": "utf-8""#,
    r#""tools.decode.on": True"#,
    r#""tools.decode.encoding": "utf-8""#,
];

const SETTINGS_TAIL: &[Snippet] = &[
    Snippet::new(
        r#"
        # Always recompile SASS files
        from cocktail.controllers.filepublication import SASSPreprocessor
        SASSPreprocessor.ignore_cached_files = True
        "#,
        is_development,
    ),
    Snippet::new(
        r#"
        # Reload inlined SVG files if they are modified
        from cocktail.html import inlinesvg
        inlinesvg.cache.updatable = True
        "#,
        is_development,
    ),
    Snippet::new(
        r#"
        # Disable CML template reloading
        from cocktail.html import templates
        templates.get_loader().cache.updatable = False
        "#,
        is_production,
    ),
    Snippet::new(
        r#"
        # Cache
        from cocktail.caching import RESTCacheStorage
        cache_storage = RESTCacheStorage("http://localhost:--SETUP-CACHE_SERVER_PORT--")
        app.cache.storage = cache_storage
        app.cache.verbose = True

        from cocktail.html import rendering_cache
        rendering_cache.storage = cache_storage
        rendering_cache.verbose = True
        "#,
        cache_enabled,
    ),
];

/// The project's `settings.py`: the cherrypy configuration (base entries plus the
/// environment's extra entries) followed by the applicable environment snippets.
pub fn render_settings(ns: &Namespace) -> Result<String, TemplateError> {
    let mut global_config: Vec<String> = CHERRYPY_GLOBAL_CONFIG
        .iter()
        .map(|entry| (*entry).to_string())
        .collect();
    global_config.extend(ns.get_list("cherrypy_env_global_config")?);

    let mut text = normalize_indent(&include(
        SETTINGS,
        "INCLUDE_CHERRYPY_GLOBAL_CONFIG",
        &global_config.join(",\n"),
    ));

    let tail = render_snippets(SETTINGS_TAIL, ns)?;
    if !tail.is_empty() {
        text.push_str("\n\n");
        text.push_str(&tail);
    }
    text.push('\n');
    template::expand_vars(&text, ns)
}

// --- Scripts run inside the project's environment ---

pub const COPY_MIGRATION_SCRIPT: &str = r#"
    import --SETUP-PACKAGE--.settings
    from cocktail.persistence import migrate, datastore
    from woost import app
    from woost.models import Website, extensions_manager
    app.cache.enabled = False
    extensions_manager.import_extensions()
    migrate(True, True)
    Website.select()[0].hosts[0] = "--SETUP-HOSTNAME--"
    datastore.commit()
    "#;

pub const STATIC_PUBLICATION_SCRIPT: &str = r#"
    from --SETUP-PACKAGE--.scripts.shell import File, staticpublication
    for f in File.select():
        staticpublication.create_links(f)
    "#;

// --- Services ---

pub const ZEO_SERVICE_SCRIPT: &str = r#"
    #!/bin/bash
    ### BEGIN INIT INFO
    # Provides:            --SETUP-ALIAS--
    # Required-Start:      $remote_fs $syslog
    # Required-Stop:       $remote_fs $syslog
    # Should-Start:        $local_fs
    # Should-Stop:         $local_fs
    # Default-Start:       2 3 4 5
    # Default-Stop:        0 1 6
    # Short-Description:   Start zeo daemon
    # Description:         Start up zeo
    ### END INIT INFO

    DESC="--SETUP-ALIAS-- ZEO"
    NAME=--SETUP-ZEO_SERVICE_NAME--
    USER=--SETUP-ZEO_SERVICE_USER--
    SCRIPTNAME=/etc/init.d/$NAME
    RUNDIR=/var/run/$NAME
    echo=/bin/echo
    RUNZEO="--SETUP-VIRTUAL_ENV_DIR--/bin/runzeo --pid-file $RUNDIR/$NAME.pid -f --SETUP-PROJECT_DIR--/data/database.fs -a 127.0.0.1:--SETUP-ZEO_PORT--"
    ZEOCTL="--SETUP-VIRTUAL_ENV_DIR--/bin/zeoctl -d -s $RUNDIR/$NAME.socket -u $USER"

    if [ `id -u` = 0 ]; then

        mkdir -p $RUNDIR
        chown $USER $RUNDIR

        case "$1" in
          start)
                $echo -n "Starting $DESC: $NAME "
                $ZEOCTL -p "$RUNZEO" start
                $echo "."
                ;;
          stop)
                $echo -n "Stopping $DESC: $NAME "
                $ZEOCTL -p "$RUNZEO" stop
                echo "."
                ;;
          restart)
                $echo -n "Restarting $DESC: $NAME "
                $ZEOCTL -p "$RUNZEO" restart
                echo "."
                ;;
          *)
                $echo "Usage: $SCRIPTNAME {start|stop|restart}" >&2
                exit 1
                ;;
        esac
    else
            echo "You MUST be root to execute this command"
    fi
    "#;

pub const MOD_WSGI_EXPRESS_SERVICE: &str = r#"
    #!/bin/bash
    ### BEGIN INIT INFO
    # Provides:            --SETUP-MOD_WSGI_EXPRESS_SERVICE_NAME--
    # Required-Start:      $remote_fs $syslog
    # Required-Stop:       $remote_fs $syslog
    # Should-Start:        $local_fs
    # Should-Stop:         $local_fs
    # Default-Start:       2 3 4 5
    # Default-Stop:        0 1 6
    # Short-Description:   Start the Mod WSGI Express daemon for --SETUP-ALIAS--
    # Description:         Start the Mod WSGI Express daemon for --SETUP-ALIAS--
    ### END INIT INFO

    --SETUP-MOD_WSGI_EXPRESS_ROOT--/apachectl $1
    "#;

pub const MOD_WSGI_EXPRESS_CACHESERVER_SERVICE: &str = r#"
    #!/bin/bash
    ### BEGIN INIT INFO
    # Provides:            --SETUP-MOD_WSGI_EXPRESS_CACHESERVER_SERVICE_NAME--
    # Required-Start:      $remote_fs $syslog
    # Required-Stop:       $remote_fs $syslog
    # Should-Start:        $local_fs
    # Should-Stop:         $local_fs
    # Default-Start:       2 3 4 5
    # Default-Stop:        0 1 6
    # Short-Description:   Start the Mod WSGI Express daemon for the cache server of --SETUP-ALIAS--
    # Description:         Start the Mod WSGI Express daemon for the cache server of --SETUP-ALIAS--
    ### END INIT INFO

    --SETUP-MOD_WSGI_EXPRESS_CACHESERVER_ROOT--/apachectl $1
    "#;

// --- Maintenance cron scripts ---

pub const ZEO_PACK: &str = r#"
    #!/bin/bash
    PORT=--SETUP-ZEO_PORT--
    echo "Running zeopack on port $PORT"
    --SETUP-VIRTUAL_ENV_DIR--/bin/zeopack -h 127.0.0.1 -p $PORT -d --SETUP-ZEO_PACK_DAYS--
    echo "Done."
    sync
    "#;

pub const PURGE_TEMP_FILES: &str = r#"
    #!/bin/bash
    FIND=/usr/bin/find
    PROJECT_DIR=--SETUP-PROJECT_DIR--
    MAX_DAYS=--SETUP-PURGE_TEMP_FILES_MAX_DAYS--
    $FIND $PROJECT_DIR/sessions -mtime +$MAX_DAYS -delete
    $FIND $PROJECT_DIR/upload/temp -mtime +$MAX_DAYS -delete
    "#;

pub const BACKUP: &str = r#"
    #!/bin/bash
    PROJECT_DIR=--SETUP-PROJECT_DIR--
    DEST=--SETUP-BACKUP_DIR--
    mkdir -p $DEST

    # Upload backup
    BACKUP_DATE=`date +%Y%m%d%H%M%S`
    UPLOAD_DIR=$PROJECT_DIR/upload

    # Upload backup
    /usr/bin/rsync \
        --exclude=temp \
        -abv \
        --delete-after \
        --backup-dir=$DEST/incremental/$BACKUP_DATE \
        $UPLOAD_DIR \
        $DEST/current

    # Database backup
    DB_FILE=$PROJECT_DIR/data/database.fs
    REPOZO=--SETUP-VIRTUAL_ENV_DIR--/bin/repozo
    FIND=/usr/bin/find
    mkdir -p $DEST/current/data

    # - Full backup
    DOW=`date +%a`
    if [ $DOW = "Sun" ]; then
        echo "Sunday full backup:"

        # Update full backup date
        date +%d-%b > $DEST/current/data/database-full-date

        $REPOZO -FBvzQ -r $DEST/current/data -f $DB_FILE

    # - Incremental backup
    else
        $REPOZO -BvzQ -r $DEST/current/data -f $DB_FILE
    fi

    # Delete old backups
    MAX_DAYS=--SETUP-BACKUP_MAX_DAYS--
    $FIND $DEST/current/data -type f -mtime $MAX_DAYS -delete
    $FIND $DEST/current/data -type d -empty -mtime $MAX_DAYS -delete
    $FIND $DEST/incremental -type f -mtime $MAX_DAYS -delete
    $FIND $DEST/incremental -type d -empty -mtime $MAX_DAYS -delete
    "#;

// --- Apache ---

const LOGROTATE: &str = r#"
    ==SETUP-INCLUDE_LOG_DIR==/*.log {
        daily
        missingok
        rotate 14
        compress
        delaycompress
        notifempty
        create 640 root adm
        sharedscripts
        postrotate
            if /etc/init.d/apache2 status > /dev/null ; then \
                /etc/init.d/apache2 reload > /dev/null; \
            fi;
        endscript
        prerotate
            if [ -d /etc/logrotate.d/httpd-prerotate ]; then \
                    run-parts /etc/logrotate.d/httpd-prerotate; \
            fi; \
        endscript
    }
    "#;

/// One logrotate block per log directory.
pub fn render_logrotate<S: AsRef<str>>(log_dirs: &[S]) -> String {
    log_dirs
        .iter()
        .map(|dir| {
            let block = normalize_indent(LOGROTATE);
            block.replacen("==SETUP-INCLUDE_LOG_DIR==", dir.as_ref(), 1)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const APACHE_VHOST: &str = r#"
    <Macro --SETUP-VHOST_MACRO_NAME-->
        ServerName --SETUP-HOSTNAME--
        DocumentRoot --SETUP-STATIC_DIR--
        CustomLog --SETUP-APACHE_ACCESS_LOG-- "--SETUP-APACHE_LOG_FORMAT--"
        ErrorLog --SETUP-APACHE_ERROR_LOG--

        <Location />
            Require all granted
        </Location>

        <Location /resources/>
            ExpiresActive On
            ExpiresDefault A900
        </Location>

        RewriteEngine On
        ProxyPreserveHost On
    </Macro>

    <VirtualHost *:80>
        Use --SETUP-VHOST_MACRO_NAME--
        ==SETUP-VHOST_REDIRECTION_RULES==
    </VirtualHost>
    "#;

const VHOST_REDIRECTION_RULES: &[Snippet] = &[
    Snippet::new(
        r#"
        # Always serve the home page dynamically
        RewriteRule ^/$ http://--SETUP-APP_SERVER_HOST--/ [P]
        "#,
        always,
    ),
    Snippet::new(
        r#"
        # Always serve requests with query string parameters
        # dynamically
        RewriteCond %{QUERY_STRING} ^(.+)$
        RewriteRule ^(.*)$ http://--SETUP-APP_SERVER_HOST--$1 [P]
        "#,
        always,
    ),
    Snippet::new(
        r#"
        # Always serve CSS source and maps generated from SASS files dynamically
        RewriteRule ^(.*\.scss\.(css|map))$ http://--SETUP-APP_SERVER_HOST--$1 [P]
        "#,
        is_development,
    ),
    Snippet::new(
        r#"
        # Only serve content dynamically if there is no file or folder
        # in the DocumentRoot that matches the request path
        RewriteCond %{DOCUMENT_ROOT}/$1 !-f
        RewriteCond %{DOCUMENT_ROOT}/$1 !-d
        RewriteCond %{DOCUMENT_ROOT}/$1 !-s
        RewriteRule ^(.*)$ http://--SETUP-APP_SERVER_HOST--$1 [P]
        "#,
        always,
    ),
];

const VHOST_HTTP_TO_HTTPS_RULES: &[Snippet] = &[Snippet::new(
    r#"
    RewriteCond %{REQUEST_URI} !^/.well-known"
    RewriteRule (.*) https://--SETUP-HOSTNAME--$1 [R=301]
    "#,
    always,
)];

const VHOST_SSL: &str = r#"
    <VirtualHost *:443>
        Use --SETUP-VHOST_MACRO_NAME--
        ==SETUP-VHOST_REDIRECTION_RULES==

        SSLEngine On
        SSLCertificateKeyFile --SETUP-VHOST_SSL_PRIVATE_KEY_FILE--
        SSLCertificateFile --SETUP-VHOST_SSL_CERTIFICATE_FILE--
        RequestHeader set X-Forwarded-Scheme "https"
    </VirtualHost>
    "#;

const MOD_WSGI_VHOST: &str = r#"
    # mod_wsgi application
    Listen --SETUP-PORT--

    <VirtualHost --SETUP-APP_SERVER_HOST-->

        ServerName --SETUP-HOSTNAME--
        DocumentRoot --SETUP-STATIC_DIR--

        WSGIDaemonProcess --SETUP-MOD_WSGI_DAEMON_NAME-- \
            user=--SETUP-MOD_WSGI_DAEMON_USER-- \
            group=--SETUP-MOD_WSGI_DAEMON_GROUP-- \
            processes=--SETUP-MOD_WSGI_DAEMON_PROCESSES-- \
            threads=--SETUP-MOD_WSGI_DAEMON_THREADS-- \
            display-name=--SETUP-MOD_WSGI_DAEMON_DISPLAY_NAME-- \
            python-path=--SETUP-PYTHON_LIB_PATH-- \
            python-eggs=--SETUP-MOD_WSGI_DAEMON_PYTHON_EGGS-- \
            maximum-requests=--SETUP-MOD_WSGI_DAEMON_MAXIMUM_REQUESTS--

        WSGIProcessGroup --SETUP-MOD_WSGI_PROCESS_GROUP--
        WSGIApplicationGroup --SETUP-MOD_WSGI_APPLICATION_GROUP--
        WSGIImportScript --SETUP-PROJECT_SCRIPTS_DIR--/wsgi.py process-group=--SETUP-MOD_WSGI_PROCESS_GROUP-- application-group=--SETUP-MOD_WSGI_APPLICATION_GROUP--
        WSGIScriptAlias / --SETUP-PROJECT_SCRIPTS_DIR--/wsgiapp.py

        CustomLog --SETUP-MOD_WSGI_ACCESS_LOG-- "--SETUP-MOD_WSGI_LOG_FORMAT--"
        ErrorLog --SETUP-MOD_WSGI_ERROR_LOG--

        <Directory --SETUP-STATIC_DIR-->
            Require all granted
            WSGIProcessGroup --SETUP-MOD_WSGI_PROCESS_GROUP--
        </Directory>

        <Directory --SETUP-PROJECT_SCRIPTS_DIR-->
            Require all granted
        </Directory>

    </VirtualHost>
    "#;

const CACHE_SERVER_VHOST: &str = r#"
    # cache server
    Listen --SETUP-CACHE_SERVER_PORT--

    <VirtualHost localhost:--SETUP-CACHE_SERVER_PORT-->

        ServerName localhost
        DocumentRoot --SETUP-STATIC_DIR--
        CustomLog /dev/null common

        WSGIDaemonProcess --SETUP-MOD_WSGI_DAEMON_NAME---cache \
            user=--SETUP-MOD_WSGI_DAEMON_USER-- \
            group=--SETUP-MOD_WSGI_DAEMON_GROUP-- \
            processes=1 \
            threads=--SETUP-CACHE_SERVER_THREADS-- \
            display-name=--SETUP-MOD_WSGI_DAEMON_DISPLAY_NAME---cache \
            python-path=--SETUP-PYTHON_LIB_PATH-- \
            python-eggs=--SETUP-MOD_WSGI_DAEMON_PYTHON_EGGS--

        WSGIProcessGroup --SETUP-MOD_WSGI_PROCESS_GROUP---cache
        WSGIApplicationGroup --SETUP-MOD_WSGI_APPLICATION_GROUP---cache
        WSGIScriptAlias / --SETUP-PROJECT_SCRIPTS_DIR--/cacheserver.py

        <Directory --SETUP-PROJECT_SCRIPTS_DIR-->
            Require all granted
        </Directory>

    </VirtualHost>
    "#;

/// The site's Apache configuration.
///
/// Without `https` the port 80 host carries the redirection rules. With it, port 80
/// only redirects to HTTPS and the rules move to the SSL host. mod_wsgi deployments
/// append the application host (and the cache server host when enabled).
pub fn render_vhost(ns: &Namespace, https: bool) -> Result<String, TemplateError> {
    let main_rules = render_snippets(VHOST_REDIRECTION_RULES, ns)?;
    let http_rules = if https {
        render_snippets(VHOST_HTTP_TO_HTTPS_RULES, ns)?
    } else {
        main_rules.clone()
    };

    let mut blocks = vec![normalize_indent(&include(
        APACHE_VHOST,
        "VHOST_REDIRECTION_RULES",
        &http_rules,
    ))];

    if https {
        blocks.push(normalize_indent(&include(
            VHOST_SSL,
            "VHOST_REDIRECTION_RULES",
            &main_rules,
        )));
    }

    if ns.get_enum::<DeploymentScheme>("deployment_scheme")? == DeploymentScheme::ModWsgi {
        blocks.push(normalize_indent(MOD_WSGI_VHOST));
        if ns.get_bool("cache_enabled")? {
            blocks.push(normalize_indent(CACHE_SERVER_VHOST));
        }
    }

    let mut text = blocks.join("\n\n");
    text.push('\n');
    template::expand_vars(&text, ns)
}

// --- Desktop launcher ---

/// A terminal tab opened by the desktop launcher.
#[derive(Debug, Clone, Copy)]
pub struct LauncherTab {
    pub key: &'static str,
    pub script: Snippet,
}

const fn tab(key: &'static str, text: &'static str, guard: template::Guard) -> LauncherTab {
    LauncherTab {
        key,
        script: Snippet::new(text, guard),
    }
}

pub static LAUNCHER_TABS: &[LauncherTab] = &[
    tab(
        "zeo",
        r#"
        #!/bin/bash
        export TAB_TITLE=ZEO
        export TAB_COMMAND='./rundb.sh'
        cd --SETUP-PROJECT_SCRIPTS_DIR--
        bash --init-file --SETUP-LAUNCHER_TAB_SCRIPT--
        "#,
        uses_zeo_process,
    ),
    tab(
        "http",
        r#"
        #!/bin/bash
        export TAB_TITLE=HTTP
        export TAB_COMMAND='python run.py'
        cd --SETUP-PROJECT_SCRIPTS_DIR--
        bash --init-file --SETUP-LAUNCHER_TAB_SCRIPT--
        "#,
        serves_through_python,
    ),
    tab(
        "cache",
        r#"
        #!/bin/bash
        export TAB_TITLE=Cache server
        export TAB_COMMAND='python cacheserver.py'
        cd --SETUP-PROJECT_SCRIPTS_DIR--
        bash --init-file --SETUP-LAUNCHER_TAB_SCRIPT--
        "#,
        runs_cache_server_manually,
    ),
    tab(
        "cocktail",
        r#"
        #!/bin/bash
        export TAB_TITLE=Cocktail
        cd --SETUP-COCKTAIL_DIR--
        bash --init-file --SETUP-LAUNCHER_TAB_SCRIPT--
        "#,
        always,
    ),
    tab(
        "woost",
        r#"
        #!/bin/bash
        export TAB_TITLE=Woost
        cd --SETUP-WOOST_DIR--
        bash --init-file --SETUP-LAUNCHER_TAB_SCRIPT--
        "#,
        always,
    ),
    tab(
        "site",
        r#"
        #!/bin/bash
        export TAB_TITLE=Site
        cd --SETUP-PROJECT_DIR--
        bash --init-file --SETUP-LAUNCHER_TAB_SCRIPT--
        "#,
        always,
    ),
    tab(
        "ipython",
        r#"
        #!/bin/bash
        export TAB_TITLE=IPython
        export TAB_COMMAND='site-shell'
        cd --SETUP-PROJECT_SCRIPTS_DIR--
        bash --init-file --SETUP-LAUNCHER_TAB_SCRIPT--
        "#,
        always,
    ),
];

/// The launcher tabs that apply to this installation.
pub fn launcher_tabs(ns: &Namespace) -> Result<Vec<&'static LauncherTab>, NamespaceError> {
    let mut tabs = Vec::new();
    for tab in LAUNCHER_TABS {
        if (tab.script.guard)(ns)? {
            tabs.push(tab);
        }
    }
    Ok(tabs)
}

pub const LAUNCHER: &str = r#"
    #!/bin/bash
    LAUNCHER=--SETUP-LAUNCHER_DIR--
    /usr/lib/gnome-terminal/gnome-terminal-server --app-id info.woost.--SETUP-ALIAS-- --name --SETUP-ALIAS-- --class --SETUP-ALIAS-- &
    /usr/bin/gnome-terminal \
        --app-id info.woost.--SETUP-ALIAS-- \
        --SETUP-LAUNCHER_TERMINAL_TAB_PARAMETERS--
    "#;

pub const LAUNCHER_TAB: &str = r#"
    source ~/.bashrc
    source --SETUP-PROJECT_ENV_SCRIPT--

    function site-tab-title {
        xtitle "--SETUP-ALIAS--: $1"
    }

    if [[ -n "$TAB_TITLE" ]]; then
        site-tab-title $TAB_TITLE
    else
        xtitle --SETUP-ALIAS--
    fi

    if [[ -n "$TAB_COMMAND" ]]; then
        eval $TAB_COMMAND
    fi
    "#;

pub const DESKTOP_FILE: &str = r#"
    #!/usr/bin/env xdg-open
    [Desktop Entry]
    Version=1.0
    Name=--SETUP-ALIAS--
    Exec=--SETUP-LAUNCHER_SCRIPT--
    Icon=--SETUP-ALIAS--
    Terminal=false
    Type=Application
    Categories=Application;
    StartupWMClass=--SETUP-ALIAS--
    "#;
