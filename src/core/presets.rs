// src/core/presets.rs

use crate::core::namespace::{DefaultValue, Namespace, NamespaceError};
use crate::models::Environment;

/// A named set of values applied to settings the user left unset.
#[derive(Debug)]
pub struct Preset {
    pub environment: Environment,
    pub values: &'static [(&'static str, DefaultValue)],
}

pub static PRESETS: &[Preset] = &[
    Preset {
        environment: Environment::Development,
        values: &[
            ("deployment_scheme", DefaultValue::Str("mod_rewrite")),
            ("zodb_deployment_scheme", DefaultValue::Str("zeo")),
            ("zeo_pack", DefaultValue::Bool(false)),
            ("purge_temp_files", DefaultValue::Bool(false)),
            ("backup", DefaultValue::Bool(false)),
            ("cherrypy_env_global_config", DefaultValue::List(&[])),
        ],
    },
    Preset {
        environment: Environment::Production,
        values: &[
            ("deployment_scheme", DefaultValue::Str("mod_wsgi_express")),
            ("zodb_deployment_scheme", DefaultValue::Str("zeo_service")),
            ("zeo_pack", DefaultValue::Bool(true)),
            ("purge_temp_files", DefaultValue::Bool(true)),
            ("backup", DefaultValue::Bool(true)),
            (
                "cherrypy_env_global_config",
                DefaultValue::List(&[
                    r#""engine.autoreload_on": False"#,
                    r#""server.log_to_screen": False"#,
                ]),
            ),
        ],
    },
];

pub fn preset_for(environment: Environment) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.environment == environment)
}

/// Fills every still-unset setting covered by the preset of the namespace's
/// `environment`. Settings that already hold a value are left alone.
pub fn apply_presets(namespace: &mut Namespace) -> Result<(), NamespaceError> {
    let environment: Environment = namespace.get_enum("environment")?;
    if let Some(preset) = preset_for(environment) {
        log::debug!("Applying the '{}' environment presets.", environment);
        for (key, value) in preset.values {
            namespace.set_default(key, value.to_value());
        }
    }
    Ok(())
}
