// src/cli/handlers/commons.rs

// Shared by the install handlers.

use anyhow::{Context, Result};

use crate::{
    core::{
        bundle::EmbeddedBundle,
        config_loader,
        namespace::{Namespace, Overrides},
    },
    steps::{self, InstallContext, InstallVariant},
    system::{console, host::SystemHost},
};

/// Stacks `layers` on top of the compiled-in defaults and the user's defaults file.
pub fn layer_namespace(user_defaults: &Overrides, layers: &[&Overrides]) -> Namespace {
    Namespace::from_layers(std::iter::once(user_defaults).chain(layers.iter().copied()))
}

/// Loads the user's defaults file and stacks `layers` on top of it.
pub fn build_namespace(layers: &[&Overrides]) -> Result<Namespace> {
    let user_defaults =
        config_loader::load_user_defaults().context("Could not load the user defaults")?;
    Ok(layer_namespace(&user_defaults, layers))
}

/// Runs the install pipeline for `variant` on this host.
pub fn install(
    namespace: Namespace,
    variant: InstallVariant,
    bundle: Option<EmbeddedBundle>,
) -> Result<()> {
    let website = namespace.get_str("website")?.to_string();
    let mut context = InstallContext::new(namespace, Box::new(SystemHost::new()), variant);
    context.bundle = bundle;

    steps::run_install(context).with_context(|| format!("Could not install '{}'", website))?;
    console::success(&format!("Website '{}' is ready.", website));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::Value;

    fn overrides(pairs: &[(&str, Value)]) -> Overrides {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_later_layers_win() {
        let user = overrides(&[
            ("workspace", Value::from("/srv/projects")),
            ("admin_email", Value::from("dev@example.com")),
        ]);
        let bundle = overrides(&[("admin_email", Value::from("ops@example.com"))]);
        let cli = overrides(&[("website", Value::from("Acme"))]);

        let ns = layer_namespace(&user, &[&bundle, &cli]);
        assert_eq!(ns.get_str("workspace").unwrap(), "/srv/projects");
        assert_eq!(ns.get_str("admin_email").unwrap(), "ops@example.com");
        assert_eq!(ns.get_str("website").unwrap(), "Acme");
        assert_eq!(ns.get_str("environment").unwrap(), "development");
        assert!(ns.is_unset("alias"));
    }
}
