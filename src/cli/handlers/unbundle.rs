// src/cli/handlers/unbundle.rs

use anyhow::{Result, bail};
use clap::Parser;
use std::path::Path;

use crate::{
    cli::{
        args::{CopyArgs, InstallArgs, OverridesBuilder},
        handlers::commons,
    },
    constants::BUNDLE_TEMP_DIR_PREFIX,
    core::{
        bundle::EmbeddedBundle,
        namespace::{Namespace, Overrides},
    },
    steps::InstallVariant,
};

// --- Command Argument Parsing ---

/// The website name and its source come from the bundle itself. Task
/// selection is not offered: an installer always runs the whole pipeline.
#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Install the Woost website embedded in this installer."
)]
struct UnbundleArgs {
    #[command(flatten)]
    install: InstallArgs,

    #[command(flatten)]
    copy: CopyArgs,
}

impl UnbundleArgs {
    fn overrides(&self) -> Overrides {
        let mut builder = OverridesBuilder::new();
        self.install.collect(&mut builder);
        self.copy.collect(&mut builder);
        builder.build()
    }
}

/// Layers the bundle's defaults, then the command line, then the extraction directory.
fn unbundle_layers(
    bundle: &EmbeddedBundle,
    unbundle_args: &UnbundleArgs,
    extract_dir: &Path,
) -> [Overrides; 3] {
    let mut forced = Overrides::new();
    forced.insert(
        "source_installation".to_string(),
        extract_dir.display().to_string().into(),
    );
    [
        bundle.manifest.defaults.clone(),
        unbundle_args.overrides(),
        forced,
    ]
}

fn check_website(namespace: &Namespace) -> Result<()> {
    if namespace.is_unset("website") {
        bail!("The embedded project does not name its website");
    }
    Ok(())
}

// --- Main Handler ---

/// Runs the installer embedded in this executable. All arguments belong to it.
pub fn handle(bundle: EmbeddedBundle, args: Vec<String>) -> Result<()> {
    let unbundle_args = UnbundleArgs::try_parse_from(&args)?;
    let extract_dir = std::env::temp_dir().join(BUNDLE_TEMP_DIR_PREFIX);

    let [defaults, cli, forced] = unbundle_layers(&bundle, &unbundle_args, &extract_dir);
    let namespace = commons::build_namespace(&[&defaults, &cli, &forced])?;
    check_website(&namespace)?;

    commons::install(namespace, InstallVariant::Unbundle, Some(bundle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::handlers::commons::layer_namespace;
    use crate::core::bundle::{assemble, parse_embedded};
    use crate::core::namespace::Value;
    use crate::models::Compression;

    fn embedded(defaults: &[(&str, Value)]) -> EmbeddedBundle {
        let defaults: Overrides = defaults
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect();
        let bytes = assemble(b"program", b"archive", Compression::Uncompressed, defaults).unwrap();
        parse_embedded(&bytes).unwrap().unwrap()
    }

    #[test]
    fn test_command_line_overrides_bundle_defaults() {
        let bundle = embedded(&[
            ("website", Value::from("Acme")),
            ("environment", Value::from("production")),
            ("source_installation", Value::from("/srv/elsewhere")),
        ]);
        let unbundle_args =
            UnbundleArgs::try_parse_from(["--environment", "development", "--backup"]).unwrap();

        let [defaults, cli, forced] =
            unbundle_layers(&bundle, &unbundle_args, Path::new("/tmp/woostproject-bundle"));
        let ns = layer_namespace(&Overrides::new(), &[&defaults, &cli, &forced]);

        assert!(check_website(&ns).is_ok());
        assert_eq!(ns.get_str("website").unwrap(), "Acme");
        assert_eq!(ns.get_str("environment").unwrap(), "development");
        assert!(ns.get_bool("backup").unwrap());
        assert_eq!(
            ns.get_str("source_installation").unwrap(),
            "/tmp/woostproject-bundle"
        );
    }

    #[test]
    fn test_bundle_must_name_the_website() {
        let bundle = embedded(&[]);
        let unbundle_args = UnbundleArgs::try_parse_from(Vec::<String>::new()).unwrap();
        let [defaults, cli, forced] = unbundle_layers(&bundle, &unbundle_args, Path::new("/tmp/x"));
        let ns = layer_namespace(&Overrides::new(), &[&defaults, &cli, &forced]);
        assert!(check_website(&ns).is_err());
    }

    #[test]
    fn test_website_cannot_be_given() {
        assert!(UnbundleArgs::try_parse_from(["Acme"]).is_err());
    }

    #[test]
    fn test_task_selection_is_not_offered() {
        assert!(UnbundleArgs::try_parse_from(["--tasks", "create_launcher"]).is_err());
        assert!(UnbundleArgs::try_parse_from(["--recreate-env"]).is_err());
    }
}
