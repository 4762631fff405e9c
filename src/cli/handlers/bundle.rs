// src/cli/handlers/bundle.rs

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::{
    cli::args::{CopyArgs, InstallArgs, OverridesBuilder},
    core::{bundle, namespace::Overrides},
    models::Compression,
    system::console,
};

// --- Command Argument Parsing ---

/// Takes the options of `copy` except task selection. Whatever is given
/// explicitly becomes a default of the generated installer.
#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Create a self contained installer file for an existing project."
)]
struct BundleArgs {
    /// The name of the website.
    website: String,

    /// Path to the installation to bundle.
    source_installation: String,

    /// The name of the generated file.
    #[arg(long, default_value = "website-installer", help_heading = "Bundle")]
    output_file: PathBuf,

    /// The compression applied to the embedded project.
    #[arg(long, value_enum, default_value_t = Compression::Gz, help_heading = "Bundle")]
    compression: Compression,

    #[command(flatten)]
    install: InstallArgs,

    #[command(flatten)]
    copy: CopyArgs,
}

impl BundleArgs {
    /// The settings the installer applies when run. The source installation and
    /// the bundle options themselves are not exported.
    fn exported_defaults(&self) -> Overrides {
        let mut builder = OverridesBuilder::new();
        builder.text("website", &Some(self.website.clone()));
        self.install.collect(&mut builder);
        self.copy.collect(&mut builder);
        builder.build()
    }

    fn project_dir(&self) -> PathBuf {
        Path::new(&self.source_installation).join(self.website.to_lowercase())
    }
}

fn create_installer(bundle_args: &BundleArgs, program: &Path) -> Result<()> {
    let source_dir = bundle_args.project_dir();
    if !source_dir.is_dir() {
        bail!(
            "'{}' does not contain an installation of '{}'",
            bundle_args.source_installation,
            bundle_args.website
        );
    }

    let defaults = bundle_args.exported_defaults();
    log::debug!("Exporting defaults {:?}", defaults);

    console::heading("Generating self contained installer");
    bundle::write_bundle(
        program,
        &source_dir,
        &bundle_args.website.to_lowercase(),
        bundle_args.compression,
        defaults,
        &bundle_args.output_file,
    )
    .with_context(|| {
        format!(
            "Could not write the installer '{}'",
            bundle_args.output_file.display()
        )
    })
}

// --- Main Handler ---

pub fn handle(args: Vec<String>) -> Result<()> {
    let bundle_args = BundleArgs::try_parse_from(&args)?;
    let program = std::env::current_exe().context("Could not locate the running executable")?;

    create_installer(&bundle_args, &program)?;
    console::success(&format!(
        "Installer written to '{}'.",
        bundle_args.output_file.display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::Value;
    use std::fs;

    #[test]
    fn test_bundle_exports_explicit_settings() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("prod");
        let data = source.join("acme").join("acme").join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("database.fs"), "db").unwrap();

        let program = dir.path().join("woostproject");
        fs::write(&program, b"#!program").unwrap();
        let output = dir.path().join("acme-installer");

        let source_arg = source.display().to_string();
        let output_arg = output.display().to_string();
        let bundle_args = BundleArgs::try_parse_from([
            "Acme",
            source_arg.as_str(),
            "--output-file",
            output_arg.as_str(),
            "--compression",
            "lz4",
            "--environment",
            "production",
            "--skip-uploads",
        ])
        .unwrap();
        create_installer(&bundle_args, &program).unwrap();

        let embedded = bundle::read_embedded(&output).unwrap().unwrap();
        assert_eq!(embedded.manifest.compression, Compression::Lz4);
        let defaults = &embedded.manifest.defaults;
        assert_eq!(defaults.len(), 3);
        assert_eq!(defaults["website"], Value::from("Acme"));
        assert_eq!(defaults["environment"], Value::from("production"));
        assert_eq!(defaults["skip_uploads"], Value::Bool(true));

        let dest = dir.path().join("extracted");
        embedded.extract_to(&dest).unwrap();
        assert_eq!(
            fs::read_to_string(dest.join("acme/acme/data/database.fs")).unwrap(),
            "db"
        );
    }

    #[test]
    fn test_bundle_defaults() {
        let bundle_args = BundleArgs::try_parse_from(["Acme", "/srv/prod"]).unwrap();
        assert_eq!(bundle_args.compression, Compression::Gz);
        assert_eq!(bundle_args.output_file, PathBuf::from("website-installer"));
        assert_eq!(bundle_args.project_dir(), PathBuf::from("/srv/prod/acme"));
        assert!(BundleArgs::try_parse_from(["Acme", "/srv/prod", "--tasks", "install_libs"]).is_err());
    }

    #[test]
    fn test_missing_installation_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source_arg = dir.path().display().to_string();
        let bundle_args = BundleArgs::try_parse_from(["Acme", source_arg.as_str()]).unwrap();
        assert!(create_installer(&bundle_args, &dir.path().join("program")).is_err());
    }
}
