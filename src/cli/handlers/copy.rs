// src/cli/handlers/copy.rs

use anyhow::Result;
use clap::Parser;

use crate::{
    cli::{
        args::{CopyArgs, InstallArgs, OverridesBuilder, TaskArgs},
        handlers::commons,
    },
    core::namespace::Overrides,
    steps::InstallVariant,
};

// --- Command Argument Parsing ---

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Create a new installation of an existing project."
)]
struct CopyCommandArgs {
    /// The name of the website.
    website: String,

    /// Path to an existing installation of the project, used to obtain its
    /// database, uploads and source code.
    source_installation: String,

    #[command(flatten)]
    tasks: TaskArgs,

    #[command(flatten)]
    install: InstallArgs,

    #[command(flatten)]
    copy: CopyArgs,
}

impl CopyCommandArgs {
    fn overrides(&self) -> Overrides {
        let mut builder = OverridesBuilder::new();
        builder
            .text("website", &Some(self.website.clone()))
            .text("source_installation", &Some(self.source_installation.clone()));
        self.tasks.collect(&mut builder);
        self.install.collect(&mut builder);
        self.copy.collect(&mut builder);
        builder.build()
    }
}

// --- Main Handler ---

pub fn handle(args: Vec<String>) -> Result<()> {
    let copy_args = CopyCommandArgs::try_parse_from(&args)?;
    let namespace = commons::build_namespace(&[&copy_args.overrides()])?;
    commons::install(namespace, InstallVariant::Copy, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::Value;

    #[test]
    fn test_copy_arguments() {
        let copy_args = CopyCommandArgs::try_parse_from([
            "Acme",
            "/srv/acme",
            "--revision",
            "stable",
            "--skip-database",
        ])
        .unwrap();
        let values = copy_args.overrides();

        assert_eq!(values["source_installation"], Value::from("/srv/acme"));
        assert_eq!(values["revision"], Value::from("stable"));
        assert_eq!(values["skip_database"], Value::Bool(true));
        assert!(!values.contains_key("skip_uploads"));
    }

    #[test]
    fn test_source_installation_is_required() {
        assert!(CopyCommandArgs::try_parse_from(["Acme"]).is_err());
    }
}
