// src/cli/handlers/make.rs

use anyhow::Result;
use clap::Parser;

use crate::{
    cli::{
        args::{InstallArgs, OverridesBuilder, TaskArgs},
        handlers::commons,
    },
    core::namespace::Overrides,
    steps::InstallVariant,
};

// --- Command Argument Parsing ---

#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Create or modify a Woost website.")]
struct MakeArgs {
    /// The name of the website to create.
    website: String,

    #[command(flatten)]
    tasks: TaskArgs,

    #[command(flatten)]
    install: InstallArgs,

    /// The languages of the website, as two letter ISO codes.
    #[arg(
        long = "language",
        short = 'l',
        value_name = "LANG_ISO_CODE",
        num_args = 1..,
        help_heading = "CMS"
    )]
    languages: Option<Vec<String>>,

    /// The e-mail of the administrator account.
    #[arg(long, help_heading = "CMS")]
    admin_email: Option<String>,

    /// The password of the administrator account.
    #[arg(long, help_heading = "CMS")]
    admin_password: Option<String>,

    /// Start the incremental ids of new objects at this value, to avoid
    /// collisions with data imported from another site.
    #[arg(long, help_heading = "CMS")]
    base_id: Option<i64>,
}

impl MakeArgs {
    fn overrides(&self) -> Overrides {
        let mut builder = OverridesBuilder::new();
        builder.text("website", &Some(self.website.clone()));
        self.tasks.collect(&mut builder);
        self.install.collect(&mut builder);
        builder
            .list("languages", &self.languages)
            .text("admin_email", &self.admin_email)
            .text("admin_password", &self.admin_password)
            .value("base_id", self.base_id)
            .build()
    }
}

// --- Main Handler ---

pub fn handle(args: Vec<String>) -> Result<()> {
    let make_args = MakeArgs::try_parse_from(&args)?;
    let namespace = commons::build_namespace(&[&make_args.overrides()])?;
    commons::install(namespace, InstallVariant::Make, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::Value;

    #[test]
    fn test_make_arguments() {
        let make_args = MakeArgs::try_parse_from([
            "Acme",
            "-l",
            "ca",
            "es",
            "--admin-password",
            "secret",
            "--skip-tasks",
            "create_launcher",
        ])
        .unwrap();
        let values = make_args.overrides();

        assert_eq!(values["website"], Value::from("Acme"));
        assert_eq!(
            values["languages"],
            Value::from(vec!["ca".to_string(), "es".to_string()])
        );
        assert_eq!(values["admin_password"], Value::from("secret"));
        assert_eq!(
            values["skipped_tasks"],
            Value::from(vec!["create_launcher".to_string()])
        );
        assert!(!values.contains_key("admin_email"));
    }

    #[test]
    fn test_website_is_required() {
        assert!(MakeArgs::try_parse_from(["--mercurial"]).is_err());
    }
}
