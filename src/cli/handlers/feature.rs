// src/cli/handlers/feature.rs

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, builder::PossibleValuesParser};
use std::path::Path;

use crate::{
    core::{
        features::{self, DISABLED, FEATURES},
        paths,
    },
    models::FeatureAction,
    system::{
        console,
        host::{Host, SystemHost},
    },
};

// --- Command Argument Parsing ---

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Install, update or disable global features and configuration required by Woost.",
    after_help = features::describe_features()
)]
#[command(group(ArgGroup::new("action").required(true).args(["update", "enable", "disable"])))]
struct FeatureArgs {
    /// The feature to operate on.
    #[arg(value_parser = PossibleValuesParser::new(FEATURES.iter().map(|f| f.id)))]
    feature: String,

    /// Install or update the feature.
    #[arg(long)]
    update: bool,

    /// Clear a previous `--disable`, then install or update the feature.
    #[arg(long)]
    enable: bool,

    /// Disable the feature, so that no installation installs it automatically.
    #[arg(long)]
    disable: bool,
}

impl FeatureArgs {
    fn action(&self) -> FeatureAction {
        if self.update {
            FeatureAction::Update
        } else if self.enable {
            FeatureAction::Enable
        } else {
            FeatureAction::Disable
        }
    }
}

fn apply(host: &dyn Host, config_dir: &Path, id: &str, action: FeatureAction) -> Result<()> {
    let feature = features::find_feature(id)?;
    match action {
        FeatureAction::Update | FeatureAction::Enable => {
            let outcome = if action == FeatureAction::Enable {
                feature.enable(host, config_dir)
            } else {
                feature.update(host, config_dir)
            };
            let (previous, installed) =
                outcome.with_context(|| format!("Could not update feature '{}'", id))?;
            match installed {
                Some(version) => console::success(&format!(
                    "Feature '{}' installed at version {}.",
                    id, version
                )),
                None if previous == DISABLED => console::message(&format!(
                    "Feature '{}' is disabled and was left untouched.",
                    id
                )),
                None => console::message(&format!("Feature '{}' is up to date.", id)),
            }
        }
        FeatureAction::Disable => {
            feature
                .disable(host, config_dir)
                .with_context(|| format!("Could not disable feature '{}'", id))?;
            console::success(&format!("Feature '{}' disabled.", id));
        }
    }
    Ok(())
}

// --- Main Handler ---

pub fn handle(args: Vec<String>) -> Result<()> {
    let feature_args = FeatureArgs::try_parse_from(&args)?;
    apply(
        &SystemHost::new(),
        &paths::system_config_dir(),
        &feature_args.feature,
        feature_args.action(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::host::testing::RecordingHost;
    use std::fs;

    #[test]
    fn test_feature_arguments() {
        let feature_args = FeatureArgs::try_parse_from(["apache", "--disable"]).unwrap();
        assert_eq!(feature_args.action(), FeatureAction::Disable);

        assert!(FeatureArgs::try_parse_from(["apache"]).is_err());
        assert!(FeatureArgs::try_parse_from(["apache", "--update", "--disable"]).is_err());
        assert!(FeatureArgs::try_parse_from(["nginx", "--update"]).is_err());

        let feature_args = FeatureArgs::try_parse_from(["apache", "--enable"]).unwrap();
        assert_eq!(feature_args.action(), FeatureAction::Enable);
    }

    #[test]
    fn test_disabled_feature_is_not_updated() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("features")).unwrap();
        let host = RecordingHost::new();

        apply(&host, dir.path(), "mercurial", FeatureAction::Disable).unwrap();
        apply(&host, dir.path(), "mercurial", FeatureAction::Update).unwrap();

        assert!(host.commands().is_empty());
        assert_eq!(
            host.elevated_file(&dir.path().join("features/mercurial")).as_deref(),
            Some("-1")
        );
    }

    #[test]
    fn test_enable_reinstalls_disabled_feature() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("features")).unwrap();
        let host = RecordingHost::new();

        apply(&host, dir.path(), "mercurial", FeatureAction::Disable).unwrap();
        apply(&host, dir.path(), "mercurial", FeatureAction::Enable).unwrap();

        assert!(host.commands()[0].starts_with("sudo apt-get install -y"));
        assert_ne!(
            host.elevated_file(&dir.path().join("features/mercurial")).as_deref(),
            Some("-1")
        );
    }

    #[test]
    fn test_update_installs_feature() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("features")).unwrap();
        let host = RecordingHost::new();

        apply(&host, dir.path(), "mercurial", FeatureAction::Update).unwrap();
        assert!(host.commands()[0].starts_with("sudo apt-get install -y"));
        assert!(host.elevated_file(&dir.path().join("features/mercurial")).is_some());
    }
}
