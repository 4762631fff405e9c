// src/cli/dispatcher.rs

use anyhow::{Result, bail};

use crate::cli::handlers;

// --- Command Definition and Registry ---

/// A command, its aliases, and the handler receiving the rest of the arguments.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>) -> Result<()>,
}

static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "make",
        aliases: &["new"],
        handler: handlers::make::handle,
    },
    CommandDefinition {
        name: "copy",
        aliases: &[],
        handler: handlers::copy::handle,
    },
    CommandDefinition {
        name: "bundle",
        aliases: &[],
        handler: handlers::bundle::handle,
    },
    CommandDefinition {
        name: "feature",
        aliases: &[],
        handler: handlers::feature::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

pub fn command_names() -> Vec<&'static str> {
    COMMAND_REGISTRY.iter().map(|cmd| cmd.name).collect()
}

/// Routes `woostproject <command> [args...]` to the command's handler.
pub fn dispatch(all_args: Vec<String>) -> Result<()> {
    log::debug!("Dispatching args: {:?}", all_args);

    let mut args = all_args.into_iter();
    let Some(name) = args.next() else {
        bail!(
            "No command given. Available commands: {}.",
            command_names().join(", ")
        );
    };
    let Some(command) = find_command(&name) else {
        bail!(
            "Unknown command '{}'. Available commands: {}.",
            name,
            command_names().join(", ")
        );
    };

    (command.handler)(args.collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_command_by_name_or_alias() {
        assert_eq!(find_command("make").unwrap().name, "make");
        assert_eq!(find_command("new").unwrap().name, "make");
        assert_eq!(find_command("feature").unwrap().name, "feature");
        assert!(find_command("unbundle").is_none());
    }

    #[test]
    fn test_unknown_or_missing_command() {
        let err = dispatch(vec!["frobnicate".to_string()]).unwrap_err();
        assert!(err.to_string().starts_with("Unknown command 'frobnicate'"));
        let err = dispatch(Vec::new()).unwrap_err();
        assert!(err.to_string().contains("make, copy, bundle, feature"));
    }
}
