// src/cli/mod.rs

use clap::Parser;

pub mod args;
pub mod dispatcher;
pub mod handlers;

const HELP_TEMPLATE: &str = "\
<title>woostproject</title> {version}
{about}

<title>USAGE</title>
    <cmd>woostproject</cmd> <hl><command></hl> [options...]
    <cmd>woostproject</cmd> <hl><command></hl> --help

<title>COMMANDS</title>
  <group>Installations</group>
    <cmd>make</cmd> <hl><website></hl>                 Create or modify a Woost website. <dim>(alias: new)</dim>
    <cmd>copy</cmd> <hl><website> <source></hl>        Create a new installation of an existing project.

  <group>Distribution</group>
    <cmd>bundle</cmd> <hl><website> <source></hl>      Create a self contained installer for an existing project.

  <group>Host</group>
    <cmd>feature</cmd> <hl><id></hl> --update|--enable|--disable   Install, update or disable host-wide features.

<dim>Set RUST_LOG=debug for a detailed trace of every run.</dim>
";

/// Renders the help template, styled only when stdout supports colors.
fn build_help_string() -> &'static str {
    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();

    let title = if use_colors { "\x1b[1;33m" } else { "" }; // Bold Yellow
    let hl = if use_colors { "\x1b[1;36m" } else { "" }; // Bold Cyan
    let cmd = if use_colors { "\x1b[36m" } else { "" }; // Cyan
    let group = if use_colors { "\x1b[1;32m" } else { "" }; // Bold Green
    let dim = if use_colors { "\x1b[2m" } else { "" };
    let reset = if use_colors { "\x1b[0m" } else { "" };

    let formatted_string = HELP_TEMPLATE
        .replace("<title>", title)
        .replace("</title>", reset)
        .replace("<hl>", hl)
        .replace("</hl>", reset)
        .replace("<cmd>", cmd)
        .replace("</cmd>", reset)
        .replace("<group>", group)
        .replace("</group>", reset)
        .replace("<dim>", dim)
        .replace("</dim>", reset);

    Box::leak(formatted_string.into_boxed_str())
}

/// woostproject: installs, copies and bundles Woost websites.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    help_template = { build_help_string() },
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The command followed by its own arguments, parsed by the command's handler.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
