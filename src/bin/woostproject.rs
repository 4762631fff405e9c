// src/bin/woostproject.rs

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use woostproject::{
    cli::{Cli, dispatcher, handlers},
    core::bundle,
};

/// Sets up logging, runs the command and reports any error.
fn main() {
    env_logger::init();

    if let Err(e) = run() {
        // Help and usage errors from a handler's own argument parser.
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// An executable carrying an embedded project is that project's installer: every
/// argument belongs to the unbundler. Otherwise the first argument names a command.
fn run() -> Result<()> {
    let program = std::env::current_exe().context("Could not locate the running executable")?;
    let embedded = bundle::read_embedded(&program)
        .with_context(|| format!("Could not read '{}'", program.display()))?;

    if let Some(bundle) = embedded {
        log::debug!("Running the installer embedded in '{}'", program.display());
        return handlers::unbundle::handle(bundle, std::env::args().skip(1).collect());
    }

    let cli = Cli::parse();
    log::debug!("CLI args parsed: {:?}", cli);
    dispatcher::dispatch(cli.args)
}
