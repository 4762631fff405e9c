// src/system/console.rs

//! User-facing progress output on stdout.

use crate::system::executor::CommandLine;
use colored::Colorize;

/// Announces the start of a block of work.
pub fn heading(text: &str) {
    println!();
    println!("{} {}", ">>>".magenta(), text.bold());
    println!();
}

pub fn message(text: &str) {
    println!("{}", text);
}

/// Echoes a command line before it runs.
pub fn command(command: &CommandLine) {
    println!("{}", command.to_string().bright_blue());
}

pub fn success(text: &str) {
    println!("\n{}", text.green());
}
