// src/core/template.rs

//! # Template Expander
//!
//! Templates are multi-line literals indented like the surrounding source code.
//! Expansion runs in three stages:
//!
//! 1. Structural inclusion: every line holding a `==SETUP-NAME==` marker is replaced by
//!    a block of text (typically the guarded [`Snippet`]s that apply to the namespace),
//!    re-indented to the marker's column.
//! 2. [`normalize_indent`] strips the literal's indentation.
//! 3. [`expand_vars`] replaces every `--SETUP-KEY--` token with the printable form of
//!    the `key` setting.

use crate::core::namespace::{Namespace, NamespaceError};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    // Captures the setting name of a `--SETUP-KEY--` token.
    static ref VAR_PATTERN: Regex = Regex::new(r"--SETUP-(?P<key>[A-Z0-9_]+)--").unwrap();
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Undefined variable: {token}")]
    UndefinedVariable { token: String },
    #[error("Could not evaluate the condition of a template block: {0}")]
    Guard(#[from] NamespaceError),
}

/// A condition evaluated against the namespace to decide whether a block applies.
pub type Guard = fn(&Namespace) -> Result<bool, NamespaceError>;

/// A block of template text included only when its guard holds.
#[derive(Debug, Clone, Copy)]
pub struct Snippet {
    pub text: &'static str,
    pub guard: Guard,
}

impl Snippet {
    pub const fn new(text: &'static str, guard: Guard) -> Self {
        Self { text, guard }
    }
}

/// Guard for blocks that always apply.
pub fn always(_: &Namespace) -> Result<bool, NamespaceError> {
    Ok(true)
}

/// Left-aligns an indented literal.
///
/// Leading blank lines are dropped, the indentation of the first line with content
/// is removed from every line that starts with it, trailing whitespace is stripped
/// from all lines and trailing blank lines are dropped.
pub fn normalize_indent(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut indent: Option<&str> = None;

    for line in text.split('\n') {
        let line = line.trim_end();
        match indent {
            None if line.is_empty() => continue,
            None => {
                let content = line.trim_start();
                indent = Some(line.strip_suffix(content).unwrap_or(""));
                lines.push(content);
            }
            Some(prefix) => lines.push(line.strip_prefix(prefix).unwrap_or(line)),
        }
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

/// Replaces every `--SETUP-KEY--` token with the value of the `key` setting.
///
/// # Errors
/// Fails with [`TemplateError::UndefinedVariable`], naming the literal token, if the
/// setting does not exist or has not been resolved.
pub fn expand_vars(text: &str, namespace: &Namespace) -> Result<String, TemplateError> {
    let mut expanded = String::with_capacity(text.len());
    let mut last_end = 0;

    for captures in VAR_PATTERN.captures_iter(text) {
        let (Some(token), Some(key)) = (captures.get(0), captures.name("key")) else {
            continue;
        };
        let value = namespace
            .render(&key.as_str().to_lowercase())
            .map_err(|_| TemplateError::UndefinedVariable {
                token: token.as_str().to_string(),
            })?;
        expanded.push_str(&text[last_end..token.start()]);
        expanded.push_str(&value);
        last_end = token.end();
    }

    expanded.push_str(&text[last_end..]);
    Ok(expanded)
}

/// Normalizes and expands a template.
pub fn process_template(text: &str, namespace: &Namespace) -> Result<String, TemplateError> {
    expand_vars(&normalize_indent(text), namespace)
}

/// Replaces each line holding `==SETUP-<marker>==` with `content`, indenting every
/// line of `content` to the marker's column. An empty `content` removes the line.
pub fn include(template: &str, marker: &str, content: &str) -> String {
    let tag = format!("==SETUP-{}==", marker);
    let mut result: Vec<String> = Vec::new();

    for line in template.split('\n') {
        if !line.contains(&tag) {
            result.push(line.to_string());
            continue;
        }
        let column = line.strip_suffix(line.trim_start()).unwrap_or("");
        for content_line in content.split('\n').filter(|_| !content.is_empty()) {
            if content_line.is_empty() {
                result.push(String::new());
            } else {
                result.push(format!("{}{}", column, content_line));
            }
        }
    }

    result.join("\n")
}

/// Concatenates the normalized text of every snippet whose guard holds, separated
/// by blank lines.
pub fn render_snippets(snippets: &[Snippet], namespace: &Namespace) -> Result<String, TemplateError> {
    let mut blocks = Vec::new();
    for snippet in snippets {
        if (snippet.guard)(namespace)? {
            blocks.push(normalize_indent(snippet.text));
        }
    }
    Ok(blocks.join("\n\n"))
}
