// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! miette diagnostics for configuration failures.
//!
//! Parse failures from figment point back into the TOML file that caused
//! them; a misspelled key also gets the closest valid key of its section.
//! Validation failures name the offending `section.key`.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a candidate must beat to be suggested.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One problem with the effective configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {location}")]
    #[diagnostic(
        code(orderlink::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// `[section]` or `the top level`.
        location: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not an orderlink setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(orderlink::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `saga.history_scan_limit`.
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(code(orderlink::config::missing_key))]
    MissingKey { key: String },

    /// A value that parsed but is not usable.
    #[error("{key}: {message}")]
    #[diagnostic(code(orderlink::config::invalid_value))]
    Validation { key: &'static str, message: String },

    #[error("cannot load configuration: {0}")]
    #[diagnostic(code(orderlink::config::load))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Converts every error carried by `err` into a diagnostic.
///
/// `sources` holds `(path, content)` for each TOML file that was merged, so
/// spans can be attached to the right file.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let section = error.path.first().cloned();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = attach_source(&error, sources, section.as_deref(), field);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        location: section
                            .as_deref()
                            .map(|s| format!("[{s}]"))
                            .unwrap_or_else(|| "the top level".to_string()),
                        suggestion: closest_key(field, expected).map(str::to_string),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: dotted(&error.path, Some(field.as_ref())),
                },
                Kind::InvalidType(found, expected) => {
                    let (span, src) = match error.path.as_slice() {
                        [section, key] => {
                            attach_source(&error, sources, Some(section.as_str()), key)
                        }
                        _ => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: dotted(&error.path, None),
                        found: found.to_string(),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn dotted(path: &[String], leaf: Option<&str>) -> String {
    path.iter()
        .map(String::as_str)
        .chain(leaf)
        .collect::<Vec<_>>()
        .join(".")
}

/// Picks the file the error came from and locates `key` inside `section`.
fn attach_source(
    error: &figment::Error,
    sources: &[(String, String)],
    section: Option<&str>,
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let source = match origin {
        Some(path) => sources.iter().find(|(p, _)| *p == path),
        // Inline TOML carries no file metadata.
        None if sources.len() == 1 => sources.first(),
        None => None,
    };

    match source.and_then(|(path, content)| {
        locate_key(content, section, key).map(|span| (span, path, content))
    }) {
        Some((span, path, content)) => (
            Some(span),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Span of `key = …` inside `[section]`, or before any header when
/// `section` is `None`.
pub fn locate_key(content: &str, section: Option<&str>, key: &str) -> Option<SourceSpan> {
    let mut current: Option<&str> = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let body = line.trim_start();
        let indent = line.len() - body.len();
        let header = body
            .trim_end()
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'));
        match header {
            Some(name) => current = Some(name.trim()),
            None if current == section => {
                let assigns_key = body
                    .strip_prefix(key)
                    .is_some_and(|rest| rest.trim_start().starts_with('='));
                if assigns_key {
                    return Some(SourceSpan::new((offset + indent).into(), key.len()));
                }
            }
            None => {}
        }
        offset += line.len();
    }
    None
}

/// Closest candidate to `unknown` by Jaro-Winkler similarity, if any is close enough.
pub fn closest_key<'a>(unknown: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (candidate, strsim::jaro_winkler(unknown, candidate)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate)
}

/// Prints every error to stderr as a miette report.
pub fn render_errors(errors: Vec<ConfigError>) {
    let count = errors.len();
    for error in errors {
        eprintln!("{:?}", miette::Report::new(error));
    }
    eprintln!(
        "orderlink: {count} configuration problem{}",
        if count == 1 { "" } else { "s" }
    );
}
