//! Error handling for the kiln CLI.
//!
//! Commands return `anyhow::Result` and raise a [`CliError`] wherever a
//! failure deserves a specific hint. `main` renders both through miette:
//! [`CliError`]s with their code and help text, anything else as a plain
//! error chain.

use std::path::PathBuf;

use kiln_config::ConfigError;
use kiln_graph::{CycleDetected, LabelError, OrderError};
use miette::{Diagnostic, Report};
use thiserror::Error;

/// Failures the CLI reports with a hint. Every variant exits non-zero.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(kiln::config),
        help("Check kiln.toml and any KILN_* environment variables")
    )]
    Config(#[from] ConfigError),

    #[error("Invalid label '{label}': {source}")]
    #[diagnostic(
        code(kiln::label),
        help("Labels are absolute, e.g. //services/api:server or @maven//:guava")
    )]
    InvalidLabel {
        label: String,
        #[source]
        source: LabelError,
    },

    #[error("Aspect output not found: {}", .0.display())]
    #[diagnostic(
        code(kiln::aspects),
        help("Build with the kiln aspect first, or point --aspects / aspect_dir at its output")
    )]
    AspectsNotFound(PathBuf),

    #[error("File not found: {}", .0.display())]
    #[diagnostic(code(kiln::file))]
    FileNotFound(PathBuf),

    #[error("Root package '{0}' is not part of the workspace")]
    #[diagnostic(
        code(kiln::order::root),
        help("Pass a package path relative to the workspace root, e.g. --root services/api")
    )]
    UnknownRoot(String),

    #[error("Cannot order packages: {0}")]
    #[diagnostic(
        code(kiln::order::cycle),
        help("Break the dependency cycle, or drop --strict / order.strict to order leniently")
    )]
    Cycle(CycleDetected),

    #[error("Classpath cache error: {0}")]
    #[diagnostic(
        code(kiln::cache),
        help("Delete the cache directory or rerun with --no-cache")
    )]
    Cache(#[from] kiln_classpath::CacheError),

    #[error("Operation was cancelled")]
    #[diagnostic(code(kiln::cancelled))]
    Cancelled,

    #[error("I/O error: {0}")]
    #[diagnostic(code(kiln::io))]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    #[diagnostic(code(kiln::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(kiln::graph))]
    Graph(#[from] kiln_graph::Error),
}

impl From<OrderError> for CliError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::UnknownRoot(root) => CliError::UnknownRoot(root),
            OrderError::Cycle(cycle) => CliError::Cycle(cycle),
        }
    }
}

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

pub fn cli_error_to_miette(err: CliError) -> Report {
    Report::new(err)
}

/// Render a command failure, keeping the hints of a wrapped [`CliError`].
pub fn to_miette(err: anyhow::Error) -> Report {
    match err.downcast::<CliError>() {
        Ok(cli) => cli_error_to_miette(cli),
        Err(other) => miette::miette!("{other:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn cycle_keeps_its_hint() {
        let err = CliError::from(OrderError::Cycle(CycleDetected {
            cycle: vec!["a".into(), "b".into(), "a".into()],
            broken_at: "a".into(),
        }));
        assert!(matches!(err, CliError::Cycle(_)));
        assert!(err.help().is_some());
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn wrapped_cli_errors_survive_anyhow() {
        let err = anyhow::Error::from(CliError::UnknownRoot("nope".into()));
        let report = to_miette(err);
        assert_eq!(
            report.code().map(|code| code.to_string()),
            Some("kiln::order::root".to_string())
        );
    }

    #[test]
    fn other_errors_render_their_chain() {
        let err = Err::<(), _>(std::io::Error::other("disk full"))
            .context("writing output")
            .unwrap_err();
        let report = to_miette(err);
        assert_eq!(report.to_string(), "writing output: disk full");
    }
}
