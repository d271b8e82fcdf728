//! Command implementations for the kiln CLI.
//!
//! - [`order`] - leaf-first package order
//! - [`classpath`] - classpath resolution
//! - [`graph`] - dependency graph export
//! - [`params`] - test params-file aggregation
//!
//! Each command module exposes an `execute` function taking its parsed
//! arguments and the [`Workspace`] built from `kiln.toml`.

pub mod classpath;
pub mod graph;
pub mod order;
pub mod params;
mod workspace;

use std::io::Write;

use anyhow::Context;
use kiln_config::{ConfigDiscovery, KilnConfig};

use crate::cli::{Cli, Command};
use crate::error::{CliError, Result};

pub use classpath::execute as classpath_execute;
pub use graph::execute as graph_execute;
pub use order::execute as order_execute;
pub use params::execute as params_execute;
pub use workspace::Workspace;

/// Discover `kiln.toml` from `--cwd` (or the current directory) and apply
/// `--profile`.
pub fn load_config(args: &Cli) -> Result<KilnConfig> {
    let current = std::env::current_dir()?;
    let start = match &args.cwd {
        Some(dir) => current.join(dir),
        None => current,
    };
    if !start.is_dir() {
        return Err(CliError::FileNotFound(start));
    }
    Ok(ConfigDiscovery::new(start).load_with_profile(args.profile.as_deref())?)
}

/// Size rayon's global pool from `settings.parallel_jobs`.
pub fn configure_thread_pool(jobs: Option<usize>) {
    let Some(jobs) = jobs else {
        return;
    };
    match rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global() {
        Ok(()) => tracing::debug!(jobs, "configured resolution thread pool"),
        Err(err) => tracing::debug!(error = %err, "thread pool already initialised"),
    }
}

/// Run `command` against the workspace described by `config`.
pub fn execute(command: Command, config: KilnConfig) -> anyhow::Result<()> {
    let workspace = Workspace::new(config);
    match command {
        Command::Order(args) => order_execute(args, &workspace),
        Command::Classpath(args) => classpath_execute(args, &workspace),
        Command::Graph(args) => graph_execute(args, &workspace),
        Command::Params(args) => params_execute(args, &workspace),
    }
}

/// Write command output to stdout, adding a trailing newline if missing.
pub(crate) fn write_stdout(output: &str) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|()| {
            if output.is_empty() || output.ends_with('\n') {
                Ok(())
            } else {
                stdout.write_all(b"\n")
            }
        })
        .and_then(|()| stdout.flush())
        .context("failed to write to stdout")
}
