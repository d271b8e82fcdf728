//! kiln CLI - package ordering and JVM classpaths from build-tool aspect
//! output.
//!
//! The library half of the `kiln` binary. Everything the binary does is
//! reachable from here so integration tests can drive commands directly.
//!
//! # Architecture
//!
//! - [`cli`] - clap definitions for the global flags and subcommands
//! - [`commands`] - one module per subcommand plus the shared [`commands::Workspace`]
//! - [`error`] - [`CliError`] with miette hints
//! - [`logger`] - `tracing-subscriber` setup
//! - [`ui`] - styled status messages on stderr
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::{cli::SourceArgs, commands, logger};
//! use kiln_config::ConfigDiscovery;
//!
//! # fn main() -> anyhow::Result<()> {
//! logger::init_logger(false, false, true, None);
//! let config = ConfigDiscovery::new(".").load_with_profile(None)?;
//! let workspace = commands::Workspace::new(config);
//! let snapshot = workspace.load_snapshot(&SourceArgs::default())?;
//! println!("{} targets", snapshot.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
