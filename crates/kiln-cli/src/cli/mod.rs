//! Command-line interface definition for kiln.
//!
//! # Command Structure
//!
//! - `kiln order` - leaf-first package order
//! - `kiln classpath` - resolved classpath of one or more targets
//! - `kiln graph` - the target dependency graph as DOT or JSON
//! - `kiln params` - test jars listed in deploy-jar params files

mod commands;
pub mod enums;
#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::Parser;

pub use commands::{ClasspathArgs, Command, GraphArgs, OrderArgs, ParamsArgs, SourceArgs};
pub use enums::*;

/// kiln - build-graph metadata for JVM IDE integrations
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Package ordering and JVM classpaths from build-tool aspect output",
    long_about = "kiln reads the per-target metadata files written by a build aspect,\n\
                  orders workspace packages leaf-first and resolves the classpath of\n\
                  any target, tagging every jar with its Main, Runtime or Test scope."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration profile from kiln.toml to apply
    #[arg(short, long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Directory to start the kiln.toml search from
    ///
    /// Defaults to the current directory. Without a kiln.toml, it also
    /// becomes the workspace root.
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
