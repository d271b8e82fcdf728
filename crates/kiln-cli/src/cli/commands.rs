use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::cli::enums::{GraphFormat, OutputFormat};

/// Available kiln subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print workspace packages leaf-first
    ///
    /// Every package appears after all packages it depends on, so importing
    /// them in this order never references a package that is not there yet.
    /// Cycles are broken at their smallest package and reported, unless
    /// --strict is given.
    Order(OrderArgs),

    /// Resolve the classpath of one or more targets
    ///
    /// Prints jars in classpath order, grouped Main, Runtime, Test. Results
    /// with missing metadata or jars are still printed, with a warning.
    Classpath(ClasspathArgs),

    /// Export the target dependency graph
    Graph(GraphArgs),

    /// List the jars in test deploy-jar params files
    Params(ParamsArgs),
}

/// Where to read aspect output from.
#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    /// Directory holding the aspect's metadata files
    ///
    /// Overrides `aspect_dir` from kiln.toml.
    #[arg(long, value_name = "DIR")]
    pub aspects: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Only order packages at and below this package
    ///
    /// A package path relative to the workspace root, e.g. services/api.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Only emit these packages
    ///
    /// Dependencies that run through packages outside the scope still
    /// constrain the order. Repeat to scope several packages.
    #[arg(long = "scope", value_name = "PKG")]
    pub scopes: Vec<String>,

    /// Fail on a package cycle instead of breaking it
    #[arg(long)]
    pub strict: bool,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ClasspathArgs {
    /// Target labels to resolve, e.g. //services/api:server
    #[arg(required = true, value_name = "LABEL")]
    pub labels: Vec<String>,

    /// Include the test scope
    ///
    /// Pulls in the dependencies of sibling test targets and, for test
    /// rules, the implicit test runner.
    #[arg(long)]
    pub test: bool,

    /// Extra runtime dependency injected into every classpath
    ///
    /// Added to `implicit_runtime_deps` from kiln.toml.
    #[arg(long = "implicit", value_name = "LABEL")]
    pub implicit: Vec<String>,

    /// Neither read nor write the classpath cache
    #[arg(long)]
    pub no_cache: bool,

    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct GraphArgs {
    #[arg(short = 'f', long, value_enum, default_value_t = GraphFormat::Dot)]
    pub format: GraphFormat,

    /// Print only the labels nothing depends on
    #[arg(long)]
    pub roots: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// Params files to read, in classpath order
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Leave out `_deploy.jar` outputs
    #[arg(long)]
    pub exclude_deploy: bool,
}
