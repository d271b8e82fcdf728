//! Value enums shared by several subcommands.

use clap::ValueEnum;

/// Output format for `order` and `classpath`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per item
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Output format for `graph`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// Graphviz DOT
    #[default]
    Dot,
    /// Nodes, edges, roots and external leaves as JSON
    Json,
}
