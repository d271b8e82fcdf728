//! `kiln graph`: export the target dependency graph.

use kiln_graph::DependencyGraph;

use crate::cli::{GraphArgs, GraphFormat};
use crate::commands::{Workspace, write_stdout};
use crate::error::CliError;
use crate::ui;

pub fn execute(args: GraphArgs, workspace: &Workspace) -> anyhow::Result<()> {
    let snapshot = workspace.load_snapshot(&args.source)?;
    let graph = DependencyGraph::build(&snapshot);

    let output = if args.roots {
        render_roots(&graph, args.format)?
    } else {
        match args.format {
            GraphFormat::Dot => graph.to_dot(),
            GraphFormat::Json => graph.to_json().map_err(CliError::from)?,
        }
    };
    write_stdout(&output)?;

    ui::info(&format!(
        "{}, {}, {}",
        ui::plural(graph.len(), "target"),
        ui::plural(graph.edge_count(), "edge"),
        ui::plural(graph.external_leaves().count(), "external label")
    ));
    Ok(())
}

/// Labels nothing depends on: one per line, or a JSON array.
fn render_roots(graph: &DependencyGraph, format: GraphFormat) -> serde_json::Result<String> {
    let roots: Vec<&str> = graph.roots().map(|label| label.as_str()).collect();
    match format {
        GraphFormat::Dot => Ok(roots.iter().map(|root| format!("{root}\n")).collect()),
        GraphFormat::Json => serde_json::to_string_pretty(&roots),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_graph::{Label, StoreSnapshot, TargetMetadata};
    use pretty_assertions::assert_eq;

    fn graph() -> DependencyGraph {
        let label = |raw: &str| Label::parse(raw).unwrap();
        let store = StoreSnapshot::from_targets([
            TargetMetadata::builder(label("//a:lib"), "java_library").build(),
            TargetMetadata::builder(label("//b:lib"), "java_library")
                .deps([label("//a:lib")])
                .build(),
            TargetMetadata::builder(label("//c:bin"), "java_binary")
                .deps([label("//a:lib")])
                .build(),
        ]);
        DependencyGraph::build(&store)
    }

    #[test]
    fn roots_one_per_line() {
        assert_eq!(
            render_roots(&graph(), GraphFormat::Dot).unwrap(),
            "//b:lib\n//c:bin\n"
        );
    }

    #[test]
    fn roots_as_json_array() {
        let roots: Vec<String> =
            serde_json::from_str(&render_roots(&graph(), GraphFormat::Json).unwrap()).unwrap();
        assert_eq!(roots, vec!["//b:lib", "//c:bin"]);
    }
}
