//! Export formats for the dependency graph.

use std::collections::BTreeSet;

use serde::Serialize;

use super::DependencyGraph;
use crate::label::Label;
use crate::{Error, Result};

/// Helper to escape labels for DOT format.
fn escape_label(label: &str) -> String {
    label.replace('"', "\\\"")
}

#[derive(Serialize)]
struct GraphJson<'a> {
    nodes: Vec<NodeJson<'a>>,
    roots: Vec<&'a Label>,
    external: Vec<&'a Label>,
}

#[derive(Serialize)]
struct NodeJson<'a> {
    label: &'a Label,
    deps: Vec<&'a Label>,
}

impl DependencyGraph {
    /// Export the graph as DOT format for visualization. External leaves are
    /// drawn dashed.
    pub fn to_dot(&self) -> String {
        let mut output = String::from("digraph DependencyGraph {\n");

        for label in self.labels() {
            output.push_str("    \"");
            output.push_str(&escape_label(label.as_str()));
            output.push_str("\";\n");
        }
        for label in self.external_leaves() {
            output.push_str("    \"");
            output.push_str(&escape_label(label.as_str()));
            output.push_str("\" [style=dashed];\n");
        }

        for from in self.labels() {
            let externals = self
                .inner
                .external
                .iter()
                .filter(|(_, referrers)| referrers.contains(from))
                .map(|(to, _)| to);
            let targets: BTreeSet<&Label> = self.dependencies(from).chain(externals).collect();
            for to in targets {
                output.push_str("    \"");
                output.push_str(&escape_label(from.as_str()));
                output.push_str("\" -> \"");
                output.push_str(&escape_label(to.as_str()));
                output.push_str("\";\n");
            }
        }

        output.push_str("}\n");
        output
    }

    /// Export nodes, edges, roots and external leaves as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        let graph = GraphJson {
            nodes: self
                .labels()
                .map(|label| NodeJson {
                    label,
                    deps: self.dependencies(label).collect(),
                })
                .collect(),
            roots: self.roots().collect(),
            external: self.external_leaves().collect(),
        };

        serde_json::to_string_pretty(&graph)
            .map_err(|e| Error::Serialization(format!("failed to serialize graph: {e}")))
    }
}
