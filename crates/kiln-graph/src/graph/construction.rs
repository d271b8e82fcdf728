//! Building a graph from a store snapshot.

use std::collections::BTreeSet;

use super::{DependencyGraph, GraphInner};
use crate::store::StoreSnapshot;

impl DependencyGraph {
    /// Build the graph for a store snapshot.
    ///
    /// Edges are only added between labels present in the snapshot. A
    /// dependency on a label the store has never seen becomes an external
    /// leaf instead of an error. Self-loops are kept as-is.
    pub fn build(store: &StoreSnapshot) -> Self {
        let mut inner = GraphInner {
            nodes: store.all_labels(),
            generation: store.generation(),
            ..GraphInner::default()
        };

        for target in store.targets() {
            let from = target.label();
            for dep in target.all_deps() {
                if store.contains(dep) {
                    inner
                        .dependencies
                        .entry(from.clone())
                        .or_default()
                        .insert(dep.clone());
                    inner
                        .dependents
                        .entry(dep.clone())
                        .or_default()
                        .insert(from.clone());
                } else {
                    inner
                        .external
                        .entry(dep.clone())
                        .or_default()
                        .insert(from.clone());
                }
            }
        }

        let referenced: BTreeSet<_> = inner.dependents.keys().cloned().collect();
        inner.roots = inner.nodes.difference(&referenced).cloned().collect();

        tracing::debug!(
            nodes = inner.nodes.len(),
            roots = inner.roots.len(),
            external = inner.external.len(),
            "built dependency graph"
        );

        DependencyGraph::from_inner(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::target::TargetMetadata;

    fn label(s: &str) -> Label {
        Label::parse(s).unwrap()
    }

    fn target(name: &str, deps: &[&str], runtime: &[&str]) -> TargetMetadata {
        TargetMetadata::builder(label(name), "java_library")
            .deps(deps.iter().map(|d| label(d)))
            .runtime_deps(runtime.iter().map(|d| label(d)))
            .build()
    }

    #[test]
    fn empty_store_builds_empty_graph() {
        let graph = DependencyGraph::build(&StoreSnapshot::default());
        assert!(graph.is_empty());
        assert_eq!(graph.roots().count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn edges_cover_deps_and_runtime_deps() {
        let store = StoreSnapshot::from_targets([
            target("//app:bin", &["//lib:core"], &["//rt:agent"]),
            target("//lib:core", &[], &[]),
            target("//rt:agent", &[], &[]),
        ]);
        let graph = DependencyGraph::build(&store);

        let deps: Vec<_> = graph.dependencies(&label("//app:bin")).map(Label::as_str).collect();
        assert_eq!(deps, vec!["//lib:core", "//rt:agent"]);
        let roots: Vec<_> = graph.roots().map(Label::as_str).collect();
        assert_eq!(roots, vec!["//app:bin"]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn dangling_references_become_external_leaves() {
        let store = StoreSnapshot::from_targets([target(
            "//a:lib",
            &["@maven//:guava", "//missing:lib"],
            &[],
        )]);
        let graph = DependencyGraph::build(&store);

        assert_eq!(graph.dependencies(&label("//a:lib")).count(), 0);
        let external: Vec<_> = graph.external_leaves().map(Label::as_str).collect();
        assert_eq!(external, vec!["//missing:lib", "@maven//:guava"]);
        assert!(!graph.contains(&label("@maven//:guava")));
    }

    #[test]
    fn self_loops_are_retained() {
        let store = StoreSnapshot::from_targets([target("//a:lib", &["//a:lib"], &[])]);
        let graph = DependencyGraph::build(&store);

        assert!(graph.dependencies(&label("//a:lib")).any(|d| d == &label("//a:lib")));
        // The only incoming edge is its own, so it is not a root.
        assert_eq!(graph.roots().count(), 0);
    }
}
