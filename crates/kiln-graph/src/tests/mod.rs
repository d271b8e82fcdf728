
use crate::{DependencyGraph, Label, PackageTree, StoreSnapshot, TargetMetadata};

/// Build a store from `(label, deps)` pairs of `java_library` targets.
pub(crate) fn store_of(edges: &[(&str, &[&str])]) -> StoreSnapshot {
    StoreSnapshot::from_targets(edges.iter().map(|(label, deps)| {
        TargetMetadata::builder(Label::parse(label).unwrap(), "java_library")
            .deps(deps.iter().map(|dep| Label::parse(dep).unwrap()))
            .build()
    }))
}

pub(crate) fn graph_and_tree(store: &StoreSnapshot) -> (DependencyGraph, PackageTree) {
    (DependencyGraph::build(store), PackageTree::from_store(store))
}
