//! Resolving many targets at once.

use std::collections::BTreeMap;

use kiln_graph::{DependencyGraph, Label, StoreSnapshot};
use rayon::prelude::*;

use crate::engine::{ClasspathEngine, ResolveRequest};
use crate::entry::ResolveOutcome;

/// Resolve every request in parallel against one graph and store snapshot.
///
/// Results are keyed by target label. Cancelling the engine's token stops
/// the remaining resolutions, which then report `Cancelled`.
pub fn resolve_all(
    engine: &ClasspathEngine,
    requests: &[ResolveRequest],
    graph: &DependencyGraph,
    store: &StoreSnapshot,
) -> BTreeMap<Label, ResolveOutcome> {
    let outcomes: Vec<(Label, ResolveOutcome)> = requests
        .par_iter()
        .map(|request| (request.target.clone(), engine.resolve(request, graph, store)))
        .collect();

    tracing::debug!(targets = outcomes.len(), "resolved classpaths in parallel");
    outcomes.into_iter().collect()
}

/// One request per label, sharing the same options.
pub fn requests_for<'a>(
    labels: impl IntoIterator<Item = &'a Label>,
    include_test_scope: bool,
    implicit_runtime_deps: &[Label],
) -> Vec<ResolveRequest> {
    labels
        .into_iter()
        .map(|label| {
            ResolveRequest::new(label.clone())
                .with_test_scope(include_test_scope)
                .with_implicit_runtime_deps(implicit_runtime_deps.iter().cloned())
        })
        .collect()
}
