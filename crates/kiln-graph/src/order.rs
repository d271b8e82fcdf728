//! Leaf-first package ordering.
//!
//! [`PackageOrderResolver::compute_order`] lifts the label graph to a package
//! graph and runs Kahn's algorithm over it, emitting a package only once every
//! package it depends on has been emitted. Whenever several packages are
//! ready at once the lexically smallest relative path goes first, so the
//! output is stable across runs.
//!
//! True package cycles cannot be ordered. Under [`CyclePolicy::Lenient`] the
//! resolver breaks the cycle by emitting the smallest remaining package and
//! records a [`CycleDetected`] diagnostic; under [`CyclePolicy::Strict`] it
//! stops with [`OrderError::Cycle`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::cancel::CancellationToken;
use crate::graph::DependencyGraph;
use crate::package::PackageTree;

/// How the resolver reacts to a package cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CyclePolicy {
    /// Break the cycle at its lexically smallest package and keep going.
    #[default]
    Lenient,
    /// Fail with [`OrderError::Cycle`].
    Strict,
}

/// Informational diagnostic for a package cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleDetected {
    /// Packages along the cycle, starting and ending at the same package.
    pub cycle: Vec<String>,
    /// The package emitted early to break the cycle.
    pub broken_at: String,
}

impl fmt::Display for CycleDetected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "package cycle {} (broken at '{}')",
            self.cycle.join(" -> "),
            self.broken_at
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("root package '{0}' is not part of the package tree")]
    UnknownRoot(String),

    #[error("{0}")]
    Cycle(CycleDetected),
}

/// A computed order plus the cycles that had to be broken to produce it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderReport {
    pub order: Vec<String>,
    pub cycles: Vec<CycleDetected>,
}

/// Result of an ordering pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    Ordered(OrderReport),
    Cancelled,
}

impl OrderOutcome {
    pub fn into_report(self) -> Option<OrderReport> {
        match self {
            OrderOutcome::Ordered(report) => Some(report),
            OrderOutcome::Cancelled => None,
        }
    }
}

/// Computes leaf-first package orders.
#[derive(Debug, Clone, Default)]
pub struct PackageOrderResolver {
    policy: CyclePolicy,
    cancel: CancellationToken,
}

impl PackageOrderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: CyclePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Order the packages at and below `root`.
    ///
    /// With `scope`, only scoped packages are emitted, but a dependency that
    /// runs through packages outside the scope still constrains the order.
    pub fn compute_order(
        &self,
        tree: &PackageTree,
        root: &str,
        graph: &DependencyGraph,
        scope: Option<&BTreeSet<String>>,
    ) -> Result<OrderOutcome, OrderError> {
        let candidates = candidate_packages(tree, root)
            .ok_or_else(|| OrderError::UnknownRoot(root.to_string()))?;

        let emitted: BTreeSet<String> = match scope {
            Some(scope) => {
                let scope: BTreeSet<String> =
                    scope.iter().map(|p| p.trim_matches('/').to_string()).collect();
                for missing in scope.difference(&candidates) {
                    tracing::warn!(package = %missing, "scoped package is not under the root, ignoring");
                }
                candidates.intersection(&scope).cloned().collect()
            }
            None => candidates,
        };

        let full = package_edges(tree, graph);
        let Some(deps) = self.restrict(&full, &emitted) else {
            return Ok(OrderOutcome::Cancelled);
        };

        self.kahn(&emitted, &deps)
    }

    /// Edges between emitted packages. `P -> Q` when `Q` is reachable from `P`
    /// through packages that are not emitted themselves.
    fn restrict(
        &self,
        full: &BTreeMap<String, BTreeSet<String>>,
        emitted: &BTreeSet<String>,
    ) -> Option<BTreeMap<String, BTreeSet<String>>> {
        let mut restricted = BTreeMap::new();
        for pkg in emitted {
            let mut reached = BTreeSet::new();
            let mut visited = BTreeSet::new();
            let mut stack: Vec<&String> = full.get(pkg).into_iter().flatten().collect();

            while let Some(next) = stack.pop() {
                if self.cancel.is_cancelled() {
                    return None;
                }
                if !visited.insert(next) {
                    continue;
                }
                if emitted.contains(next) {
                    if next != pkg {
                        reached.insert(next.clone());
                    }
                } else {
                    stack.extend(full.get(next).into_iter().flatten());
                }
            }
            restricted.insert(pkg.clone(), reached);
        }
        Some(restricted)
    }

    fn kahn(
        &self,
        nodes: &BTreeSet<String>,
        deps: &BTreeMap<String, BTreeSet<String>>,
    ) -> Result<OrderOutcome, OrderError> {
        let mut remaining: BTreeMap<&str, usize> = nodes
            .iter()
            .map(|pkg| (pkg.as_str(), deps.get(pkg).map_or(0, BTreeSet::len)))
            .collect();

        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (pkg, pkg_deps) in deps {
            for dep in pkg_deps {
                dependents.entry(dep.as_str()).or_default().push(pkg.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(pkg, _)| *pkg)
            .collect();
        let mut report = OrderReport::default();

        while !remaining.is_empty() {
            if self.cancel.is_cancelled() {
                return Ok(OrderOutcome::Cancelled);
            }

            let next = match ready.pop_first() {
                Some(next) => next,
                None => {
                    // Every remaining package waits on another one: a cycle.
                    let Some(smallest) = remaining.keys().next().copied() else {
                        break;
                    };
                    let cycle = find_cycle(smallest, deps, &remaining);
                    if self.policy == CyclePolicy::Strict {
                        return Err(OrderError::Cycle(cycle));
                    }
                    tracing::warn!(%cycle, "breaking package cycle");
                    report.cycles.push(cycle);
                    smallest
                }
            };

            remaining.remove(next);
            report.order.push(next.to_string());

            for dependent in dependents.get(next).into_iter().flatten() {
                if let Some(degree) = remaining.get_mut(dependent) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        Ok(OrderOutcome::Ordered(report))
    }
}

/// Declared packages at or below `root`. A root directory that is not a
/// package itself still selects the packages beneath it.
fn candidate_packages(tree: &PackageTree, root: &str) -> Option<BTreeSet<String>> {
    let root = root.trim_matches('/');
    if let Some(root_pkg) = tree.get(root) {
        let mut candidates: BTreeSet<String> = tree
            .gather_children(root)
            .into_iter()
            .map(|pkg| pkg.relative_path().to_string())
            .collect();
        if root_pkg.is_declared() {
            candidates.insert(root.to_string());
        }
        return Some(candidates);
    }

    let prefix = format!("{root}/");
    let candidates: BTreeSet<String> = tree
        .packages()
        .map(|pkg| pkg.relative_path())
        .filter(|path| path.starts_with(&prefix))
        .map(str::to_string)
        .collect();
    (!candidates.is_empty()).then_some(candidates)
}

/// Package-level edges for every package in the tree. Intra-package edges
/// are dropped; they never affect ordering.
fn package_edges(tree: &PackageTree, graph: &DependencyGraph) -> BTreeMap<String, BTreeSet<String>> {
    let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for label in graph.labels() {
        let Some(from) = tree.owning_package(label) else {
            continue;
        };
        for dep in graph.dependencies(label) {
            let Some(to) = tree.owning_package(dep) else {
                continue;
            };
            if from.relative_path() != to.relative_path() {
                edges
                    .entry(from.relative_path().to_string())
                    .or_default()
                    .insert(to.relative_path().to_string());
            }
        }
    }
    edges
}

/// Walk unresolved dependencies from `start` until a package repeats.
fn find_cycle(
    start: &str,
    deps: &BTreeMap<String, BTreeSet<String>>,
    remaining: &BTreeMap<&str, usize>,
) -> CycleDetected {
    let mut path: Vec<&str> = vec![start];
    let mut current = start;

    loop {
        let next = deps
            .get(current)
            .into_iter()
            .flatten()
            .find(|dep| remaining.contains_key(dep.as_str()));
        let Some(next) = next else {
            break;
        };
        if let Some(at) = path.iter().position(|pkg| *pkg == next.as_str()) {
            let mut cycle: Vec<String> = path[at..].iter().map(|pkg| pkg.to_string()).collect();
            cycle.push(next.clone());
            return CycleDetected {
                cycle,
                broken_at: start.to_string(),
            };
        }
        path.push(next.as_str());
        current = next.as_str();
    }

    CycleDetected {
        cycle: path.iter().map(|pkg| pkg.to_string()).collect(),
        broken_at: start.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::store::StoreSnapshot;
    use crate::target::TargetMetadata;
    use pretty_assertions::assert_eq;

    fn fixture(edges: &[(&str, &[&str])]) -> (PackageTree, DependencyGraph) {
        let store = StoreSnapshot::from_targets(edges.iter().map(|(from, deps)| {
            TargetMetadata::builder(Label::parse(from).unwrap(), "java_library")
                .deps(deps.iter().map(|d| Label::parse(d).unwrap()))
                .build()
        }));
        (PackageTree::from_store(&store), DependencyGraph::build(&store))
    }

    fn order(tree: &PackageTree, graph: &DependencyGraph, scope: Option<&[&str]>) -> OrderReport {
        let scope: Option<BTreeSet<String>> =
            scope.map(|s| s.iter().map(|p| p.to_string()).collect());
        PackageOrderResolver::new()
            .compute_order(tree, "", graph, scope.as_ref())
            .unwrap()
            .into_report()
            .unwrap()
    }

    #[test]
    fn chain_is_leaf_first() {
        let (tree, graph) = fixture(&[
            ("//p1:lib", &["//p2:lib"]),
            ("//p2:lib", &["//p3:lib"]),
            ("//p3:lib", &[]),
        ]);
        let report = order(&tree, &graph, None);
        assert_eq!(report.order, vec!["p3", "p2", "p1"]);
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn ties_break_lexically() {
        let (tree, graph) = fixture(&[
            ("//zeta:lib", &["//base:lib"]),
            ("//alpha:lib", &["//base:lib"]),
            ("//mid:lib", &[]),
            ("//base:lib", &[]),
        ]);
        let report = order(&tree, &graph, None);
        assert_eq!(report.order, vec!["base", "alpha", "mid", "zeta"]);
    }

    #[test]
    fn intra_package_cycle_emits_package_once() {
        let (tree, graph) = fixture(&[("//a:1", &["//a:2"]), ("//a:2", &["//a:1"])]);
        let report = order(&tree, &graph, None);
        assert_eq!(report.order, vec!["a"]);
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn package_cycle_is_broken_at_smallest() {
        let (tree, graph) = fixture(&[
            ("//b:lib", &["//a:lib"]),
            ("//a:lib", &["//b:lib"]),
            ("//c:lib", &["//a:lib"]),
        ]);
        let report = order(&tree, &graph, None);
        assert_eq!(report.order, vec!["a", "b", "c"]);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(report.cycles[0].broken_at, "a");
        assert_eq!(report.cycles[0].cycle, vec!["a", "b", "a"]);
    }

    #[test]
    fn strict_policy_reports_cycle() {
        let (tree, graph) = fixture(&[("//b:lib", &["//a:lib"]), ("//a:lib", &["//b:lib"])]);
        let result = PackageOrderResolver::new()
            .with_policy(CyclePolicy::Strict)
            .compute_order(&tree, "", &graph, None);
        assert!(matches!(result, Err(OrderError::Cycle(_))));
    }

    #[test]
    fn scope_keeps_transitive_facts() {
        // x -> hidden -> y, with `hidden` outside the scope.
        let (tree, graph) = fixture(&[
            ("//x:lib", &["//hidden:lib"]),
            ("//hidden:lib", &["//y:lib"]),
            ("//y:lib", &[]),
            ("//w:lib", &[]),
        ]);
        let report = order(&tree, &graph, Some(&["x", "y"]));
        assert_eq!(report.order, vec!["y", "x"]);
    }

    #[test]
    fn root_restricts_to_subtree() {
        let (tree, graph) = fixture(&[
            ("//svc/api:lib", &["//svc/core:lib", "//common:lib"]),
            ("//svc/core:lib", &[]),
            ("//common:lib", &[]),
        ]);
        let outcome = PackageOrderResolver::new()
            .compute_order(&tree, "svc", &graph, None)
            .unwrap();
        // `svc` itself owns no targets; only its children are ordered.
        assert_eq!(
            outcome.into_report().unwrap().order,
            vec!["svc/core", "svc/api"]
        );
    }

    #[test]
    fn unknown_root_is_an_error() {
        let (tree, graph) = fixture(&[("//a:lib", &[])]);
        let result = PackageOrderResolver::new().compute_order(&tree, "nope", &graph, None);
        assert!(matches!(result, Err(OrderError::UnknownRoot(_))));
    }

    #[test]
    fn cancellation_short_circuits() {
        let (tree, graph) = fixture(&[("//a:lib", &["//b:lib"]), ("//b:lib", &[])]);
        let token = CancellationToken::new();
        token.cancel();
        let outcome = PackageOrderResolver::new()
            .with_cancellation(token)
            .compute_order(&tree, "", &graph, None)
            .unwrap();
        assert_eq!(outcome, OrderOutcome::Cancelled);
    }

    #[test]
    fn empty_graph_gives_empty_order() {
        let (tree, graph) = fixture(&[]);
        assert!(order(&tree, &graph, None).order.is_empty());
    }
}
