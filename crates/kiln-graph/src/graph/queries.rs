//! Read-only queries over the dependency graph.

use std::collections::{BTreeSet, VecDeque};

use rustc_hash::FxHashSet as HashSet;

use super::DependencyGraph;
use crate::label::Label;

impl DependencyGraph {
    /// Every analysed label, in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.inner.nodes.iter()
    }

    /// Whether `label` was analysed (external leaves are not nodes).
    pub fn contains(&self, label: &Label) -> bool {
        self.inner.nodes.contains(label)
    }

    /// Direct dependencies of `label`, sorted. Empty for unknown labels.
    pub fn dependencies(&self, label: &Label) -> impl Iterator<Item = &Label> {
        self.inner.dependencies.get(label).into_iter().flatten()
    }

    /// Labels that directly depend on `label`, sorted.
    pub fn dependents(&self, label: &Label) -> impl Iterator<Item = &Label> {
        self.inner.dependents.get(label).into_iter().flatten()
    }

    /// Labels with no incoming edges.
    pub fn roots(&self) -> impl Iterator<Item = &Label> {
        self.inner.roots.iter()
    }

    /// Analysed labels with no outgoing edges.
    pub fn leaves(&self) -> impl Iterator<Item = &Label> {
        self.inner.nodes.iter().filter(|label| {
            self.inner
                .dependencies
                .get(*label)
                .is_none_or(BTreeSet::is_empty)
        })
    }

    /// Leaves that live in the workspace, skipping `@repo` labels.
    pub fn leaves_excluding_external(&self) -> impl Iterator<Item = &Label> {
        self.leaves().filter(|label| !label.is_external())
    }

    /// Referenced labels that have no metadata of their own.
    pub fn external_leaves(&self) -> impl Iterator<Item = &Label> {
        self.inner.external.keys()
    }

    /// Labels that reference the external leaf `label`.
    pub fn external_referrers(&self, label: &Label) -> impl Iterator<Item = &Label> {
        self.inner.external.get(label).into_iter().flatten()
    }

    /// Whether `from` depends on `to`, directly or transitively.
    ///
    /// Cycles are safe: each label is expanded at most once per call.
    pub fn is_dependency(&self, from: &Label, to: &Label) -> bool {
        let mut visited: HashSet<&Label> = HashSet::default();
        let mut stack: Vec<&Label> = self.dependencies(from).collect();

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if visited.insert(current) {
                stack.extend(self.dependencies(current));
            }
        }
        false
    }

    /// Every label reachable from `label`, excluding `label` itself.
    pub fn transitive_dependencies(&self, label: &Label) -> BTreeSet<Label> {
        let mut seen: BTreeSet<Label> = BTreeSet::new();
        let mut queue: VecDeque<&Label> = self.dependencies(label).collect();

        while let Some(current) = queue.pop_front() {
            if current == label || !seen.insert(current.clone()) {
                continue;
            }
            queue.extend(self.dependencies(current));
        }
        seen
    }
}
