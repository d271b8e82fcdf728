//! The label dependency graph.
//!
//! A [`DependencyGraph`] is an immutable snapshot derived from one
//! [`StoreSnapshot`](crate::StoreSnapshot). It holds forward edges
//! (`label -> deps ∪ runtime_deps`), the matching reverse edges, the root
//! labels and the external leaves. It is cheap to clone and safe to share
//! across resolver threads; rebuilding after a store change produces a new
//! graph rather than mutating this one.

mod construction;
mod queries;
mod serialization;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;

use crate::label::Label;

/// Immutable dependency graph over build labels.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    inner: Arc<GraphInner>,
}

#[derive(Debug, Default)]
pub(crate) struct GraphInner {
    /// Every analysed label, sorted.
    pub(crate) nodes: BTreeSet<Label>,
    /// Forward edges between analysed labels.
    pub(crate) dependencies: HashMap<Label, BTreeSet<Label>>,
    /// Reverse edges between analysed labels.
    pub(crate) dependents: HashMap<Label, BTreeSet<Label>>,
    /// Labels nothing depends on.
    pub(crate) roots: BTreeSet<Label>,
    /// Referenced but unanalysed labels, with the labels that reference them.
    pub(crate) external: BTreeMap<Label, BTreeSet<Label>>,
    /// Generation of the store snapshot this graph was built from.
    pub(crate) generation: u64,
}

impl DependencyGraph {
    pub(crate) fn from_inner(inner: GraphInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Generation of the store snapshot the graph was built from.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    /// Number of analysed labels.
    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }

    /// Number of edges between analysed labels.
    pub fn edge_count(&self) -> usize {
        self.inner.dependencies.values().map(BTreeSet::len).sum()
    }
}
