//! # kiln-graph
//!
//! Build-target metadata model, dependency graph and package ordering.
//!
//! The build tool's analysis aspect writes one JSON metadata file per target.
//! This crate parses those files into [`TargetMetadata`], keeps them in a
//! snapshot-swapped [`MetadataStore`], derives an immutable
//! [`DependencyGraph`] from a store snapshot and orders workspace packages
//! leaf-first with [`PackageOrderResolver`].
//!
//! ## Architecture
//!
//! ```text
//!  *.kiln-build.json ──▶ AspectDirectory ─┐
//!                                         ├─▶ MetadataStore ──▶ StoreSnapshot
//!  BUILD attributes ──▶ BuildRuleAttributes┘        (Arc swap)        │
//!                                                                     ▼
//!                                   PackageTree ◀──────────── DependencyGraph
//!                                        │                            │
//!                                        └──▶ PackageOrderResolver ◀──┘
//!                                                   │
//!                                                   ▼
//!                                   OrderReport { order, cycles }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kiln_graph::{
//!     AspectDirectory, DependencyGraph, MetadataStore, NativeRuntime, PackageOrderResolver,
//!     PackageTree,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MetadataStore::new();
//! let source = AspectDirectory::new("bazel-bin/aspects", Arc::new(NativeRuntime::new()));
//! let report = store.merge_from(&source);
//! println!("parsed {} targets, skipped {}", report.parsed, report.skipped.len());
//!
//! let snapshot = store.snapshot();
//! let graph = DependencyGraph::build(&snapshot);
//! let tree = PackageTree::from_store(&snapshot);
//! let outcome = PackageOrderResolver::new().compute_order(&tree, "", &graph, None)?;
//! if let Some(report) = outcome.into_report() {
//!     for package in report.order {
//!         println!("{package}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! Store snapshots and graphs are `Arc`-backed and immutable; readers never
//! observe a half-applied update. Long walks take a [`CancellationToken`] and
//! check it between node visits.

pub mod build_rule;
pub mod cancel;
pub mod graph;
pub mod kind;
pub mod label;
pub mod metadata;
pub mod order;
pub mod package;
pub mod runtime;
pub mod store;
pub mod target;

pub use build_rule::{BuildRuleAttributes, SourceSets};
pub use cancel::CancellationToken;
pub use graph::DependencyGraph;
pub use kind::RuleKind;
pub use label::{Label, LabelError};
pub use metadata::{
    AspectDirectory, InMemorySource, LoadReport, MetadataBatch, MetadataError, MetadataSource,
    is_metadata_file, parse_target_info,
};
pub use order::{
    CycleDetected, CyclePolicy, OrderError, OrderOutcome, OrderReport, PackageOrderResolver,
};
pub use package::{Package, PackageTree};
pub use runtime::{NativeRuntime, Runtime, RuntimeError, RuntimeResult};
pub use store::{MetadataStore, StoreSnapshot};
pub use target::{OutputJars, TargetMetadata};

#[cfg(any(test, feature = "test-utils"))]
pub use runtime::MemoryRuntime;

/// Error types for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Export to an external format failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
