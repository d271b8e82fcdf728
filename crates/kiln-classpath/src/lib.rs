//! # kiln-classpath
//!
//! JVM classpath resolution over a kiln dependency graph.
//!
//! Given a target label, the [`ClasspathEngine`] walks the target's
//! dependencies in a store snapshot and produces an ordered, deduplicated
//! [`ClasspathResult`]: jar entries tagged with their [`Scope`], project
//! references for packages consumed from source, and diagnostics explaining
//! anything that made the result incomplete.
//!
//! ## Architecture
//!
//! ```text
//!   KilnContext ──refresh──▶ MetadataStore ──▶ GraphView { store, graph, fingerprint }
//!        │                                               │
//!        ├──resolve──▶ ClasspathCache (hit?) ────────────┤
//!        │                    ▲                          ▼
//!        │                    └───────save────── ClasspathEngine ──▶ Runtime (jar checks)
//!        │                                               │
//!        └──resolve_all──▶ rayon ───────────────────────▶┘
//!                                                        ▼
//!                                   ClasspathResult ──▶ ClasspathDocument (JSON)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kiln_classpath::{ClasspathEngine, KilnContext, ResolveRequest};
//! use kiln_graph::{AspectDirectory, Label, NativeRuntime};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = Arc::new(NativeRuntime::new());
//! let engine = ClasspathEngine::builder()
//!     .runtime(runtime.clone())
//!     .execution_root("/workspace/bazel-workspace")
//!     .build();
//! let source = AspectDirectory::new("/workspace/bazel-bin", runtime);
//! let context = KilnContext::new(Box::new(source), engine);
//! context.refresh();
//!
//! let request = ResolveRequest::new(Label::parse("//app:server")?).with_test_scope(true);
//! if let Some(result) = context.resolve(&request).into_result() {
//!     for entry in &result.entries {
//!         println!("{entry}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod context;
pub mod engine;
pub mod entry;
pub mod implicit;
pub mod parallel;
pub mod params;
pub mod source_jar;
pub mod wire;

pub use cache::{
    CacheConfig, CacheError, CacheKey, CacheResult, ClasspathCache, MemoryClasspathCache,
    RedbClasspathCache, StoreFingerprint,
};
pub use context::{GraphView, KilnContext};
pub use engine::{ClasspathEngine, ClasspathEngineBuilder, ResolveRequest};
pub use entry::{ClasspathEntry, ClasspathResult, Diagnostic, EntryKey, ResolveOutcome, Scope};
pub use implicit::{find_test_runner_jar, implicit_test_jars};
pub use parallel::{requests_for, resolve_all};
pub use params::{aggregate_test_jars, params_file_for, parse_test_params};
pub use source_jar::{find_source_jar, source_jar_candidates};
pub use wire::{ClasspathDocument, WireEntry};

/// Error types for classpath operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Graph(#[from] kiln_graph::Error),

    /// Encoding or decoding the wire document failed.
    #[error("wire format error: {0}")]
    Wire(#[from] serde_json::Error),
}

/// Result type alias for classpath operations.
pub type Result<T> = std::result::Result<T, Error>;
