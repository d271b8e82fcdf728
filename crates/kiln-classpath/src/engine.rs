//! The classpath resolution engine.
//!
//! Resolution walks one store snapshot and its dependency graph:
//!
//! 1. **Main**: the target's `deps`, transitively, in depth-first pre-order
//!    with children visited in sorted order; the target itself comes last.
//! 2. **Runtime**: the `runtime_deps` of everything visited so far, plus the
//!    configured implicit runtime deps. Everything a runtime dep pulls in is
//!    runtime as well.
//! 3. **Test**: with the test scope enabled, when the target is a test rule
//!    or a test target in its package depends on it, the deps and runtime
//!    deps of the other test targets in the package, followed transitively
//!    through both edge kinds.
//!
//! Each visited label then contributes either a project reference (its
//! package is an in-workspace package other than the target's own) or its
//! output jars. A jar reachable through several scopes keeps the strongest.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_graph::{
    CancellationToken, DependencyGraph, Label, NativeRuntime, Runtime, StoreSnapshot,
    TargetMetadata,
};
use path_clean::PathClean;
use rustc_hash::FxHashSet as HashSet;

use crate::entry::{ClasspathEntry, ClasspathResult, Diagnostic, EntrySet, ResolveOutcome, Scope};
use crate::implicit::implicit_test_jars;
use crate::source_jar::find_source_jar;

/// What to resolve.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub target: Label,
    pub include_test_scope: bool,
    pub implicit_runtime_deps: Vec<Label>,
}

impl ResolveRequest {
    pub fn new(target: Label) -> Self {
        Self {
            target,
            include_test_scope: false,
            implicit_runtime_deps: Vec::new(),
        }
    }

    pub fn with_test_scope(mut self, include: bool) -> Self {
        self.include_test_scope = include;
        self
    }

    pub fn with_implicit_runtime_deps(mut self, deps: impl IntoIterator<Item = Label>) -> Self {
        self.implicit_runtime_deps = deps.into_iter().collect();
        self
    }
}

/// Resolves classpaths against store snapshots.
///
/// The engine holds no per-request state; one instance can serve many
/// threads at once.
#[derive(Debug, Clone)]
pub struct ClasspathEngine {
    runtime: Arc<dyn Runtime>,
    execution_root: Option<PathBuf>,
    bazel_bin: Option<PathBuf>,
    workspace_packages: BTreeSet<String>,
    explicit_java_test_deps: bool,
    cancel: CancellationToken,
    fingerprint: String,
}

/// Builder for [`ClasspathEngine`].
#[derive(Debug, Default)]
pub struct ClasspathEngineBuilder {
    runtime: Option<Arc<dyn Runtime>>,
    execution_root: Option<PathBuf>,
    bazel_bin: Option<PathBuf>,
    workspace_packages: BTreeSet<String>,
    explicit_java_test_deps: bool,
    cancel: CancellationToken,
}

impl ClasspathEngineBuilder {
    /// Filesystem access. Defaults to [`NativeRuntime`].
    pub fn runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Directory relative jar paths are resolved against.
    pub fn execution_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.execution_root = Some(root.into());
        self
    }

    /// The build tool's `bazel-bin`, searched for the implicit test runner.
    pub fn bazel_bin(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bazel_bin = Some(dir.into());
        self
    }

    /// Packages consumed from source; they become project references.
    pub fn workspace_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.workspace_packages = packages
            .into_iter()
            .map(|p| p.as_ref().trim_matches('/').to_string())
            .collect();
        self
    }

    pub fn explicit_java_test_deps(mut self, explicit: bool) -> Self {
        self.explicit_java_test_deps = explicit;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn build(self) -> ClasspathEngine {
        let fingerprint = self.fingerprint();
        ClasspathEngine {
            runtime: self
                .runtime
                .unwrap_or_else(|| Arc::new(NativeRuntime::new())),
            execution_root: self.execution_root,
            bazel_bin: self.bazel_bin,
            workspace_packages: self.workspace_packages,
            explicit_java_test_deps: self.explicit_java_test_deps,
            cancel: self.cancel,
            fingerprint,
        }
    }

    fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for path in [&self.execution_root, &self.bazel_bin] {
            match path {
                Some(path) => hasher.update(path.to_string_lossy().as_bytes()),
                None => hasher.update(b"-"),
            };
            hasher.update(b"\0");
        }
        for package in &self.workspace_packages {
            hasher.update(package.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(&[u8::from(self.explicit_java_test_deps)]);
        hasher.finalize().to_hex().to_string()
    }
}

impl ClasspathEngine {
    pub fn builder() -> ClasspathEngineBuilder {
        ClasspathEngineBuilder::default()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    /// Resolve the classpath of `request.target`.
    pub fn resolve(
        &self,
        request: &ResolveRequest,
        graph: &DependencyGraph,
        store: &StoreSnapshot,
    ) -> ResolveOutcome {
        let Some(target) = store.get(&request.target) else {
            tracing::warn!(label = %request.target, "cannot resolve classpath of unknown target");
            return ResolveOutcome::Resolved(ClasspathResult {
                is_complete: false,
                diagnostics: vec![Diagnostic::UnknownTargetLabel {
                    label: request.target.clone(),
                }],
                ..ClasspathResult::default()
            });
        };

        let mut walk = Walk::new(self, graph, store);
        if self.walk_scopes(&mut walk, target, request).is_none() {
            return ResolveOutcome::Cancelled;
        }

        let mut entries = EntrySet::default();
        let mut result = ClasspathResult::empty();
        result.diagnostics = std::mem::take(&mut walk.diagnostics);

        for (label, scope) in &walk.visited {
            if self.cancel.is_cancelled() {
                return ResolveOutcome::Cancelled;
            }
            self.emit(label, *scope, target.package(), store, &mut entries, &mut result);
        }

        if request.include_test_scope {
            if let Some(bazel_bin) = &self.bazel_bin {
                for jar in implicit_test_jars(
                    self.runtime.as_ref(),
                    bazel_bin,
                    target.kind(),
                    self.explicit_java_test_deps,
                ) {
                    entries.insert(ClasspathEntry::jar(jar, None, Scope::Runtime));
                }
            }
        }

        result.entries = entries.into_entries();
        result.is_complete = result.diagnostics.is_empty();
        tracing::debug!(
            label = %request.target,
            entries = result.entries.len(),
            complete = result.is_complete,
            "resolved classpath"
        );
        ResolveOutcome::Resolved(result)
    }

    /// Visit the labels of every scope. `None` means cancelled.
    fn walk_scopes(
        &self,
        walk: &mut Walk<'_>,
        target: &TargetMetadata,
        request: &ResolveRequest,
    ) -> Option<()> {
        let store = walk.store;
        let root = target.label();
        walk.seen.insert(root.clone());

        for dep in target.deps() {
            walk.visit(dep, root, Scope::Main, false)?;
        }
        walk.visited.push((root.clone(), Scope::Main));

        let main: Vec<Label> = walk.visited.iter().map(|(label, _)| label.clone()).collect();
        for label in &main {
            let Some(node) = store.get(label) else {
                continue;
            };
            for dep in node.runtime_deps() {
                walk.visit(dep, label, Scope::Runtime, true)?;
            }
        }
        for dep in &request.implicit_runtime_deps {
            walk.visit(dep, root, Scope::Runtime, true)?;
        }

        if !request.include_test_scope {
            return Some(());
        }
        let siblings: Vec<Arc<TargetMetadata>> = store
            .for_package(target.package())
            .into_iter()
            .filter(|sibling| sibling.label() != root && sibling.is_test_rule())
            .collect();
        let tested = target.is_test_rule()
            || siblings.iter().any(|sibling| sibling.deps().contains(root));
        if !tested {
            return Some(());
        }
        for sibling in &siblings {
            for dep in sibling.deps().union(sibling.runtime_deps()) {
                walk.visit(dep, sibling.label(), Scope::Test, true)?;
            }
        }
        Some(())
    }

    /// Hash of the settings that shape a result besides the request and the
    /// store. Part of every cache key.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn emit(
        &self,
        label: &Label,
        scope: Scope,
        own_package: &str,
        store: &StoreSnapshot,
        entries: &mut EntrySet,
        result: &mut ClasspathResult,
    ) {
        if !label.is_external()
            && label.package() != own_package
            && self.workspace_packages.contains(label.package())
        {
            entries.insert(ClasspathEntry::project(label.package(), scope));
            result.project_references.insert(label.package().to_string());
            return;
        }

        let Some(node) = store.get(label) else {
            return;
        };
        for outputs in node.all_outputs() {
            let Some(jar) = &outputs.primary_jar else {
                continue;
            };
            let jar_path = self.resolve_path(jar);
            if !self.runtime.is_file(&jar_path) {
                tracing::warn!(%label, jar = %jar_path.display(), "jar does not exist on disk");
                result.diagnostics.push(Diagnostic::MissingJarOnDisk {
                    label: label.clone(),
                    jar: jar_path,
                });
                continue;
            }

            let source_jar = match &outputs.source_jar {
                Some(source) => Some(self.resolve_path(source)),
                None => find_source_jar(self.runtime.as_ref(), &jar_path),
            };
            entries.insert(ClasspathEntry::jar(jar_path, source_jar, scope));
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.execution_root {
            Some(root) if path.is_relative() => root.join(path).clean(),
            _ => path.to_path_buf(),
        }
    }
}

/// Per-request traversal state.
struct Walk<'a> {
    engine: &'a ClasspathEngine,
    graph: &'a DependencyGraph,
    store: &'a StoreSnapshot,
    seen: HashSet<Label>,
    visited: Vec<(Label, Scope)>,
    missing: HashSet<Label>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Walk<'a> {
    fn new(engine: &'a ClasspathEngine, graph: &'a DependencyGraph, store: &'a StoreSnapshot) -> Self {
        Self {
            engine,
            graph,
            store,
            seen: HashSet::default(),
            visited: Vec::new(),
            missing: HashSet::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Depth-first pre-order from `start`. With `follow_runtime`, runtime
    /// deps of visited nodes are followed too.
    fn visit(
        &mut self,
        start: &Label,
        required_by: &Label,
        scope: Scope,
        follow_runtime: bool,
    ) -> Option<()> {
        let store = self.store;
        let mut stack: Vec<(Label, Label)> = vec![(start.clone(), required_by.clone())];

        while let Some((label, parent)) = stack.pop() {
            if self.engine.cancel.is_cancelled() {
                return None;
            }
            if !self.seen.insert(label.clone()) {
                continue;
            }

            if !self.graph.contains(&label) {
                if self.missing.insert(label.clone()) {
                    tracing::warn!(%label, required_by = %parent, "dependency has no metadata");
                    self.diagnostics.push(Diagnostic::MissingDependency {
                        label: label.clone(),
                        required_by: parent,
                    });
                }
                continue;
            }

            self.visited.push((label.clone(), scope));
            let Some(node) = store.get(&label) else {
                continue;
            };
            let mut children: Vec<&Label> = node.deps().iter().collect();
            if follow_runtime {
                children.extend(node.runtime_deps().difference(node.deps()));
                children.sort();
            }
            // Reverse so the smallest child is popped first.
            for child in children.into_iter().rev() {
                if !self.seen.contains(child) {
                    stack.push((child.clone(), label.clone()));
                }
            }
        }
        Some(())
    }
}
