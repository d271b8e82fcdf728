//! Session context tying the store, graph, engine and cache together.

use std::collections::BTreeMap;
use std::sync::Arc;

use kiln_graph::{DependencyGraph, Label, LoadReport, MetadataSource, MetadataStore, StoreSnapshot};
use parking_lot::RwLock;

use crate::cache::{self, CacheConfig, CacheKey, ClasspathCache, StoreFingerprint};
use crate::engine::{ClasspathEngine, ResolveRequest};
use crate::entry::{ClasspathResult, ResolveOutcome};
use crate::parallel;

/// A consistent view taken at one refresh: the store snapshot, the graph
/// built from it and its fingerprint.
#[derive(Debug, Clone, Default)]
pub struct GraphView {
    pub store: Arc<StoreSnapshot>,
    pub graph: DependencyGraph,
    /// `None` when the snapshot could not be fingerprinted; caching is then
    /// skipped for this view.
    pub fingerprint: Option<StoreFingerprint>,
}

impl GraphView {
    fn of(store: Arc<StoreSnapshot>) -> Self {
        let graph = DependencyGraph::build(&store);
        let fingerprint = match StoreFingerprint::of(&store) {
            Ok(fingerprint) => Some(fingerprint),
            Err(err) => {
                tracing::warn!(error = %err, "cannot fingerprint metadata store, caching disabled");
                None
            }
        };
        Self {
            store,
            graph,
            fingerprint,
        }
    }
}

/// Everything one kiln session needs, created once and passed around.
///
/// ```rust,ignore
/// let context = KilnContext::new(Box::new(AspectDirectory::new(dir, runtime)), engine);
/// context.refresh();
/// let outcome = context.resolve(&ResolveRequest::new(label));
/// ```
pub struct KilnContext {
    store: MetadataStore,
    source: Box<dyn MetadataSource>,
    view: RwLock<Arc<GraphView>>,
    engine: ClasspathEngine,
    cache: Option<Box<dyn ClasspathCache>>,
    cache_config: CacheConfig,
}

impl std::fmt::Debug for KilnContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KilnContext")
            .field("targets", &self.store.len())
            .field("engine", &self.engine)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl KilnContext {
    /// A context with an empty store. Call [`refresh`](Self::refresh) to load.
    pub fn new(source: Box<dyn MetadataSource>, engine: ClasspathEngine) -> Self {
        Self {
            store: MetadataStore::new(),
            source,
            view: RwLock::new(Arc::new(GraphView::default())),
            engine,
            cache: None,
            cache_config: CacheConfig::default().with_enabled(false),
        }
    }

    pub fn with_cache(mut self, cache: Box<dyn ClasspathCache>, config: CacheConfig) -> Self {
        self.cache = config.enabled.then_some(cache);
        self.cache_config = config;
        self
    }

    /// Reload metadata from the source, rebuild the graph and drop cached
    /// classpaths.
    pub fn refresh(&self) -> LoadReport {
        let report = self.store.refresh_from(self.source.as_ref());
        let view = GraphView::of(self.store.snapshot());
        tracing::debug!(
            targets = view.store.len(),
            generation = view.store.generation(),
            "refreshed kiln context"
        );
        *self.view.write() = Arc::new(view);

        if let Some(cache) = &self.cache {
            if let Err(err) = cache.invalidate() {
                tracing::warn!(error = %err, "failed to invalidate classpath cache");
            }
        }
        report
    }

    /// The view every resolution currently runs against.
    pub fn view(&self) -> Arc<GraphView> {
        Arc::clone(&self.view.read())
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn engine(&self) -> &ClasspathEngine {
        &self.engine
    }

    /// Resolve one request, consulting the cache first.
    pub fn resolve(&self, request: &ResolveRequest) -> ResolveOutcome {
        let view = self.view();
        let key = self.cache_key(&view, request);

        if let Some(hit) = self.cached(key.as_ref()) {
            return ResolveOutcome::Resolved(hit);
        }
        let outcome = self.engine.resolve(request, &view.graph, &view.store);
        self.store_outcome(key.as_ref(), &outcome);
        outcome
    }

    /// Resolve many requests against one view. Cache misses are resolved in
    /// parallel.
    pub fn resolve_all(&self, requests: &[ResolveRequest]) -> BTreeMap<Label, ResolveOutcome> {
        let view = self.view();
        let mut outcomes = BTreeMap::new();
        let mut misses = Vec::new();

        for request in requests {
            let key = self.cache_key(&view, request);
            match self.cached(key.as_ref()) {
                Some(hit) => {
                    outcomes.insert(request.target.clone(), ResolveOutcome::Resolved(hit));
                }
                None => misses.push((request.clone(), key)),
            }
        }

        let pending: Vec<ResolveRequest> = misses.iter().map(|(request, _)| request.clone()).collect();
        let mut resolved = parallel::resolve_all(&self.engine, &pending, &view.graph, &view.store);
        for (request, key) in misses {
            if let Some(outcome) = resolved.remove(&request.target) {
                self.store_outcome(key.as_ref(), &outcome);
                outcomes.insert(request.target, outcome);
            }
        }
        outcomes
    }

    fn cache_key(&self, view: &GraphView, request: &ResolveRequest) -> Option<CacheKey> {
        self.cache.as_ref()?;
        let fingerprint = view.fingerprint.as_ref()?;
        Some(CacheKey::for_request(request, self.engine.fingerprint(), fingerprint))
    }

    fn cached(&self, key: Option<&CacheKey>) -> Option<ClasspathResult> {
        let (cache, key) = (self.cache.as_deref()?, key?);
        if self.cache_config.should_force_refresh() {
            return None;
        }
        cache::try_load(cache, key)
    }

    fn store_outcome(&self, key: Option<&CacheKey>, outcome: &ResolveOutcome) {
        if let (Some(cache), Some(key)) = (self.cache.as_deref(), key) {
            cache::try_save(cache, &self.cache_config, key, outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryClasspathCache;
    use crate::entry::Scope;
    use kiln_graph::{InMemorySource, MemoryRuntime, OutputJars, TargetMetadata};
    use pretty_assertions::assert_eq;

    fn label(s: &str) -> Label {
        Label::parse(s).unwrap()
    }

    #[derive(Debug, Default)]
    struct SharedCache(Arc<MemoryClasspathCache>);

    impl ClasspathCache for SharedCache {
        fn load(&self, key: &CacheKey) -> cache::CacheResult<ClasspathResult> {
            self.0.load(key)
        }
        fn save(&self, key: &CacheKey, result: &ClasspathResult) -> cache::CacheResult<()> {
            self.0.save(key, result)
        }
        fn invalidate(&self) -> cache::CacheResult<()> {
            self.0.invalidate()
        }
    }

    fn context(cache: Arc<MemoryClasspathCache>) -> KilnContext {
        context_with(cache, &[])
    }

    fn context_with(cache: Arc<MemoryClasspathCache>, workspace_packages: &[&str]) -> KilnContext {
        let runtime = Arc::new(MemoryRuntime::new());
        runtime.touch("a.jar");
        runtime.touch("b.jar");
        let source = InMemorySource::new(vec![
            TargetMetadata::builder(label("//a:lib"), "java_library")
                .outputs(OutputJars::new("a.jar"))
                .build(),
            TargetMetadata::builder(label("//b:lib"), "java_library")
                .deps([label("//a:lib")])
                .outputs(OutputJars::new("b.jar"))
                .build(),
            TargetMetadata::builder(label("//c:lib"), "java_library")
                .deps([label("//missing:lib")])
                .build(),
        ]);
        let engine = ClasspathEngine::builder()
            .runtime(runtime)
            .workspace_packages(workspace_packages)
            .build();
        KilnContext::new(Box::new(source), engine)
            .with_cache(Box::new(SharedCache(cache)), CacheConfig::new("unused"))
    }

    #[test]
    fn empty_until_refreshed() {
        let context = context(Arc::default());
        assert!(context.view().store.is_empty());

        let report = context.refresh();
        assert_eq!(report.parsed, 3);
        assert_eq!(context.view().graph.len(), 3);
    }

    #[test]
    fn resolve_goes_through_cache() {
        let cache = Arc::new(MemoryClasspathCache::new());
        let context = context(Arc::clone(&cache));
        context.refresh();

        let request = ResolveRequest::new(label("//b:lib"));
        let first = context.resolve(&request).into_result().unwrap();
        let jars: Vec<_> = first.entries_in(Scope::Main).filter_map(|e| e.jar_path()).collect();
        assert_eq!(jars, vec![std::path::Path::new("a.jar"), std::path::Path::new("b.jar")]);
        assert_eq!(cache.len(), 1);

        assert_eq!(context.resolve(&request).into_result().unwrap(), first);
        assert_eq!(cache.len(), 1);

        // Incomplete results stay out of the cache by default.
        context.resolve(&ResolveRequest::new(label("//c:lib")));
        assert_eq!(cache.len(), 1);

        context.refresh();
        assert!(cache.is_empty());
    }

    #[test]
    fn resolve_all_mixes_hits_and_misses() {
        let cache = Arc::new(MemoryClasspathCache::new());
        let context = context(Arc::clone(&cache));
        context.refresh();
        context.resolve(&ResolveRequest::new(label("//a:lib")));

        let requests: Vec<_> = ["//a:lib", "//b:lib", "//c:lib"]
            .into_iter()
            .map(|l| ResolveRequest::new(label(l)))
            .collect();
        let outcomes = context.resolve_all(&requests);

        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[&label("//c:lib")].clone().into_result().unwrap().is_complete);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn engines_with_different_settings_do_not_share_entries() {
        let cache = Arc::new(MemoryClasspathCache::new());
        let request = ResolveRequest::new(label("//b:lib"));

        let plain = context(Arc::clone(&cache));
        let linked = context_with(Arc::clone(&cache), &["a"]);
        plain.refresh();
        linked.refresh();

        let jars = plain.resolve(&request).into_result().unwrap();
        assert!(jars.project_references.is_empty());
        assert_eq!(cache.len(), 1);

        let result = linked.resolve(&request).into_result().unwrap();
        let rendered: Vec<String> = result.entries.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["[main] project //a", "[main] b.jar"]);
        assert_eq!(cache.len(), 2);
    }
}
