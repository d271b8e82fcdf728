//! The metadata store.
//!
//! [`MetadataStore`] is the only mutable shared structure in kiln. Writers
//! never mutate a snapshot that readers can see: each update clones the
//! current [`StoreSnapshot`] (copy-on-write via `Arc::make_mut`) and swaps the
//! new one in under a short write lock. A resolution pass grabs one snapshot
//! up front and works against it for its whole lifetime.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::label::Label;
use crate::metadata::{AspectDirectory, LoadReport, MetadataError, MetadataSource};
use crate::runtime::Runtime;
use crate::target::TargetMetadata;

/// An immutable view of the store at one point in time.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    targets: BTreeMap<Label, Arc<TargetMetadata>>,
    packages: BTreeMap<String, BTreeSet<Label>>,
    generation: u64,
}

impl StoreSnapshot {
    /// Build a detached snapshot from a list of targets. Later entries win.
    pub fn from_targets(targets: impl IntoIterator<Item = TargetMetadata>) -> Self {
        let mut snapshot = Self::default();
        for target in targets {
            snapshot.insert(target);
        }
        snapshot
    }

    fn insert(&mut self, target: TargetMetadata) {
        let label = target.label().clone();
        if !label.is_external() {
            self.packages
                .entry(label.package().to_string())
                .or_default()
                .insert(label.clone());
        }
        if self.targets.insert(label.clone(), Arc::new(target)).is_some() {
            tracing::trace!(%label, "replaced target metadata");
        }
    }

    pub fn get(&self, label: &Label) -> Option<&Arc<TargetMetadata>> {
        self.targets.get(label)
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.targets.contains_key(label)
    }

    /// All labels, in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.targets.keys()
    }

    pub fn all_labels(&self) -> BTreeSet<Label> {
        self.targets.keys().cloned().collect()
    }

    pub fn targets(&self) -> impl Iterator<Item = &Arc<TargetMetadata>> {
        self.targets.values()
    }

    /// Targets whose label lives in exactly `package`.
    pub fn for_package(&self, package: &str) -> Vec<Arc<TargetMetadata>> {
        let package = package.trim_matches('/');
        self.packages
            .get(package)
            .into_iter()
            .flatten()
            .filter_map(|label| self.targets.get(label).cloned())
            .collect()
    }

    /// Workspace package paths that own at least one target, sorted.
    /// External repository labels never contribute a package.
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Monotonic counter bumped on every store update.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Label-keyed store of target metadata with snapshot-swap updates.
#[derive(Debug, Default)]
pub struct MetadataStore {
    current: RwLock<Arc<StoreSnapshot>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Insert or replace one target.
    pub fn put(&self, target: TargetMetadata) {
        self.put_all(std::iter::once(target));
    }

    /// Insert or replace a batch of targets as a single update.
    pub fn put_all(&self, targets: impl IntoIterator<Item = TargetMetadata>) {
        let mut current = self.current.write();
        let next = Arc::make_mut(&mut *current);
        for target in targets {
            next.insert(target);
        }
        next.generation += 1;
    }

    /// Merge everything a source provides on top of the current contents.
    pub fn merge_from(&self, source: &dyn MetadataSource) -> LoadReport {
        let batch = source.collect();
        self.put_all(batch.targets);
        batch.report
    }

    /// Merge every metadata file found under `dir`.
    pub fn load_dir(&self, dir: impl Into<PathBuf>, runtime: Arc<dyn Runtime>) -> LoadReport {
        self.merge_from(&AspectDirectory::new(dir, runtime))
    }

    /// Parse one metadata file and insert its target.
    pub fn load_file(&self, path: &Path, runtime: Arc<dyn Runtime>) -> Result<Label, MetadataError> {
        let parent = path.parent().unwrap_or(Path::new(""));
        let target = AspectDirectory::new(parent, runtime).parse_file(path)?;
        let label = target.label().clone();
        self.put(target);
        Ok(label)
    }

    /// Replace the whole store with what a source provides, in one swap.
    pub fn refresh_from(&self, source: &dyn MetadataSource) -> LoadReport {
        let batch = source.collect();
        let mut fresh = StoreSnapshot::from_targets(batch.targets);

        let mut current = self.current.write();
        fresh.generation = current.generation + 1;
        *current = Arc::new(fresh);
        batch.report
    }

    /// Drop every target.
    pub fn reset(&self) {
        let mut current = self.current.write();
        let generation = current.generation + 1;
        *current = Arc::new(StoreSnapshot {
            generation,
            ..StoreSnapshot::default()
        });
    }

    pub fn get(&self, label: &Label) -> Option<Arc<TargetMetadata>> {
        self.current.read().get(label).cloned()
    }

    pub fn all_labels(&self) -> BTreeSet<Label> {
        self.current.read().all_labels()
    }

    pub fn for_package(&self, package: &str) -> Vec<Arc<TargetMetadata>> {
        self.current.read().for_package(package)
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InMemorySource;
    use crate::target::OutputJars;

    fn target(label: &str, jar: &str) -> TargetMetadata {
        TargetMetadata::builder(Label::parse(label).unwrap(), "java_library")
            .outputs(OutputJars::new(jar))
            .build()
    }

    #[test]
    fn put_last_wins() {
        let store = MetadataStore::new();
        store.put(target("//a:lib", "old.jar"));
        store.put(target("//a:lib", "new.jar"));

        let label = Label::parse("//a:lib").unwrap();
        let found = store.get(&label).unwrap();
        assert_eq!(found.outputs().primary_jar.as_deref(), Some(std::path::Path::new("new.jar")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn for_package_matches_exact_package() {
        let store = MetadataStore::new();
        store.put_all([
            target("//a:lib", "a.jar"),
            target("//a:util", "u.jar"),
            target("//a/b:lib", "ab.jar"),
        ]);

        let labels: Vec<_> = store
            .for_package("a")
            .iter()
            .map(|t| t.label().to_string())
            .collect();
        assert_eq!(labels, vec!["//a:lib", "//a:util"]);
        assert_eq!(store.for_package("/a/b/").len(), 1);
        assert!(store.for_package("missing").is_empty());
    }

    #[test]
    fn snapshots_are_isolated_from_later_writes() {
        let store = MetadataStore::new();
        store.put(target("//a:lib", "a.jar"));
        let before = store.snapshot();

        store.put(target("//b:lib", "b.jar"));
        store.reset();

        assert_eq!(before.len(), 1);
        assert!(store.is_empty());
        assert!(store.snapshot().generation() > before.generation());
    }

    #[test]
    fn loads_files_through_runtime() {
        let runtime = Arc::new(crate::runtime::MemoryRuntime::new());
        runtime.add_file("aspects/a/lib.kiln-build.json", r#"{"label": "//a:lib"}"#);
        runtime.add_file("aspects/b/lib.kiln-build.json", r#"{"label": "//b:lib", "deps": ["//a:lib"]}"#);
        runtime.add_file("aspects/b/broken.kiln-build.json", "{");
        runtime.add_file("aspects/notes.txt", "ignored");

        let store = MetadataStore::new();
        let report = store.load_dir("aspects", runtime.clone());
        assert_eq!(report.parsed, 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(store.len(), 2);

        runtime.add_file("extra/c.kiln-build.json", r#"{"label": "//c:lib"}"#);
        let label = store
            .load_file(Path::new("extra/c.kiln-build.json"), runtime)
            .unwrap();
        assert_eq!(label.as_str(), "//c:lib");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn refresh_replaces_contents() {
        let store = MetadataStore::new();
        store.put(target("//stale:lib", "s.jar"));

        let source = InMemorySource::new(vec![target("//a:lib", "a.jar")]);
        let report = store.refresh_from(&source);

        assert_eq!(report.parsed, 1);
        let labels: Vec<_> = store.all_labels().into_iter().map(String::from).collect();
        assert_eq!(labels, vec!["//a:lib"]);

        store.merge_from(&InMemorySource::new(vec![target("//b:lib", "b.jar")]));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn concurrent_readers_see_whole_batches() {
        let store = Arc::new(MetadataStore::new());
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..50 {
                    store.put_all([
                        target(&format!("//p{i}:a"), "a.jar"),
                        target(&format!("//p{i}:b"), "b.jar"),
                    ]);
                }
            })
        };
        for _ in 0..200 {
            // Batches land atomically, so the count is always even.
            assert_eq!(store.snapshot().len() % 2, 0);
        }
        writer.join().unwrap();
        assert_eq!(store.len(), 100);
    }
}
