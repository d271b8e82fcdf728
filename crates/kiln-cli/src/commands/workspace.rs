//! The per-invocation view of a workspace: its configuration plus the
//! loaders every command shares.

use std::path::PathBuf;
use std::sync::Arc;

use kiln_classpath::{CacheConfig, ClasspathEngine, KilnContext};
use kiln_config::KilnConfig;
use kiln_graph::{
    AspectDirectory, Label, LoadReport, MetadataStore, NativeRuntime, Runtime, StoreSnapshot,
};

use crate::cli::SourceArgs;
use crate::error::{CliError, Result};
use crate::ui;

#[derive(Debug)]
pub struct Workspace {
    config: KilnConfig,
    runtime: Arc<dyn Runtime>,
}

impl Workspace {
    pub fn new(config: KilnConfig) -> Self {
        Self::with_runtime(config, Arc::new(NativeRuntime::new()))
    }

    pub fn with_runtime(config: KilnConfig, runtime: Arc<dyn Runtime>) -> Self {
        Self { config, runtime }
    }

    pub fn config(&self) -> &KilnConfig {
        &self.config
    }

    pub fn runtime(&self) -> &dyn Runtime {
        self.runtime.as_ref()
    }

    /// `--aspects` if given, else `aspect_dir` from the config.
    pub fn aspect_dir(&self, source: &SourceArgs) -> PathBuf {
        source
            .aspects
            .clone()
            .unwrap_or_else(|| self.config.aspect_dir())
    }

    /// Load every metadata file into a fresh store.
    pub fn load_snapshot(&self, source: &SourceArgs) -> Result<Arc<StoreSnapshot>> {
        let aspects = self.aspect_source(source)?;
        let store = MetadataStore::new();
        report_load(&store.refresh_from(&aspects));
        Ok(store.snapshot())
    }

    pub fn engine(&self) -> ClasspathEngine {
        ClasspathEngine::builder()
            .runtime(Arc::clone(&self.runtime))
            .execution_root(self.config.execution_root())
            .bazel_bin(self.config.bazel_bin())
            .workspace_packages(&self.config.workspace_packages)
            .explicit_java_test_deps(self.config.explicit_java_test_deps)
            .build()
    }

    /// A loaded context, with the persistent cache attached when enabled.
    pub fn context(&self, source: &SourceArgs, use_cache: bool) -> Result<KilnContext> {
        let aspects = self.aspect_source(source)?;
        let context = KilnContext::new(Box::new(aspects), self.engine());
        report_load(&context.refresh());

        let cache_config = CacheConfig::new(self.config.cache_dir())
            .with_enabled(use_cache && self.config.cache.enabled)
            .with_cache_incomplete(self.config.cache.cache_incomplete);
        if !cache_config.enabled {
            return Ok(context);
        }
        // Attached after the load: refreshing would drop entries written by
        // earlier runs, and keys carry the store fingerprint anyway.
        let cache = cache_config.open()?;
        Ok(context.with_cache(Box::new(cache), cache_config))
    }

    /// `implicit_runtime_deps` from the config followed by `extra`.
    pub fn implicit_runtime_deps(&self, extra: &[String]) -> Result<Vec<Label>> {
        parse_labels(self.config.implicit_runtime_deps.iter().chain(extra))
    }

    fn aspect_source(&self, source: &SourceArgs) -> Result<AspectDirectory> {
        let dir = self.aspect_dir(source);
        if !self.runtime.exists(&dir) || self.runtime.is_file(&dir) {
            return Err(CliError::AspectsNotFound(dir));
        }
        Ok(AspectDirectory::new(dir, Arc::clone(&self.runtime)))
    }
}

/// Parse labels, dropping repeats but keeping the first-seen order.
pub fn parse_labels<'a>(raw: impl IntoIterator<Item = &'a String>) -> Result<Vec<Label>> {
    let mut labels: Vec<Label> = Vec::new();
    for text in raw {
        let label = Label::parse(text.trim()).map_err(|source| CliError::InvalidLabel {
            label: text.clone(),
            source,
        })?;
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    Ok(labels)
}

fn report_load(report: &LoadReport) {
    tracing::debug!(parsed = report.parsed, skipped = report.skipped.len(), "loaded aspect output");
    if !report.is_clean() {
        ui::warning(&format!(
            "Skipped {} (see the log for details)",
            ui::plural(report.skipped.len(), "unreadable metadata file")
        ));
    }
}
