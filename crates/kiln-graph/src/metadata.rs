//! Per-target metadata files.
//!
//! The build tool's aspect writes one JSON document per analysed target:
//!
//! ```json
//! {
//!   "build_file_artifact_location": "helloworld/BUILD",
//!   "dependencies": ["//proto:helloworld_java_proto"],
//!   "generated_jars": [],
//!   "jars": [{
//!     "interface_jar": "bazel-out/bin/helloworld/libhelloworld-hjar.jar",
//!     "jar": "bazel-out/bin/helloworld/libhelloworld.jar",
//!     "source_jar": "bazel-out/bin/helloworld/libhelloworld-src.jar"
//!   }],
//!   "kind": "java_library",
//!   "label": "//helloworld:helloworld",
//!   "sources": ["helloworld/src/main/java/helloworld/HelloWorld.java"]
//! }
//! ```
//!
//! Every field except `label` may be missing or `null`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use path_clean::PathClean;
use serde::{Deserialize, Deserializer};

use crate::label::Label;
use crate::runtime::{Runtime, RuntimeError};
use crate::target::{OutputJars, TargetMetadata};

/// File name suffixes recognised as metadata files, newest first.
pub const METADATA_SUFFIXES: &[&str] = &[
    ".kiln-build.json",
    ".bzljavasdk-build.json",
    ".bzleclipse-build.json",
];

/// Errors raised for a single metadata file.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The file could not be read at all.
    #[error("cannot read metadata file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    /// The file was read but its record is not a valid target.
    #[error("malformed metadata file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl MetadataError {
    pub fn path(&self) -> &Path {
        match self {
            MetadataError::Unreadable { path, .. } | MetadataError::Malformed { path, .. } => path,
        }
    }

    fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        MetadataError::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Outcome of loading a batch of metadata files.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Number of files parsed into targets.
    pub parsed: usize,
    /// Files that were skipped, with the reason.
    pub skipped: Vec<MetadataError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// A batch of targets together with the report describing how they were
/// obtained.
#[derive(Debug, Default)]
pub struct MetadataBatch {
    pub targets: Vec<TargetMetadata>,
    pub report: LoadReport,
}

/// Where target metadata comes from.
pub trait MetadataSource: Send + Sync {
    /// Collect every target this source knows about. Per-file failures are
    /// reported in the batch, never returned as an error.
    fn collect(&self) -> MetadataBatch;
}

/// Reads metadata files from a directory tree through a [`Runtime`].
#[derive(Debug, Clone)]
pub struct AspectDirectory {
    root: PathBuf,
    runtime: Arc<dyn Runtime>,
    max_depth: usize,
}

impl AspectDirectory {
    pub fn new(root: impl Into<PathBuf>, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            root: root.into(),
            runtime,
            max_depth: 32,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parse a single file.
    pub fn parse_file(&self, path: &Path) -> Result<TargetMetadata, MetadataError> {
        let bytes = self
            .runtime
            .read_file(path)
            .map_err(|source| MetadataError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        parse_target_info(path, &bytes)
    }
}

impl MetadataSource for AspectDirectory {
    fn collect(&self) -> MetadataBatch {
        let mut batch = MetadataBatch::default();

        let files = match self.runtime.walk_files(&self.root, self.max_depth) {
            Ok(files) => files,
            Err(source) => {
                batch.report.skipped.push(MetadataError::Unreadable {
                    path: self.root.clone(),
                    source,
                });
                return batch;
            }
        };

        for path in files.iter().filter(|path| is_metadata_file(path)) {
            match self.parse_file(path) {
                Ok(target) => {
                    batch.report.parsed += 1;
                    batch.targets.push(target);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping metadata file");
                    batch.report.skipped.push(err);
                }
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            parsed = batch.report.parsed,
            skipped = batch.report.skipped.len(),
            "collected target metadata"
        );
        batch
    }
}

/// Targets supplied directly, e.g. from another analysis front end or tests.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    targets: Vec<TargetMetadata>,
}

impl InMemorySource {
    pub fn new(targets: Vec<TargetMetadata>) -> Self {
        Self { targets }
    }
}

impl MetadataSource for InMemorySource {
    fn collect(&self) -> MetadataBatch {
        MetadataBatch {
            report: LoadReport {
                parsed: self.targets.len(),
                skipped: Vec::new(),
            },
            targets: self.targets.clone(),
        }
    }
}

/// Whether the file name carries one of the metadata suffixes.
pub fn is_metadata_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| METADATA_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
}

/// Parse one metadata document. `path` is only used for error reporting.
pub fn parse_target_info(path: &Path, bytes: &[u8]) -> Result<TargetMetadata, MetadataError> {
    let raw: RawTargetInfo = serde_json::from_slice(bytes)
        .map_err(|e| MetadataError::malformed(path, e.to_string()))?;
    raw.into_target(path)
}

#[derive(Debug, Deserialize)]
struct RawTargetInfo {
    label: String,
    #[serde(default, deserialize_with = "nullable")]
    kind: String,
    #[serde(default, alias = "dependencies", deserialize_with = "nullable")]
    deps: Vec<RawDep>,
    #[serde(default, deserialize_with = "nullable")]
    runtime_deps: Vec<RawDep>,
    #[serde(default, deserialize_with = "nullable")]
    sources: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    jars: Vec<RawJarSet>,
    #[serde(default, deserialize_with = "nullable")]
    generated_jars: Vec<RawJarSet>,
    #[serde(default)]
    build_file_artifact_location: Option<String>,
    #[serde(default)]
    main_class: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    testonly: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDep {
    Label(String),
    Target { target: RawDepTarget },
    Labelled { label: String },
}

#[derive(Debug, Deserialize)]
struct RawDepTarget {
    label: String,
}

impl RawDep {
    fn label(&self) -> &str {
        match self {
            RawDep::Label(label) | RawDep::Labelled { label } => label,
            RawDep::Target { target } => &target.label,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawJarSet {
    #[serde(default)]
    jar: Option<String>,
    #[serde(default)]
    interface_jar: Option<String>,
    #[serde(default)]
    source_jar: Option<String>,
}

impl From<RawJarSet> for OutputJars {
    fn from(raw: RawJarSet) -> Self {
        let non_empty = |value: Option<String>| {
            value
                .filter(|s| !s.is_empty())
                .map(|s| PathBuf::from(s).clean())
        };
        OutputJars {
            primary_jar: non_empty(raw.jar),
            interface_jar: non_empty(raw.interface_jar),
            source_jar: non_empty(raw.source_jar),
        }
    }
}

impl RawTargetInfo {
    fn into_target(self, path: &Path) -> Result<TargetMetadata, MetadataError> {
        let label = Label::parse(&self.label)
            .map_err(|e| MetadataError::malformed(path, format!("bad target label: {e}")))?;
        if label.is_wildcard() {
            return Err(MetadataError::malformed(
                path,
                format!("target label '{label}' is a wildcard"),
            ));
        }

        let deps = parse_labels(path, &self.deps)?;
        let runtime_deps = parse_labels(path, &self.runtime_deps)?;

        let mut jars = self.jars.into_iter().map(OutputJars::from);
        let outputs = jars.next().unwrap_or_default();
        let extra_outputs: Vec<_> = jars.collect();

        let mut builder = TargetMetadata::builder(label, self.kind.as_str())
            .sources(self.sources)
            .deps(deps)
            .runtime_deps(runtime_deps)
            .outputs(outputs)
            .extra_outputs(extra_outputs)
            .generated_jars(self.generated_jars.into_iter().map(OutputJars::from).collect())
            .testonly(self.testonly);

        if let Some(build_file) = self.build_file_artifact_location.filter(|s| !s.is_empty()) {
            builder = builder.build_file(build_file);
        }
        if let Some(main_class) = self.main_class.filter(|s| !s.is_empty()) {
            builder = builder.main_class(main_class);
        }

        Ok(builder.build())
    }
}

fn parse_labels(path: &Path, deps: &[RawDep]) -> Result<Vec<Label>, MetadataError> {
    deps.iter()
        .map(|dep| {
            Label::parse(dep.label()).map_err(|e| {
                MetadataError::malformed(path, format!("bad dependency label: {e}"))
            })
        })
        .collect()
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
