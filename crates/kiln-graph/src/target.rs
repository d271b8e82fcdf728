use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::kind::RuleKind;
use crate::label::Label;

/// One set of jars produced by a target.
///
/// Any member may be absent: a `java_library` with no sources has no jars at
/// all, and most third-party imports lack a source jar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputJars {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_jar: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_jar: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_jar: Option<PathBuf>,
}

impl OutputJars {
    pub fn new(primary_jar: impl Into<PathBuf>) -> Self {
        Self {
            primary_jar: Some(primary_jar.into()),
            ..Self::default()
        }
    }

    pub fn with_source_jar(mut self, source_jar: impl Into<PathBuf>) -> Self {
        self.source_jar = Some(source_jar.into());
        self
    }

    pub fn with_interface_jar(mut self, interface_jar: impl Into<PathBuf>) -> Self {
        self.interface_jar = Some(interface_jar.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.primary_jar.is_none() && self.interface_jar.is_none() && self.source_jar.is_none()
    }
}

/// Analysis facts for a single build target.
///
/// Instances are immutable: re-analysing a label produces a new
/// `TargetMetadata` that replaces the old one in the
/// [`MetadataStore`](crate::MetadataStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMetadata {
    label: Label,
    kind: RuleKind,
    sources: Vec<String>,
    deps: BTreeSet<Label>,
    runtime_deps: BTreeSet<Label>,
    outputs: OutputJars,
    extra_outputs: Vec<OutputJars>,
    generated_jars: Vec<OutputJars>,
    build_file: Option<PathBuf>,
    main_class: Option<String>,
    is_test_rule: bool,
}

impl TargetMetadata {
    /// Start building metadata for `label`.
    pub fn builder(label: Label, kind: impl Into<RuleKind>) -> TargetMetadataBuilder {
        let kind = kind.into();
        let is_test_rule = kind.is_testable();
        TargetMetadataBuilder {
            target: Self {
                label,
                kind,
                sources: Vec::new(),
                deps: BTreeSet::new(),
                runtime_deps: BTreeSet::new(),
                outputs: OutputJars::default(),
                extra_outputs: Vec::new(),
                generated_jars: Vec::new(),
                build_file: None,
                main_class: None,
                is_test_rule,
            },
        }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn deps(&self) -> &BTreeSet<Label> {
        &self.deps
    }

    pub fn runtime_deps(&self) -> &BTreeSet<Label> {
        &self.runtime_deps
    }

    /// The primary jar set (the first entry of the analysis `jars` list).
    pub fn outputs(&self) -> &OutputJars {
        &self.outputs
    }

    /// Additional jar sets beyond the primary one, e.g. for `java_import`
    /// targets that wrap several jars.
    pub fn extra_outputs(&self) -> &[OutputJars] {
        &self.extra_outputs
    }

    /// Jars produced by annotation processors.
    pub fn generated_jars(&self) -> &[OutputJars] {
        &self.generated_jars
    }

    /// Every jar set in classpath order: generated, primary, then extras.
    pub fn all_outputs(&self) -> impl Iterator<Item = &OutputJars> {
        self.generated_jars
            .iter()
            .chain(std::iter::once(&self.outputs))
            .chain(self.extra_outputs.iter())
            .filter(|jars| !jars.is_empty())
    }

    pub fn build_file(&self) -> Option<&Path> {
        self.build_file.as_deref()
    }

    pub fn main_class(&self) -> Option<&str> {
        self.main_class.as_deref()
    }

    pub fn is_test_rule(&self) -> bool {
        self.is_test_rule
    }

    /// Package path the target belongs to.
    pub fn package(&self) -> &str {
        self.label.package()
    }

    /// Union of compile-time and runtime dependencies.
    pub fn all_deps(&self) -> impl Iterator<Item = &Label> {
        self.deps.iter().chain(self.runtime_deps.difference(&self.deps))
    }
}

/// Builder for [`TargetMetadata`].
pub struct TargetMetadataBuilder {
    target: TargetMetadata,
}

impl TargetMetadataBuilder {
    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn deps(mut self, deps: impl IntoIterator<Item = Label>) -> Self {
        self.target.deps = deps.into_iter().filter(Label::is_concrete).collect();
        self
    }

    pub fn runtime_deps(mut self, deps: impl IntoIterator<Item = Label>) -> Self {
        self.target.runtime_deps = deps.into_iter().filter(Label::is_concrete).collect();
        self
    }

    pub fn outputs(mut self, outputs: OutputJars) -> Self {
        self.target.outputs = outputs;
        self
    }

    pub fn extra_outputs(mut self, outputs: Vec<OutputJars>) -> Self {
        self.target.extra_outputs = outputs;
        self
    }

    pub fn generated_jars(mut self, jars: Vec<OutputJars>) -> Self {
        self.target.generated_jars = jars;
        self
    }

    pub fn build_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.target.build_file = Some(path.into());
        self
    }

    pub fn main_class(mut self, main_class: impl Into<String>) -> Self {
        self.target.main_class = Some(main_class.into());
        self
    }

    /// Mark the target as test-only (`testonly = True`). Test kinds are
    /// always test rules regardless of this flag.
    pub fn testonly(mut self, testonly: bool) -> Self {
        self.target.is_test_rule = self.target.kind.is_testable() || testonly;
        self
    }

    pub fn build(self) -> TargetMetadata {
        self.target
    }
}
