//! Source-set analysis for build-file rule attributes.
//!
//! When no aspect output exists yet, a target can still be described from the
//! attributes of its rule in the build file. Each [`RuleKind`] maps to a pure
//! analysis function that splits the attributes into main and test source
//! sets; test rules reuse the library analysis and route the result into the
//! test lists.

use serde::{Deserialize, Serialize};

use crate::kind::RuleKind;
use crate::label::{Label, LabelError};
use crate::target::{OutputJars, TargetMetadata};

/// Target name suffixes that mark a target as test code.
const TEST_NAME_SUFFIXES: &[&str] = &["_test", "_unittest", "Test", "Tests", "-test-lib"];

/// Attributes of one rule invocation, with lists already expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRuleAttributes {
    pub kind: String,
    pub name: String,
    /// Package path of the build file that declares the rule.
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub srcs: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default)]
    pub runtime_deps: Vec<String>,
    #[serde(default)]
    pub resource_strip_prefix: Option<String>,
    #[serde(default)]
    pub testonly: bool,
    /// Prebuilt jars (`java_import`).
    #[serde(default)]
    pub jars: Vec<String>,
    #[serde(default)]
    pub srcjar: Option<String>,
}

/// Main and test inputs of a rule, as seen by a classpath consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSets {
    pub main_sources: Vec<String>,
    pub main_resources: Vec<String>,
    pub test_sources: Vec<String>,
    pub test_resources: Vec<String>,
    pub main_jars: Vec<String>,
    pub test_jars: Vec<String>,
    pub resource_strip_prefix: Option<String>,
}

impl SourceSets {
    pub fn is_empty(&self) -> bool {
        self.main_sources.is_empty()
            && self.main_resources.is_empty()
            && self.test_sources.is_empty()
            && self.test_resources.is_empty()
            && self.main_jars.is_empty()
            && self.test_jars.is_empty()
    }

    /// Move every main input into the corresponding test list.
    fn route_to_test(mut self) -> Self {
        self.test_sources.append(&mut self.main_sources);
        self.test_resources.append(&mut self.main_resources);
        self.test_jars.append(&mut self.main_jars);
        self
    }
}

type Analyzer = fn(&BuildRuleAttributes) -> SourceSets;

/// Analysis function per rule kind. Kinds not listed fall back to the
/// library analysis, or the test analysis when the kind is testable.
const ANALYZERS: &[(&str, Analyzer)] = &[
    ("java_library", analyze_library),
    ("java_binary", analyze_library),
    ("springboot", analyze_library),
    ("java_import", analyze_import),
    ("java_test", analyze_test),
    ("java_test_suite", analyze_test),
    ("java_web_test_suite", analyze_test),
    ("java_proto_library", analyze_generated),
    ("java_lite_proto_library", analyze_generated),
    ("java_grpc_library", analyze_generated),
];

fn analyzer_for(kind: &RuleKind) -> Analyzer {
    ANALYZERS
        .iter()
        .find(|(name, _)| *name == kind.as_str())
        .map(|(_, analyzer)| *analyzer)
        .unwrap_or(if kind.is_testable() {
            analyze_test
        } else {
            analyze_library
        })
}

impl BuildRuleAttributes {
    pub fn rule_kind(&self) -> RuleKind {
        RuleKind::from_name(&self.kind)
    }

    /// Whether the rule produces test code: a `*_test` rule class, a
    /// test-looking target name, or `testonly = True`.
    pub fn is_test_target(&self) -> bool {
        self.testonly
            || self.kind.ends_with("_test")
            || TEST_NAME_SUFFIXES
                .iter()
                .any(|suffix| self.name.ends_with(suffix))
    }

    /// Split the rule's inputs into main and test source sets.
    pub fn analyze(&self) -> SourceSets {
        analyzer_for(&self.rule_kind())(self)
    }

    /// The label this rule declares.
    pub fn label(&self) -> Result<Label, LabelError> {
        Label::new(&self.package, &self.name)
    }

    /// Resolve `deps`, skipping wildcard references.
    pub fn dep_labels(&self) -> Result<Vec<Label>, LabelError> {
        parse_deps(&self.package, &self.deps)
    }

    /// Resolve `runtime_deps`, skipping wildcard references.
    pub fn runtime_dep_labels(&self) -> Result<Vec<Label>, LabelError> {
        parse_deps(&self.package, &self.runtime_deps)
    }

    /// Describe the rule as target metadata, for targets the aspect has not
    /// analysed. Only `java_import` rules know their output jars up front.
    pub fn to_metadata(&self) -> Result<TargetMetadata, LabelError> {
        let sets = self.analyze();
        let sources: Vec<String> = sets
            .main_sources
            .iter()
            .chain(&sets.test_sources)
            .cloned()
            .collect();

        let mut jars = sets
            .main_jars
            .iter()
            .chain(&sets.test_jars)
            .map(|jar| join_package(&self.package, jar));
        let mut outputs = jars.next().map(OutputJars::new).unwrap_or_default();
        if let Some(srcjar) = &self.srcjar {
            outputs = outputs.with_source_jar(join_package(&self.package, srcjar));
        }
        let extra_outputs = jars.map(OutputJars::new).collect();

        Ok(TargetMetadata::builder(self.label()?, self.kind.as_str())
            .sources(sources)
            .deps(self.dep_labels()?)
            .runtime_deps(self.runtime_dep_labels()?)
            .outputs(outputs)
            .extra_outputs(extra_outputs)
            .testonly(self.is_test_target())
            .build())
    }
}

fn parse_deps(package: &str, deps: &[String]) -> Result<Vec<Label>, LabelError> {
    let mut labels = Vec::with_capacity(deps.len());
    for dep in deps {
        let label = Label::parse_relative(package, dep)?;
        if label.is_concrete() {
            labels.push(label);
        }
    }
    Ok(labels)
}

fn join_package(package: &str, path: &str) -> String {
    if package.is_empty() {
        path.to_string()
    } else {
        format!("{package}/{path}")
    }
}

fn analyze_library(attrs: &BuildRuleAttributes) -> SourceSets {
    let sets = SourceSets {
        main_sources: attrs.srcs.clone(),
        main_resources: attrs.resources.clone(),
        resource_strip_prefix: attrs.resource_strip_prefix.clone(),
        ..SourceSets::default()
    };
    if attrs.is_test_target() {
        sets.route_to_test()
    } else {
        sets
    }
}

fn analyze_test(attrs: &BuildRuleAttributes) -> SourceSets {
    analyze_library(attrs).route_to_test()
}

fn analyze_import(attrs: &BuildRuleAttributes) -> SourceSets {
    let sets = SourceSets {
        main_jars: attrs.jars.clone(),
        ..SourceSets::default()
    };
    if attrs.is_test_target() {
        sets.route_to_test()
    } else {
        sets
    }
}

// Generated code has no checked-in inputs.
fn analyze_generated(_attrs: &BuildRuleAttributes) -> SourceSets {
    SourceSets::default()
}
