//! Rule kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The rule kind that produced a target, e.g. `java_library`.
///
/// Known JVM kinds get their own variant. Anything else is preserved verbatim
/// in [`RuleKind::Other`] so it can still be reported and round-tripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleKind {
    JavaLibrary,
    JavaImport,
    JavaBinary,
    JavaTest,
    JavaTestSuite,
    JavaWebTestSuite,
    JavaProtoLibrary,
    JavaLiteProtoLibrary,
    JavaGrpcLibrary,
    Springboot,
    Other(String),
}

/// Static facts about a known kind.
struct KindInfo {
    kind: RuleKind,
    name: &'static str,
    runnable: bool,
    testable: bool,
}

const KNOWN_KINDS: &[KindInfo] = &[
    KindInfo { kind: RuleKind::JavaLibrary, name: "java_library", runnable: false, testable: false },
    KindInfo { kind: RuleKind::JavaImport, name: "java_import", runnable: false, testable: false },
    KindInfo { kind: RuleKind::JavaBinary, name: "java_binary", runnable: true, testable: false },
    KindInfo { kind: RuleKind::JavaTest, name: "java_test", runnable: false, testable: true },
    KindInfo { kind: RuleKind::JavaTestSuite, name: "java_test_suite", runnable: false, testable: true },
    KindInfo { kind: RuleKind::JavaWebTestSuite, name: "java_web_test_suite", runnable: false, testable: true },
    KindInfo { kind: RuleKind::JavaProtoLibrary, name: "java_proto_library", runnable: false, testable: false },
    KindInfo { kind: RuleKind::JavaLiteProtoLibrary, name: "java_lite_proto_library", runnable: false, testable: false },
    KindInfo { kind: RuleKind::JavaGrpcLibrary, name: "java_grpc_library", runnable: false, testable: false },
    KindInfo { kind: RuleKind::Springboot, name: "springboot", runnable: true, testable: false },
];

impl RuleKind {
    /// Look up a kind by name, ignoring case.
    pub fn from_name(name: &str) -> Self {
        KNOWN_KINDS
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(name.trim()))
            .map(|info| info.kind.clone())
            .unwrap_or_else(|| RuleKind::Other(name.trim().to_string()))
    }

    fn info(&self) -> Option<&'static KindInfo> {
        KNOWN_KINDS.iter().find(|info| &info.kind == self)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RuleKind::Other(name) => name,
            known => known.info().map(|info| info.name).unwrap_or_default(),
        }
    }

    /// Runnable with `bazel run`.
    pub fn is_runnable(&self) -> bool {
        self.info().is_some_and(|info| info.runnable)
    }

    /// Runnable with `bazel test`. Unknown kinds ending in `_test` count too.
    pub fn is_testable(&self) -> bool {
        match self {
            RuleKind::Other(name) => name.ends_with("_test") || name.ends_with("_test_suite"),
            known => known.info().is_some_and(|info| info.testable),
        }
    }

    /// Whether the kind is one of the JVM rules kiln understands.
    pub fn is_known(&self) -> bool {
        !matches!(self, RuleKind::Other(_))
    }
}

impl From<String> for RuleKind {
    fn from(value: String) -> Self {
        RuleKind::from_name(&value)
    }
}

impl From<&str> for RuleKind {
    fn from(value: &str) -> Self {
        RuleKind::from_name(value)
    }
}

impl From<RuleKind> for String {
    fn from(kind: RuleKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
