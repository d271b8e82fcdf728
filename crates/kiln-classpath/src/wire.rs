//! JSON wire format for resolved classpaths.
//!
//! ```json
//! {
//!   "deps": [{"path": "out/a.jar", "srcpath": "out/a-src.jar"}],
//!   "runtimeDeps": [{"path": "out/rt.jar"}],
//!   "testDeps": [],
//!   "projectRefs": ["lib"],
//!   "complete": true
//! }
//! ```
//!
//! Entries are grouped by scope in classpath order, so decoding restores the
//! exact entry order. Project references travel inside the groups as
//! `{"path": "<package>", "project": true}`. A document may also be wrapped
//! next to one extra payload as `{"<name>": payload, "classpath": {...}}`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entry::{ClasspathEntry, ClasspathResult, Diagnostic, Scope};

/// Key of the classpath document inside a wrapper object.
pub const WRAPPED_CLASSPATH_KEY: &str = "classpath";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srcpath: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub project: bool,
}

impl WireEntry {
    fn from_entry(entry: &ClasspathEntry) -> Self {
        match entry {
            ClasspathEntry::Jar {
                jar_path,
                source_jar_path,
                ..
            } => WireEntry {
                path: Some(jar_path.to_string_lossy().into_owned()),
                srcpath: source_jar_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
                project: false,
            },
            ClasspathEntry::ProjectReference { target_package, .. } => WireEntry {
                path: Some(target_package.clone()),
                srcpath: None,
                project: true,
            },
        }
    }

    fn into_entry(self, scope: Scope) -> Option<ClasspathEntry> {
        let path = self.path?;
        Some(if self.project {
            ClasspathEntry::project(path, scope)
        } else {
            ClasspathEntry::jar(path, self.srcpath.map(PathBuf::from), scope)
        })
    }
}

/// The serialized form of a [`ClasspathResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClasspathDocument {
    #[serde(default)]
    pub deps: Vec<WireEntry>,
    #[serde(default)]
    pub runtime_deps: Vec<WireEntry>,
    #[serde(default)]
    pub test_deps: Vec<WireEntry>,
    #[serde(default)]
    pub project_refs: Vec<String>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl ClasspathDocument {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Serialize wrapped next to an extra payload under `payload_name`.
    pub fn to_wrapped_json(&self, payload_name: &str, payload: Value) -> serde_json::Result<String> {
        let mut wrapper = Map::new();
        wrapper.insert(payload_name.to_string(), payload);
        wrapper.insert(WRAPPED_CLASSPATH_KEY.to_string(), serde_json::to_value(self)?);
        serde_json::to_string_pretty(&Value::Object(wrapper))
    }

    /// Parse either a bare document or a wrapper. For a wrapper the extra
    /// payload comes back alongside the document.
    pub fn from_any_json(text: &str) -> serde_json::Result<(Self, Option<(String, Value)>)> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut object) = value else {
            return Ok((serde_json::from_value(value)?, None));
        };

        match object.remove(WRAPPED_CLASSPATH_KEY) {
            Some(classpath @ Value::Object(_)) => {
                let document = serde_json::from_value(classpath)?;
                let payload = object.into_iter().next();
                Ok((document, payload))
            }
            Some(other) => {
                object.insert(WRAPPED_CLASSPATH_KEY.to_string(), other);
                Ok((serde_json::from_value(Value::Object(object))?, None))
            }
            None => Ok((serde_json::from_value(Value::Object(object))?, None)),
        }
    }

    fn group_mut(&mut self, scope: Scope) -> &mut Vec<WireEntry> {
        match scope {
            Scope::Main => &mut self.deps,
            Scope::Runtime => &mut self.runtime_deps,
            Scope::Test => &mut self.test_deps,
        }
    }
}

/// Entries land in the group of their scope. Decoding yields them grouped
/// Main, Runtime, Test, so only results already in that order (as the engine
/// produces them) decode to an equal value.
impl From<&ClasspathResult> for ClasspathDocument {
    fn from(result: &ClasspathResult) -> Self {
        let mut document = ClasspathDocument {
            project_refs: result.project_references.iter().cloned().collect(),
            complete: result.is_complete,
            diagnostics: result.diagnostics.clone(),
            ..ClasspathDocument::default()
        };
        for entry in &result.entries {
            document
                .group_mut(entry.scope())
                .push(WireEntry::from_entry(entry));
        }
        document
    }
}

impl From<ClasspathDocument> for ClasspathResult {
    fn from(document: ClasspathDocument) -> Self {
        let groups = [
            (Scope::Main, document.deps),
            (Scope::Runtime, document.runtime_deps),
            (Scope::Test, document.test_deps),
        ];
        let entries = groups
            .into_iter()
            .flat_map(|(scope, group)| {
                group
                    .into_iter()
                    .filter_map(move |entry| entry.into_entry(scope))
            })
            .collect();

        ClasspathResult {
            entries,
            is_complete: document.complete,
            project_references: document.project_refs.into_iter().collect(),
            diagnostics: document.diagnostics,
        }
    }
}
