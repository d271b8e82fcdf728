//! Classpath entries and resolution results.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use kiln_graph::Label;
use serde::{Deserialize, Serialize};

/// Which classpath an entry belongs to.
///
/// The declaration order is also the precedence order: when one jar is
/// reachable through several scopes, the earliest scope wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Main,
    Runtime,
    Test,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::Main, Scope::Runtime, Scope::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Main => "main",
            Scope::Runtime => "runtime",
            Scope::Test => "test",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of a resolved classpath.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClasspathEntry {
    /// A jar on disk, optionally with its source jar.
    Jar {
        jar_path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_jar_path: Option<PathBuf>,
        scope: Scope,
    },
    /// Another workspace package, consumed from source instead of as a jar.
    ProjectReference { target_package: String, scope: Scope },
}

/// Identity of an entry for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKey {
    Jar(PathBuf),
    Project(String),
}

impl ClasspathEntry {
    pub fn jar(jar_path: impl Into<PathBuf>, source_jar_path: Option<PathBuf>, scope: Scope) -> Self {
        ClasspathEntry::Jar {
            jar_path: jar_path.into(),
            source_jar_path,
            scope,
        }
    }

    pub fn project(target_package: impl Into<String>, scope: Scope) -> Self {
        ClasspathEntry::ProjectReference {
            target_package: target_package.into(),
            scope,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            ClasspathEntry::Jar { scope, .. } | ClasspathEntry::ProjectReference { scope, .. } => {
                *scope
            }
        }
    }

    pub fn key(&self) -> EntryKey {
        match self {
            ClasspathEntry::Jar { jar_path, .. } => EntryKey::Jar(jar_path.clone()),
            ClasspathEntry::ProjectReference { target_package, .. } => {
                EntryKey::Project(target_package.clone())
            }
        }
    }

    pub fn jar_path(&self) -> Option<&Path> {
        match self {
            ClasspathEntry::Jar { jar_path, .. } => Some(jar_path),
            ClasspathEntry::ProjectReference { .. } => None,
        }
    }

    pub fn source_jar_path(&self) -> Option<&Path> {
        match self {
            ClasspathEntry::Jar {
                source_jar_path, ..
            } => source_jar_path.as_deref(),
            ClasspathEntry::ProjectReference { .. } => None,
        }
    }

    fn set_scope(&mut self, new_scope: Scope) {
        match self {
            ClasspathEntry::Jar { scope, .. } | ClasspathEntry::ProjectReference { scope, .. } => {
                *scope = new_scope
            }
        }
    }
}

impl fmt::Display for ClasspathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClasspathEntry::Jar {
                jar_path,
                source_jar_path,
                scope,
            } => {
                write!(f, "[{scope}] {}", jar_path.display())?;
                if let Some(source) = source_jar_path {
                    write!(f, " (source: {})", source.display())?;
                }
                Ok(())
            }
            ClasspathEntry::ProjectReference {
                target_package,
                scope,
            } => write!(f, "[{scope}] project //{target_package}"),
        }
    }
}

/// Why a result is incomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The requested target has no metadata.
    UnknownTargetLabel { label: Label },
    /// A dependency of a visited target has no metadata.
    MissingDependency { label: Label, required_by: Label },
    /// A declared output jar does not exist.
    MissingJarOnDisk { label: Label, jar: PathBuf },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownTargetLabel { label } => {
                write!(f, "unknown target label {label}")
            }
            Diagnostic::MissingDependency { label, required_by } => {
                write!(f, "dependency {label} of {required_by} has no metadata")
            }
            Diagnostic::MissingJarOnDisk { label, jar } => {
                write!(f, "jar {} of {label} does not exist", jar.display())
            }
        }
    }
}

/// A resolved classpath for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClasspathResult {
    /// Grouped Main, then Runtime, then Test; traversal order within a group.
    /// The engine always builds it this way; the wire format relies on it.
    pub entries: Vec<ClasspathEntry>,
    pub is_complete: bool,
    pub project_references: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ClasspathResult {
    /// An empty, complete result.
    pub fn empty() -> Self {
        Self {
            is_complete: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries_in(&self, scope: Scope) -> impl Iterator<Item = &ClasspathEntry> {
        self.entries.iter().filter(move |entry| entry.scope() == scope)
    }

    /// Jar paths in classpath order.
    pub fn jar_paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().filter_map(ClasspathEntry::jar_path)
    }
}

/// Outcome of a resolution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved(ClasspathResult),
    Cancelled,
}

impl ResolveOutcome {
    pub fn into_result(self) -> Option<ClasspathResult> {
        match self {
            ResolveOutcome::Resolved(result) => Some(result),
            ResolveOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResolveOutcome::Cancelled)
    }
}

/// Collects entries, keeping each jar or project once.
///
/// A duplicate keeps the position of the first occurrence, takes the stronger
/// scope and picks up a source jar if the first occurrence lacked one.
#[derive(Debug, Default)]
pub(crate) struct EntrySet {
    entries: IndexMap<EntryKey, ClasspathEntry>,
}

impl EntrySet {
    pub(crate) fn insert(&mut self, entry: ClasspathEntry) {
        let key = entry.key();
        let Some(existing) = self.entries.get_mut(&key) else {
            self.entries.insert(key, entry);
            return;
        };

        let scope = existing.scope().min(entry.scope());
        existing.set_scope(scope);
        if let ClasspathEntry::Jar {
            source_jar_path: Some(source),
            ..
        } = entry
        {
            if let ClasspathEntry::Jar {
                source_jar_path: current,
                ..
            } = existing
            {
                if current.is_none() {
                    *current = Some(source);
                }
            }
        }
    }

    /// Entries grouped by scope, first-seen order within each scope.
    pub(crate) fn into_entries(self) -> Vec<ClasspathEntry> {
        let mut entries: Vec<ClasspathEntry> = self.entries.into_values().collect();
        entries.sort_by_key(ClasspathEntry::scope);
        entries
    }
}
