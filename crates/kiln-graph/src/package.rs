//! Workspace package tree.
//!
//! Packages are directories that own build targets. They form a tree rooted
//! at the workspace root (relative path `""`): each package's parent is the
//! nearest ancestor directory that is itself a package, so `a/b/c` hangs
//! under `a` when `a/b` has no build file.

use std::collections::{BTreeMap, BTreeSet};

use crate::label::Label;
use crate::store::StoreSnapshot;

/// A node in the package tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    relative_path: String,
    parent: Option<String>,
    children: Vec<String>,
    declared: bool,
}

impl Package {
    /// Workspace-relative directory, without leading or trailing `/`.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Parent package path. `None` only for the workspace root.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Child package paths, sorted.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Whether this package was declared (owns targets), as opposed to the
    /// implicit workspace root.
    pub fn is_declared(&self) -> bool {
        self.declared
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// The tree of workspace packages.
#[derive(Debug, Clone)]
pub struct PackageTree {
    packages: BTreeMap<String, Package>,
}

impl Default for PackageTree {
    fn default() -> Self {
        Self::from_paths(std::iter::empty::<&str>())
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    let mut current = Some(path);
    std::iter::from_fn(move || {
        let path = current?;
        if path.is_empty() {
            current = None;
            return None;
        }
        let parent = path.rfind('/').map(|at| &path[..at]).unwrap_or("");
        current = Some(parent);
        Some(parent)
    })
}

impl PackageTree {
    /// Build a tree from package paths. Order and duplicates do not matter.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let declared: BTreeSet<String> = paths.into_iter().map(|p| normalize(p.as_ref())).collect();

        let mut packages: BTreeMap<String, Package> = BTreeMap::new();
        packages.insert(
            String::new(),
            Package {
                relative_path: String::new(),
                parent: None,
                children: Vec::new(),
                declared: declared.contains(""),
            },
        );

        for path in declared.iter().filter(|p| !p.is_empty()) {
            let parent = ancestors(path)
                .find(|candidate| candidate.is_empty() || declared.contains(*candidate))
                .unwrap_or("")
                .to_string();
            packages.insert(
                path.clone(),
                Package {
                    relative_path: path.clone(),
                    parent: Some(parent),
                    children: Vec::new(),
                    declared: true,
                },
            );
        }

        // `declared` iterates in sorted order, so children end up sorted.
        for path in declared.iter().filter(|p| !p.is_empty()) {
            let parent = packages
                .get(path)
                .and_then(|pkg| pkg.parent.clone())
                .unwrap_or_default();
            if let Some(parent) = packages.get_mut(&parent) {
                parent.children.push(path.clone());
            }
        }

        Self { packages }
    }

    /// Build the tree of packages that own targets in a store snapshot.
    pub fn from_store(store: &StoreSnapshot) -> Self {
        Self::from_paths(store.packages())
    }

    pub fn root(&self) -> &Package {
        // The root is inserted unconditionally by `from_paths`.
        &self.packages[""]
    }

    pub fn get(&self, path: &str) -> Option<&Package> {
        self.packages.get(path.trim_matches('/'))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.packages.contains_key(path.trim_matches('/'))
    }

    /// Number of declared packages.
    pub fn len(&self) -> usize {
        self.packages.values().filter(|pkg| pkg.declared).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared packages in sorted path order.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values().filter(|pkg| pkg.declared)
    }

    /// The nearest existing package strictly above `path`. Falls back to the
    /// root, so this never fails.
    pub fn find_best_parent(&self, path: &str) -> &Package {
        let path = path.trim_matches('/');
        ancestors(path)
            .find_map(|candidate| self.packages.get(candidate))
            .unwrap_or_else(|| self.root())
    }

    /// Every package below `path` in pre-order, not including `path` itself.
    /// Unknown paths have no children.
    pub fn gather_children(&self, path: &str) -> Vec<&Package> {
        let mut gathered = Vec::new();
        if let Some(start) = self.get(path) {
            let mut stack: Vec<&str> = start.children.iter().rev().map(String::as_str).collect();
            while let Some(next) = stack.pop() {
                if let Some(pkg) = self.packages.get(next) {
                    gathered.push(pkg);
                    stack.extend(pkg.children.iter().rev().map(String::as_str));
                }
            }
        }
        gathered
    }

    /// The declared package that owns `label`, if it is a workspace package.
    pub fn owning_package(&self, label: &Label) -> Option<&Package> {
        if label.is_external() {
            return None;
        }
        self.packages
            .get(label.package())
            .filter(|pkg| pkg.declared)
    }
}
