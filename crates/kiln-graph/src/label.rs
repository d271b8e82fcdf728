//! Build target labels.
//!
//! A [`Label`] is the canonical identity of a build target:
//! `[@repo]//package/path:target-name`. Labels are normalized on parse so that
//! two spellings of the same target compare equal:
//!
//! - `pkg/path:name` gains the leading `//`
//! - `//a/b/c` expands to its default target `//a/b/c:c`
//!
//! Wildcards (`//pkg:*`, `//pkg:all`, `//pkg/...`) parse successfully but are
//! flagged by [`Label::is_wildcard`]; they never become graph nodes.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors produced while parsing a label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelError {
    #[error("label is empty")]
    Empty,

    #[error("label '{0}' contains a backslash")]
    Backslash(String),

    #[error("label '{0}' ends with a separator")]
    TrailingSeparator(String),

    #[error("label '{0}' has an absolute package path")]
    Absolute(String),

    #[error("invalid label '{label}': {reason}")]
    Invalid { label: String, reason: String },
}

/// A normalized build target label.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label {
    text: String,
    /// Byte offset of the package path (just past `//`).
    pkg_start: usize,
    /// Byte offset of the `:` separating package and name, if any.
    colon: Option<usize>,
}

impl Label {
    /// Parse and normalize a label string.
    pub fn parse(raw: &str) -> Result<Self, LabelError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LabelError::Empty);
        }
        if raw.contains('\\') {
            return Err(LabelError::Backslash(raw.to_string()));
        }
        if raw != "//" && (raw.ends_with(':') || raw.ends_with('/')) {
            return Err(LabelError::TrailingSeparator(raw.to_string()));
        }

        let (repo, rest) = split_repository(raw)?;
        let rest = if let Some(stripped) = rest.strip_prefix("//") {
            stripped
        } else if rest.starts_with('/') {
            return Err(LabelError::Absolute(raw.to_string()));
        } else if repo.is_some() {
            return Err(LabelError::Invalid {
                label: raw.to_string(),
                reason: "external repository must be followed by '//'".to_string(),
            });
        } else {
            rest
        };

        let (package, name) = match rest.split_once(':') {
            Some((package, name)) => {
                if name.contains(':') {
                    return Err(LabelError::Invalid {
                        label: raw.to_string(),
                        reason: "more than one ':'".to_string(),
                    });
                }
                (package, Some(name))
            }
            None => (rest, None),
        };

        if package.starts_with('/') || package.contains("//") {
            return Err(LabelError::Invalid {
                label: raw.to_string(),
                reason: "package path contains an empty segment".to_string(),
            });
        }

        // `//a/b/c` means `//a/b/c:c`; wildcard packages keep their form.
        let name = match name {
            Some(name) => Some(name.to_string()),
            None if package.is_empty() || package == "..." || package.ends_with("/...") => None,
            None => package.rsplit('/').next().map(str::to_string),
        };

        let mut text = String::with_capacity(raw.len() + 8);
        if let Some(repo) = repo {
            text.push('@');
            text.push_str(repo);
        }
        text.push_str("//");
        let pkg_start = text.len();
        text.push_str(package);
        let colon = name.map(|name| {
            let at = text.len();
            text.push(':');
            text.push_str(&name);
            at
        });

        Ok(Self {
            text,
            pkg_start,
            colon,
        })
    }

    /// Build a label from a package path and target name.
    pub fn new(package: &str, name: &str) -> Result<Self, LabelError> {
        Self::parse(&format!("//{}:{}", package.trim_matches('/'), name))
    }

    /// Parse a label as written inside a build file of `package`, where
    /// `:name` and bare `name` refer to targets in the same package.
    pub fn parse_relative(package: &str, raw: &str) -> Result<Self, LabelError> {
        let raw = raw.trim();
        let package = package.trim_matches('/');
        if let Some(name) = raw.strip_prefix(':') {
            Self::parse(&format!("//{package}:{name}"))
        } else if raw.starts_with("//") || raw.starts_with('@') || raw.contains(':') {
            Self::parse(raw)
        } else {
            Self::parse(&format!("//{package}:{raw}"))
        }
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// External repository name (`@repo` without the `@`), if any.
    pub fn repository(&self) -> Option<&str> {
        if self.text.starts_with('@') {
            Some(&self.text[1..self.pkg_start - 2])
        } else {
            None
        }
    }

    /// The package path, without leading `//`. Empty for the workspace root.
    pub fn package(&self) -> &str {
        match self.colon {
            Some(colon) => &self.text[self.pkg_start..colon],
            None => &self.text[self.pkg_start..],
        }
    }

    /// The target name. Empty for package-only wildcard labels.
    pub fn name(&self) -> &str {
        match self.colon {
            Some(colon) => &self.text[colon + 1..],
            None => "",
        }
    }

    /// Whether the label lives in an external repository.
    pub fn is_external(&self) -> bool {
        self.text.starts_with('@')
    }

    /// Whether the label denotes a set of targets rather than one target.
    pub fn is_wildcard(&self) -> bool {
        let name = self.name();
        self.colon.is_none()
            || name == "*"
            || name == "all"
            || name == "all-targets"
            || self.package() == "..."
            || self.package().ends_with("/...")
    }

    /// Whether the label names exactly one target.
    pub fn is_concrete(&self) -> bool {
        !self.is_wildcard()
    }

    /// Whether this label belongs to the given package path.
    pub fn in_package(&self, package: &str) -> bool {
        !self.is_external() && self.package() == package.trim_matches('/')
    }
}

fn split_repository(raw: &str) -> Result<(Option<&str>, &str), LabelError> {
    let Some(stripped) = raw.strip_prefix('@') else {
        return Ok((None, raw));
    };
    // `@@repo` is the canonical-repo spelling; treat it the same.
    let stripped = stripped.strip_prefix('@').unwrap_or(stripped);
    match stripped.find("//") {
        Some(0) | None => Err(LabelError::Invalid {
            label: raw.to_string(),
            reason: "missing repository name".to_string(),
        }),
        Some(end) => Ok((Some(&stripped[..end]), &stripped[end..])),
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({})", self.text)
    }
}

impl FromStr for Label {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Label {
    type Error = LabelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Label {
    type Error = LabelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.text
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.text
    }
}
