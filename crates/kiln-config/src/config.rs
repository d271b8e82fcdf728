//! The `kiln.toml` configuration model and profile merging.
//!
//! ```toml
//! aspect_dir = "bazel-bin"
//! implicit_runtime_deps = ["//tools/logging:runtime"]
//!
//! [cache]
//! enabled = true
//! dir = ".cache/kiln"
//!
//! [order]
//! strict = false
//!
//! [profiles.ci.cache]
//! enabled = false
//! ```
//!
//! Relative paths are resolved against the workspace root, which defaults to
//! the directory holding `kiln.toml`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::settings::{GlobalSettings, LOG_LEVELS};

const DEFAULT_BAZEL_BIN: &str = "bazel-bin";
const DEFAULT_CACHE_DIR: &str = ".cache/kiln";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KilnConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Where the analysis aspect writes its metadata files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_dir: Option<PathBuf>,

    /// Directory relative jar paths are resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_root: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bazel_bin: Option<PathBuf>,

    /// Labels injected into every runtime classpath.
    #[serde(default)]
    pub implicit_runtime_deps: Vec<String>,

    /// The workspace builds with `--explicit_java_test_deps`.
    #[serde(default)]
    pub explicit_java_test_deps: bool,

    #[serde(default)]
    pub include_test_scope: bool,

    /// Packages consumed from source rather than as jars.
    #[serde(default)]
    pub workspace_packages: Vec<String>,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub order: OrderSection,

    #[serde(default)]
    pub settings: GlobalSettings,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Also cache results that are not complete.
    #[serde(default)]
    pub cache_incomplete: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            cache_incomplete: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSection {
    /// Fail on package cycles instead of breaking them.
    #[serde(default)]
    pub strict: bool,
}

fn default_true() -> bool {
    true
}

impl KilnConfig {
    /// Build from a JSON value, e.g. config handed over by an IDE.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::invalid("config", e))
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::invalid("config", e))
    }

    /// Merge the named profile over the base settings.
    ///
    /// Objects merge key by key, everything else is replaced. Profiles stay
    /// available on the result so another profile can still be looked up.
    pub fn materialize_profile(self, profile: Option<&str>) -> Result<Self> {
        let Some(name) = profile else {
            return Ok(self);
        };
        let overrides = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;
        if overrides.is_null() {
            return Ok(self);
        }

        let profiles = self.profiles.clone();
        let mut base = serde_json::to_value(Self {
            profiles: BTreeMap::new(),
            ..self
        })
        .map_err(|e| ConfigError::InvalidProfileOverride(e.to_string()))?;
        merge_values(&mut base, &overrides);

        let mut merged: Self = serde_json::from_value(base)
            .map_err(|e| ConfigError::InvalidProfileOverride(format!("profile '{name}': {e}")))?;
        merged.profiles = profiles;
        tracing::debug!(profile = name, "applied configuration profile");
        Ok(merged)
    }

    /// Reject values that parse but make no sense.
    pub fn validate(&self) -> Result<()> {
        if self.settings.parallel_jobs == Some(0) {
            return Err(ConfigError::invalid(
                "settings.parallel_jobs",
                "must be at least 1; leave it unset to use one job per core",
            ));
        }
        if let Some(level) = &self.settings.log_level {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(ConfigError::invalid(
                    "settings.log_level",
                    format!("'{level}' is not one of {}", LOG_LEVELS.join(", ")),
                ));
            }
        }
        if let Some(label) = self
            .implicit_runtime_deps
            .iter()
            .find(|label| label.trim().is_empty())
        {
            return Err(ConfigError::invalid(
                "implicit_runtime_deps",
                format!("empty label '{label}'"),
            ));
        }
        Ok(())
    }

    pub fn workspace_root(&self) -> &Path {
        self.workspace_root.as_deref().unwrap_or(Path::new("."))
    }

    pub fn aspect_dir(&self) -> PathBuf {
        self.resolve(self.aspect_dir.as_deref(), DEFAULT_BAZEL_BIN)
    }

    pub fn bazel_bin(&self) -> PathBuf {
        self.resolve(self.bazel_bin.as_deref(), DEFAULT_BAZEL_BIN)
    }

    pub fn execution_root(&self) -> PathBuf {
        self.resolve(self.execution_root.as_deref(), "")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.resolve(self.cache.dir.as_deref(), DEFAULT_CACHE_DIR)
    }

    fn resolve(&self, configured: Option<&Path>, default: &str) -> PathBuf {
        let path = configured.unwrap_or(Path::new(default));
        if path.is_absolute() {
            path.to_path_buf()
        } else if path.as_os_str().is_empty() {
            self.workspace_root().to_path_buf()
        } else {
            self.workspace_root().join(path)
        }
    }
}

pub(crate) fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_values(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}
