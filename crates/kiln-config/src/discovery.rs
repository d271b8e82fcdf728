//! File-based config discovery for CLI use.
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults;
//! 2. the nearest `kiln.toml`, searched from the start directory upwards;
//! 3. `KILN_`-prefixed environment variables, with `__` separating nested
//!    keys (`KILN_CACHE__ENABLED=false`);
//! 4. the selected profile, merged over the result.

use std::fs;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format as _, Serialized, Toml};

use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "KILN_";

/// Searches for `kiln.toml` and loads it.
///
/// # Example
///
/// ```no_run
/// use kiln_config::ConfigDiscovery;
///
/// let config = ConfigDiscovery::new(".").load_with_profile(Some("ci")).unwrap();
/// println!("aspects in {}", config.aspect_dir().display());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigDiscovery {
    start: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(start: impl AsRef<Path>) -> Self {
        Self {
            start: start.as_ref().to_path_buf(),
        }
    }

    /// The nearest `kiln.toml` in the start directory or an ancestor.
    pub fn find(&self) -> Option<PathBuf> {
        self.start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load the discovered file. `NotFound` if there is none.
    pub fn load(&self) -> Result<KilnConfig> {
        let path = self
            .find()
            .ok_or_else(|| ConfigError::NotFound(self.start.clone()))?;
        self.load_from(&path)
    }

    /// Load the discovered file, or defaults rooted at the start directory
    /// when there is none.
    pub fn load_or_default(&self) -> Result<KilnConfig> {
        match self.find() {
            Some(path) => self.load_from(&path),
            None => {
                tracing::debug!(start = %self.start.display(), "no kiln.toml found, using defaults");
                let mut config = extract(base_figment())?;
                config.workspace_root.get_or_insert_with(|| self.start.clone());
                Ok(config)
            }
        }
    }

    /// [`load_or_default`](Self::load_or_default), then apply `profile`.
    pub fn load_with_profile(&self, profile: Option<&str>) -> Result<KilnConfig> {
        let config = self.load_or_default()?.materialize_profile(profile)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a specific file. Its directory becomes the default workspace root.
    pub fn load_from(&self, path: &Path) -> Result<KilnConfig> {
        let content = fs::read_to_string(path)?;
        toml::from_str::<toml::Table>(&content)
            .map_err(|e| ConfigError::invalid(path.display().to_string(), e))?;

        let figment = Figment::from(Serialized::defaults(KilnConfig::default()))
            .merge(Toml::string(&content))
            .merge(env_provider());
        let mut config = extract(figment)?;

        let dir = path.parent().unwrap_or(Path::new("."));
        config.workspace_root = Some(match config.workspace_root.take() {
            Some(root) if root.is_relative() => dir.join(root),
            Some(root) => root,
            None => dir.to_path_buf(),
        });
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}

fn base_figment() -> Figment {
    Figment::from(Serialized::defaults(KilnConfig::default())).merge(env_provider())
}

fn extract(figment: Figment) -> Result<KilnConfig> {
    figment
        .extract()
        .map_err(|e| ConfigError::invalid("configuration", e))
}

/// Discover from the current directory.
pub fn discover() -> Result<KilnConfig> {
    ConfigDiscovery::new(std::env::current_dir()?).load_or_default()
}

/// Discover from the current directory and apply `profile`.
pub fn discover_with_profile(profile: &str) -> Result<KilnConfig> {
    ConfigDiscovery::new(std::env::current_dir()?).load_with_profile(Some(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn find_returns_none_without_config() {
        let dir = TempDir::new().unwrap();
        assert!(ConfigDiscovery::new(dir.path()).find().is_none());
        assert!(matches!(
            ConfigDiscovery::new(dir.path()).load(),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn find_walks_up() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "aspect_dir = \"out\"\n").unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(ConfigDiscovery::new(&nested).find().unwrap(), config_path);
    }

    #[test]
    fn syntax_errors_name_the_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "aspect_dir = [unterminated").unwrap();

        let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
        assert!(matches!(&err, ConfigError::InvalidValue { field, .. } if field.ends_with(CONFIG_FILE)));
    }
}
