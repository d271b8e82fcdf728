//! Persistent classpath cache.
//!
//! Resolved classpaths are cached per request. Keys are content-addressed
//! (BLAKE3 over the request, the engine settings and a fingerprint of the store
//! snapshot), so a metadata or settings change misses automatically.
//!
//! # Rules
//!
//! - Cancelled resolutions are never saved.
//! - Incomplete results are saved only with [`CacheConfig::cache_incomplete`].
//! - A corrupt or incompatible entry is logged and treated as a miss.

mod envelope;
mod key;
mod storage;

pub use envelope::{CACHE_FORMAT_VERSION, CacheEnvelope, CacheMetadata};
pub use key::{CacheKey, StoreFingerprint};
pub use storage::{CacheError, DATABASE_FILE, RedbClasspathCache};

use std::path::PathBuf;

use parking_lot::RwLock;
use rustc_hash::FxHashMap as HashMap;

use crate::entry::{ClasspathResult, ResolveOutcome};

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Storage seam for resolved classpaths.
pub trait ClasspathCache: Send + Sync + std::fmt::Debug {
    /// The stored result, or `CacheError::CacheMiss`.
    fn load(&self, key: &CacheKey) -> CacheResult<ClasspathResult>;

    fn save(&self, key: &CacheKey, result: &ClasspathResult) -> CacheResult<()>;

    /// Drop every entry.
    fn invalidate(&self) -> CacheResult<()>;
}

/// Configuration for the classpath cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding the database file.
    pub dir: PathBuf,
    pub enabled: bool,
    /// Also store results with `is_complete == false`.
    pub cache_incomplete: bool,
    /// Skip reads but still write. Useful for refreshing a stale cache.
    pub force_refresh: bool,
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            enabled: true,
            cache_incomplete: false,
            force_refresh: false,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_cache_incomplete(mut self, cache_incomplete: bool) -> Self {
        self.cache_incomplete = cache_incomplete;
        self
    }

    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Whether reads should be skipped, either by flag or by the
    /// `KILN_FORCE_REFRESH` environment variable.
    pub fn should_force_refresh(&self) -> bool {
        self.force_refresh || std::env::var_os("KILN_FORCE_REFRESH").is_some()
    }

    /// Whether `outcome` may be written to the cache.
    pub fn should_store(&self, outcome: &ResolveOutcome) -> bool {
        match outcome {
            ResolveOutcome::Cancelled => false,
            ResolveOutcome::Resolved(result) => result.is_complete || self.cache_incomplete,
        }
    }

    /// Open the persistent backend configured here.
    pub fn open(&self) -> CacheResult<RedbClasspathCache> {
        RedbClasspathCache::open(&self.dir)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(".cache/kiln")
    }
}

/// Load `key`, mapping misses and unreadable entries to `None`.
pub fn try_load(cache: &dyn ClasspathCache, key: &CacheKey) -> Option<ClasspathResult> {
    match cache.load(key) {
        Ok(result) => {
            tracing::debug!(%key, "classpath cache hit");
            Some(result)
        }
        Err(CacheError::CacheMiss) => None,
        Err(err) => {
            tracing::warn!(%key, error = %err, "ignoring unreadable classpath cache entry");
            None
        }
    }
}

/// Save `outcome` if the rules allow it. Failures are logged, never fatal.
pub fn try_save(
    cache: &dyn ClasspathCache,
    config: &CacheConfig,
    key: &CacheKey,
    outcome: &ResolveOutcome,
) {
    if !config.should_store(outcome) {
        return;
    }
    if let ResolveOutcome::Resolved(result) = outcome {
        if let Err(err) = cache.save(key, result) {
            tracing::warn!(%key, error = %err, "failed to write classpath cache entry");
        }
    }
}

/// In-process cache for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryClasspathCache {
    entries: RwLock<HashMap<CacheKey, ClasspathResult>>,
}

impl MemoryClasspathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ClasspathCache for MemoryClasspathCache {
    fn load(&self, key: &CacheKey) -> CacheResult<ClasspathResult> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or(CacheError::CacheMiss)
    }

    fn save(&self, key: &CacheKey, result: &ClasspathResult) -> CacheResult<()> {
        self.entries.write().insert(key.clone(), result.clone());
        Ok(())
    }

    fn invalidate(&self) -> CacheResult<()> {
        self.entries.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ClasspathEntry, Scope};
    use pretty_assertions::assert_eq;

    fn result(complete: bool) -> ClasspathResult {
        ClasspathResult {
            entries: vec![ClasspathEntry::jar("a.jar", None, Scope::Main)],
            is_complete: complete,
            ..ClasspathResult::default()
        }
    }

    #[test]
    fn config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.dir, PathBuf::from(".cache/kiln"));
        assert!(config.enabled);
        assert!(!config.cache_incomplete);
        assert!(!config.force_refresh);
    }

    #[test]
    fn store_rules() {
        let config = CacheConfig::default();
        assert!(!config.should_store(&ResolveOutcome::Cancelled));
        assert!(config.should_store(&ResolveOutcome::Resolved(result(true))));
        assert!(!config.should_store(&ResolveOutcome::Resolved(result(false))));

        let lenient = config.with_cache_incomplete(true);
        assert!(lenient.should_store(&ResolveOutcome::Resolved(result(false))));
        assert!(!lenient.should_store(&ResolveOutcome::Cancelled));
    }

    #[test]
    fn try_save_then_load() {
        let cache = MemoryClasspathCache::new();
        let config = CacheConfig::default();
        let key = CacheKey::from_hex("k");

        try_save(&cache, &config, &key, &ResolveOutcome::Resolved(result(false)));
        assert!(cache.is_empty());
        assert_eq!(try_load(&cache, &key), None);

        try_save(&cache, &config, &key, &ResolveOutcome::Resolved(result(true)));
        assert_eq!(try_load(&cache, &key), Some(result(true)));

        cache.invalidate().unwrap();
        assert_eq!(try_load(&cache, &key), None);
    }

    #[test]
    fn corrupt_redb_entry_is_a_miss() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = CacheConfig::new(dir.path()).open().unwrap();
        let key = CacheKey::from_hex("corrupt");
        cache.put_bytes(&key, &[0xff; 4]).unwrap();
        assert_eq!(try_load(&cache, &key), None);
    }
}
