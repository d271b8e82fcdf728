//! Cache keys for classpath results.
//!
//! A key hashes everything a result depends on: the requested label, the
//! request options, the engine settings and a fingerprint of the whole store
//! snapshot. Any
//! metadata change produces a new fingerprint, so stale entries are never
//! looked up again.

use blake3::Hasher;

use super::envelope::CACHE_FORMAT_VERSION;
use super::{CacheError, CacheResult};
use crate::engine::ResolveRequest;
use kiln_graph::StoreSnapshot;

/// Content-addressed cache key (BLAKE3 hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Key for `request` resolved by an engine with fingerprint `engine`
    /// against the store with the given fingerprint.
    pub fn for_request(request: &ResolveRequest, engine: &str, fingerprint: &StoreFingerprint) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(&CACHE_FORMAT_VERSION.to_le_bytes());
        hasher.update(fingerprint.as_hex().as_bytes());
        hasher.update(b"\0");
        hasher.update(engine.as_bytes());
        hasher.update(b"\0");
        hasher.update(request.target.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(&[u8::from(request.include_test_scope)]);

        let mut implicit: Vec<&str> = request
            .implicit_runtime_deps
            .iter()
            .map(|label| label.as_str())
            .collect();
        implicit.sort_unstable();
        implicit.dedup();
        for label in implicit {
            hasher.update(label.as_bytes());
            hasher.update(b"\0");
        }

        Self(hasher.finalize().to_hex().to_string())
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content hash of a store snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreFingerprint(String);

impl StoreFingerprint {
    /// Hash every target of `store` in label order.
    pub fn of(store: &StoreSnapshot) -> CacheResult<Self> {
        let mut hasher = Hasher::new();
        hasher.update(&CACHE_FORMAT_VERSION.to_le_bytes());
        for target in store.targets() {
            let bytes = serde_json::to_vec(target.as_ref())
                .map_err(|e| CacheError::SerializationError(e.to_string()))?;
            hasher.update(blake3::hash(&bytes).as_bytes());
        }
        Ok(Self(hasher.finalize().to_hex().to_string()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}
