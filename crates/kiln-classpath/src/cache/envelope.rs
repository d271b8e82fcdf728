//! On-disk envelope around a cached classpath document.

use serde::{Deserialize, Serialize};

use super::{CacheError, CacheResult};
use crate::entry::ClasspathResult;
use crate::wire::ClasspathDocument;

/// Current cache format version. Increment when the envelope or the wire
/// document changes shape.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Cache metadata for validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// kiln version that wrote the entry.
    pub kiln_version: String,
    pub format_version: u32,
    /// Unix timestamp when the entry was written.
    pub created_at: u64,
}

impl CacheMetadata {
    pub fn new() -> Self {
        Self {
            kiln_version: env!("CARGO_PKG_VERSION").to_string(),
            format_version: CACHE_FORMAT_VERSION,
            created_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.format_version == CACHE_FORMAT_VERSION
    }
}

impl Default for CacheMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// A cached result: metadata plus the JSON wire document.
///
/// The document is stored as JSON text because bincode cannot encode the
/// internally tagged diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEnvelope {
    pub metadata: CacheMetadata,
    pub document_json: String,
}

impl CacheEnvelope {
    pub fn wrap(result: &ClasspathResult) -> CacheResult<Self> {
        let document_json = ClasspathDocument::from(result)
            .to_json()
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;
        Ok(Self {
            metadata: CacheMetadata::new(),
            document_json,
        })
    }

    pub fn unwrap_result(self) -> CacheResult<ClasspathResult> {
        if !self.metadata.is_compatible() {
            return Err(CacheError::VersionMismatch {
                expected: CACHE_FORMAT_VERSION,
                found: self.metadata.format_version,
            });
        }
        let document = ClasspathDocument::from_json(&self.document_json)
            .map_err(|e| CacheError::Corrupted(e.to_string()))?;
        Ok(document.into())
    }

    pub fn to_bytes(&self) -> CacheResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CacheError::SerializationError(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> CacheResult<Self> {
        bincode::deserialize(bytes).map_err(|e| CacheError::DeserializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ClasspathEntry, Scope};
    use pretty_assertions::assert_eq;

    fn result() -> ClasspathResult {
        ClasspathResult {
            entries: vec![
                ClasspathEntry::jar("a.jar", Some("a-src.jar".into()), Scope::Main),
                ClasspathEntry::jar("rt.jar", None, Scope::Runtime),
            ],
            ..ClasspathResult::empty()
        }
    }

    #[test]
    fn envelope_survives_bytes() {
        let bytes = CacheEnvelope::wrap(&result()).unwrap().to_bytes().unwrap();
        let restored = CacheEnvelope::from_bytes(&bytes)
            .unwrap()
            .unwrap_result()
            .unwrap();
        assert_eq!(restored, result());
    }

    #[test]
    fn garbage_and_old_versions_are_rejected() {
        assert!(matches!(
            CacheEnvelope::from_bytes(b"\x01\x02"),
            Err(CacheError::DeserializationError(_))
        ));

        let mut envelope = CacheEnvelope::wrap(&result()).unwrap();
        envelope.metadata.format_version = CACHE_FORMAT_VERSION + 1;
        assert!(matches!(
            envelope.unwrap_result(),
            Err(CacheError::VersionMismatch { .. })
        ));

        let envelope = CacheEnvelope {
            metadata: CacheMetadata::new(),
            document_json: "{not json".to_string(),
        };
        assert!(matches!(envelope.unwrap_result(), Err(CacheError::Corrupted(_))));
    }
}
