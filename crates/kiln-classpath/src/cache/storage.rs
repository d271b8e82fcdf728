//! redb-backed classpath cache.
//!
//! One database file per cache directory, with ACID transactions.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::envelope::CacheEnvelope;
use super::key::CacheKey;
use super::{CacheResult, ClasspathCache};
use crate::entry::ClasspathResult;

/// Cache table: maps cache keys to bincode envelopes.
const CACHE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("classpaths");

/// Metadata table: stores cache-wide metadata.
const METADATA_TABLE: TableDefinition<&str, &str> = TableDefinition::new("metadata");

/// Name of the database file inside the cache directory.
pub const DATABASE_FILE: &str = "classpath.redb";

/// Error types for cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache miss")]
    CacheMiss,

    #[error("cache database error: {0}")]
    DatabaseError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("deserialization error: {0}")]
    DeserializationError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("cache version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("cache corrupted: {0}")]
    Corrupted(String),
}

impl From<redb::Error> for CacheError {
    fn from(err: redb::Error) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::DatabaseError> for CacheError {
    fn from(err: redb::DatabaseError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::TableError> for CacheError {
    fn from(err: redb::TableError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::TransactionError> for CacheError {
    fn from(err: redb::TransactionError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::StorageError> for CacheError {
    fn from(err: redb::StorageError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

impl From<redb::CommitError> for CacheError {
    fn from(err: redb::CommitError) -> Self {
        CacheError::DatabaseError(err.to_string())
    }
}

/// Persistent classpath cache using redb.
pub struct RedbClasspathCache {
    db: Database,
}

impl std::fmt::Debug for RedbClasspathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbClasspathCache").finish_non_exhaustive()
    }
}

impl RedbClasspathCache {
    /// Open or create the cache in `cache_dir`, creating the directory and
    /// the database file as needed.
    pub fn open(cache_dir: &Path) -> CacheResult<Self> {
        std::fs::create_dir_all(cache_dir)?;
        let db = Database::create(cache_dir.join(DATABASE_FILE))?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CACHE_TABLE)?;
            let _ = write_txn.open_table(METADATA_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Raw envelope bytes for `key`. `CacheMiss` if absent.
    pub fn get_bytes(&self, key: &CacheKey) -> CacheResult<Vec<u8>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CACHE_TABLE)?;
        let value = table.get(key.as_hex())?.ok_or(CacheError::CacheMiss)?;
        Ok(value.value().to_vec())
    }

    pub fn put_bytes(&self, key: &CacheKey, bytes: &[u8]) -> CacheResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CACHE_TABLE)?;
            table.insert(key.as_hex(), bytes)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get(&self, key: &CacheKey) -> CacheResult<ClasspathResult> {
        let bytes = self.get_bytes(key)?;
        CacheEnvelope::from_bytes(&bytes)?.unwrap_result()
    }

    pub fn put(&self, key: &CacheKey, result: &ClasspathResult) -> CacheResult<()> {
        let bytes = CacheEnvelope::wrap(result)?.to_bytes()?;
        self.put_bytes(key, &bytes)
    }

    /// Drop every cached entry.
    pub fn clear(&self) -> CacheResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            write_txn.delete_table(CACHE_TABLE)?;
            let _ = write_txn.open_table(CACHE_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn len(&self) -> CacheResult<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CACHE_TABLE)?;
        Ok(table.iter()?.count())
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> CacheResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(METADATA_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_metadata(&self, key: &str) -> CacheResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(METADATA_TABLE)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }
}

impl ClasspathCache for RedbClasspathCache {
    fn load(&self, key: &CacheKey) -> CacheResult<ClasspathResult> {
        self.get(key)
    }

    fn save(&self, key: &CacheKey, result: &ClasspathResult) -> CacheResult<()> {
        self.put(key, result)
    }

    fn invalidate(&self) -> CacheResult<()> {
        self.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ClasspathEntry, Scope};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_test_cache() -> (RedbClasspathCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = RedbClasspathCache::open(dir.path()).unwrap();
        (cache, dir)
    }

    #[test]
    fn open_creates_directory_and_file() {
        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().join("nested/cache");
        let _cache = RedbClasspathCache::open(&cache_dir).unwrap();
        assert!(cache_dir.join(DATABASE_FILE).exists());
    }

    #[test]
    fn miss_then_hit() {
        let (cache, _dir) = create_test_cache();
        let key = CacheKey::from_hex("k");
        assert!(matches!(cache.get(&key), Err(CacheError::CacheMiss)));

        let result = ClasspathResult {
            entries: vec![ClasspathEntry::jar("a.jar", None, Scope::Main)],
            ..ClasspathResult::empty()
        };
        cache.put(&key, &result).unwrap();
        assert_eq!(cache.get(&key).unwrap(), result);
        assert_eq!(cache.len().unwrap(), 1);

        cache.clear().unwrap();
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        let (cache, _dir) = create_test_cache();
        let key = CacheKey::from_hex("bad");
        cache.put_bytes(&key, b"definitely not bincode").unwrap();
        assert!(cache.get(&key).is_err());
    }

    #[test]
    fn metadata_round_trip() {
        let (cache, _dir) = create_test_cache();
        cache.set_metadata("fingerprint", "abc").unwrap();
        assert_eq!(cache.get_metadata("fingerprint").unwrap(), Some("abc".to_string()));
        assert_eq!(cache.get_metadata("other").unwrap(), None);
    }
}
